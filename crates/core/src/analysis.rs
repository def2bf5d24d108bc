use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Typed view of a well-formed structured analysis.
///
/// The analyser ships `response_struct` through the pipeline as raw JSON;
/// this schema is only imposed where the shape matters (the trade policy and
/// anything that wants the per-horizon scores). Validation is best-effort:
/// a reply that does not match simply yields no typed view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnalysis {
    pub stock_code: String,
    pub stock_name: String,
    pub analysis: AnalysisHorizons,
    #[serde(default)]
    pub alerts: Vec<String>,
    pub conclusion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisHorizons {
    pub short_term: HorizonAnalysis,
    pub mid_term: HorizonAnalysis,
    pub long_term: HorizonAnalysis,
}

/// One horizon of the analysis. `score` is a signed integer in [-100, +100]
/// serialised as a string with an explicit sign (e.g. `"+75"`, `"-20"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonAnalysis {
    pub score: String,
    pub driver: String,
    pub risk: String,
}

impl StructuredAnalysis {
    /// Try to impose the schema on a raw structured block.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?\d+").expect("score regex"));

/// Extract the first signed integer from a score string.
///
/// Mirrors the trade-policy parsing of scores like `"+75"` or `"约-20分"`:
/// anything without a digit run yields `None`.
pub fn parse_score(score: &str) -> Option<i64> {
    SCORE_RE.find(score)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "stock_code": "0700.HK",
            "stock_name": "Tencent",
            "analysis": {
                "short_term": {"score": "+35", "driver": "buyback", "risk": "regulation"},
                "mid_term": {"score": "+10", "driver": "earnings", "risk": "fx"},
                "long_term": {"score": "-5", "driver": "ai capex", "risk": "competition"}
            },
            "alerts": ["regulatory review pending"],
            "conclusion": "mildly positive"
        })
    }

    #[test]
    fn from_value_accepts_well_formed() {
        let parsed = StructuredAnalysis::from_value(&sample()).unwrap();
        assert_eq!(parsed.stock_code, "0700.HK");
        assert_eq!(parsed.analysis.short_term.score, "+35");
        assert_eq!(parsed.alerts.len(), 1);
    }

    #[test]
    fn from_value_rejects_missing_horizon() {
        let v = json!({"stock_code": "x", "stock_name": "y", "analysis": {}, "conclusion": "z"});
        assert!(StructuredAnalysis::from_value(&v).is_none());
    }

    #[test]
    fn parse_score_with_sign() {
        assert_eq!(parse_score("+75"), Some(75));
        assert_eq!(parse_score("-20"), Some(-20));
    }

    #[test]
    fn parse_score_embedded_in_text() {
        assert_eq!(parse_score("score: +35 (strong)"), Some(35));
    }

    #[test]
    fn parse_score_without_digits() {
        assert_eq!(parse_score("n/a"), None);
        assert_eq!(parse_score(""), None);
    }
}
