use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{error, info};

/// The structured block is delimited by two lines of three-or-more hyphens.
static BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?ms)^-{3,}\s*\n(.*?)\n-{3,}$").expect("block regex"));

/// Extract the structured analysis from a raw LLM reply.
///
/// Scans for a block delimited by two `---` lines and parses the enclosed
/// text as strict JSON. No delimiters or a malformed block both yield
/// `None`; the raw text is still useful to the caller either way.
/// Extracting twice equals extracting once.
pub fn extract_structured(raw: &str) -> Option<Value> {
    let Some(captures) = BLOCK_RE.captures(raw) else {
        info!("no structured block found in llm response");
        return None;
    };
    let inner = captures.get(1).map(|m| m.as_str())?;

    match serde_json::from_str(inner) {
        Ok(value) => Some(value),
        Err(e) => {
            error!(error = %e, block = %inner, "failed to decode structured block");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_delimited_json() {
        let raw = "prefix\n---\n{\"a\": 1}\n---\nsuffix";
        assert_eq!(extract_structured(raw), Some(json!({"a": 1})));
    }

    #[test]
    fn no_delimiters_yields_none() {
        assert_eq!(extract_structured("no delimiters here"), None);
    }

    #[test]
    fn malformed_json_yields_none() {
        assert_eq!(extract_structured("---\n{a:1}\n---"), None);
    }

    #[test]
    fn longer_hyphen_runs_accepted() {
        let raw = "-----\n{\"ok\": true}\n------";
        assert_eq!(extract_structured(raw), Some(json!({"ok": true})));
    }

    #[test]
    fn trailing_whitespace_after_opening_line_accepted() {
        let raw = "---   \n{\"ok\": true}\n---";
        assert_eq!(extract_structured(raw), Some(json!({"ok": true})));
    }

    #[test]
    fn multiline_block_is_captured() {
        let raw = "---\n{\n  \"stock_code\": \"0700.HK\",\n  \"alerts\": []\n}\n---";
        let v = extract_structured(raw).unwrap();
        assert_eq!(v["stock_code"], "0700.HK");
    }

    #[test]
    fn extraction_is_idempotent() {
        for raw in [
            "prefix\n---\n{\"a\": 1}\n---\nsuffix",
            "no delimiters here",
            "---\n{a:1}\n---",
        ] {
            assert_eq!(extract_structured(raw), extract_structured(raw));
        }
    }
}
