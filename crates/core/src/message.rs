use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Wire-format article flowing through both queues.
///
/// Created by the scraper on first successful fetch, enriched once by the
/// analyser (`response_struct` / `response_raw`), terminated by the ingestor.
/// Encoded as UTF-8 JSON; unknown fields are ignored on decode so older and
/// newer producers can coexist on the same queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleMessage {
    /// Stable identifier, generated at first ingress and preserved thereafter.
    pub message_id: String,

    /// When the article was first seen.
    pub time: DateTime<Utc>,

    pub title: String,

    /// Plain-text body, HTML already stripped by the scraper.
    pub content: String,

    /// Structured analysis extracted from the LLM reply, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_struct: Option<Value>,

    /// Raw LLM reply text, trimmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_raw: Option<String>,

    /// Analysis failure note, surfaced to the relational `error` column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArticleMessage {
    /// Create a fresh message with a generated id and the current timestamp.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            time: Utc::now(),
            title: title.into(),
            content: content.into(),
            response_struct: None,
            response_raw: None,
            error: None,
        }
    }

    /// Encode to the queue wire format.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from the queue wire format.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_bare_message() {
        let msg = ArticleMessage::new("Fed cuts rates", "The Federal Reserve cut rates today.");
        let json = msg.to_json().unwrap();
        let decoded = ArticleMessage::from_json(&json).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn roundtrip_enriched_message() {
        let mut msg = ArticleMessage::new("t", "c");
        msg.response_struct = Some(serde_json::json!({"stock_code": "0700.HK"}));
        msg.response_raw = Some("raw text".to_string());
        msg.error = Some("boom".to_string());

        let decoded = ArticleMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn optional_fields_omitted_when_absent() {
        let msg = ArticleMessage::new("t", "c");
        let json = msg.to_json().unwrap();
        assert!(!json.contains("response_struct"));
        assert!(!json.contains("response_raw"));
        assert!(!json.contains("error"));
    }

    #[test]
    fn unknown_fields_ignored() {
        let json = r#"{
            "message_id": "m1",
            "time": "2025-09-22T12:00:00Z",
            "title": "Test Title",
            "content": "This is a test content.",
            "some_future_field": 42
        }"#;
        let msg = ArticleMessage::from_json(json).unwrap();
        assert_eq!(msg.message_id, "m1");
        assert_eq!(msg.title, "Test Title");
        assert!(msg.response_struct.is_none());
    }

    #[test]
    fn fresh_messages_get_distinct_ids() {
        let a = ArticleMessage::new("t", "c");
        let b = ArticleMessage::new("t", "c");
        assert_ne!(a.message_id, b.message_id);
    }
}
