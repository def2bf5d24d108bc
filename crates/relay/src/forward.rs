use tracing::debug;

/// How a relayed message should be presented to the upstream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// The message parses as a JSON value and is forwarded as-is with an
    /// `application/json` content type.
    Json,
    /// Anything else goes out verbatim as `text/plain`.
    Text,
}

/// Decide the upstream content type for a message.
pub fn classify_body(message: &str) -> BodyKind {
    if serde_json::from_str::<serde_json::Value>(message).is_ok() {
        BodyKind::Json
    } else {
        BodyKind::Text
    }
}

/// Forwards pushed messages to the external HTTP endpoint.
pub struct Forwarder {
    client: reqwest::Client,
    endpoint: String,
}

impl Forwarder {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// POST the message upstream; returns the upstream status and body.
    pub async fn forward(&self, message: &str) -> Result<(u16, String), reqwest::Error> {
        let content_type = match classify_body(message) {
            BodyKind::Json => "application/json",
            BodyKind::Text => "text/plain",
        };
        debug!(content_type, "forwarding message upstream");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", content_type)
            .body(message.to_string())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_is_json() {
        assert_eq!(classify_body(r#"{"a": 1}"#), BodyKind::Json);
    }

    #[test]
    fn json_scalar_is_json() {
        assert_eq!(classify_body("42"), BodyKind::Json);
        assert_eq!(classify_body(r#""quoted""#), BodyKind::Json);
    }

    #[test]
    fn prose_is_text() {
        assert_eq!(classify_body("no structured analysis today"), BodyKind::Text);
    }

    #[test]
    fn malformed_json_is_text() {
        assert_eq!(classify_body("{a: 1}"), BodyKind::Text);
    }
}
