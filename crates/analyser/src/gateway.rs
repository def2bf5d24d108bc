use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Per-call budget for the external push.
pub const PUSH_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("push timed out after {0:.2} seconds")]
    Timeout(f64),
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    message: &'a str,
}

/// Reply from the gateway relay.
#[derive(Debug, Clone, Deserialize)]
pub struct PushResponse {
    pub status_code: i32,
    pub response_text: String,
}

/// One-shot client for the external analysis gateway.
///
/// Best-effort by contract: the caller logs and swallows failures, because
/// the article has already been persisted downstream by the time a push
/// happens.
pub struct GatewayClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GatewayClient {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Push one message, honouring the 600-s call budget.
    pub async fn push(&self, message: &str) -> Result<PushResponse, GatewayError> {
        let start = Instant::now();
        info!(endpoint = %self.endpoint, "pushing analysis to gateway");

        let send = self
            .client
            .post(format!("{}/push", self.endpoint))
            .json(&PushRequest { message })
            .send();

        let response = match tokio::time::timeout(PUSH_TIMEOUT, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(GatewayError::Http(e)),
            Err(_) => {
                return Err(GatewayError::Timeout(start.elapsed().as_secs_f64()));
            }
        };

        let parsed = response
            .json::<PushResponse>()
            .await
            .map_err(GatewayError::Http)?;
        info!(
            status_code = parsed.status_code,
            response_text = %parsed.response_text,
            "push response"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_response_decodes() {
        let parsed: PushResponse =
            serde_json::from_str(r#"{"status_code": 200, "response_text": "ok"}"#).unwrap();
        assert_eq!(parsed.status_code, 200);
        assert_eq!(parsed.response_text, "ok");
    }

    #[test]
    fn push_request_wraps_message() {
        let json = serde_json::to_value(PushRequest { message: "hello" }).unwrap();
        assert_eq!(json, serde_json::json!({"message": "hello"}));
    }
}
