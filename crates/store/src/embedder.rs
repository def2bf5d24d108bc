use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("empty embedding response")]
    Empty,
}

/// Trait for embedding backends. The pipeline embeds one article at a time,
/// so the seam is a single-text encode.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Encode a text into a vector.
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// The dimensionality of the output vectors.
    fn dimensions(&self) -> usize;
}

/// Embedder backed by an HTTP embedding service (`/api/embed` shape).
pub struct HttpEmbedder {
    client: Client,
    url: String,
    model: String,
    dimensions: usize,
}

impl HttpEmbedder {
    pub fn new(url: String, model: String, dimensions: usize) -> Self {
        Self {
            client: Client::new(),
            url,
            model,
            dimensions,
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbedRequest {
            model: self.model.clone(),
            input: vec![text.to_string()],
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(format!("{status}: {body}")));
        }

        let parsed: EmbedResponse = response.json().await?;
        parsed.embeddings.into_iter().next().ok_or(EmbeddingError::Empty)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_request_serializes_single_input() {
        let req = EmbedRequest {
            model: "bge-base-zh-v1.5".to_string(),
            input: vec!["hello".to_string()],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "bge-base-zh-v1.5");
        assert_eq!(json["input"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn embed_response_takes_first_vector() {
        let parsed: EmbedResponse =
            serde_json::from_str(r#"{"embeddings": [[0.1, 0.2], [0.3, 0.4]]}"#).unwrap();
        assert_eq!(parsed.embeddings[0], vec![0.1, 0.2]);
    }
}
