use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::StoreError;

/// Connection parameters for the vector store.
///
/// The gRPC port is accepted for deployment parity but unused: this client
/// speaks the REST and GraphQL APIs only.
#[derive(Debug, Clone)]
pub struct WeaviateConfig {
    pub host: String,
    pub http_port: u16,
    pub grpc_port: u16,
    pub class_name: String,
}

impl WeaviateConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.http_port)
    }
}

/// Weaviate client scoped to one collection.
pub struct WeaviateClient {
    http: Client,
    base_url: String,
    class: String,
}

/// Build the GraphQL nearVector query for a collection.
fn near_vector_query(class: &str, vector: &[f32], limit: usize) -> String {
    let vector_json = serde_json::to_string(vector).unwrap_or_else(|_| "[]".to_string());
    format!(
        "{{ Get {{ {class}(nearVector: {{vector: {vector_json}}}, limit: {limit}) \
         {{ article_id content }} }} }}"
    )
}

impl WeaviateClient {
    pub fn new(config: &WeaviateConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url(),
            class: config.class_name.clone(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class
    }

    /// Create the collection if it is absent.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        let url = format!("{}/v1/schema/{}", self.base_url, self.class);
        let response = self.http.get(&url).send().await?;
        match response.status() {
            StatusCode::OK => {
                info!(class = %self.class, "collection already exists");
                return Ok(());
            }
            StatusCode::NOT_FOUND => {}
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(StoreError::Api(format!("schema lookup failed: {status}: {body}")));
            }
        }

        let schema = json!({
            "class": self.class,
            "vectorizer": "none",
            "properties": [
                {"name": "article_id", "dataType": ["text"]},
                {"name": "content", "dataType": ["text"]},
            ],
        });
        let response = self
            .http
            .post(format!("{}/v1/schema", self.base_url))
            .json(&schema)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api(format!("schema create failed: {status}: {body}")));
        }
        info!(class = %self.class, "collection created");
        Ok(())
    }

    /// Insert one object with its vector. Duplicate `article_id`s are
    /// accepted; deduplication is a retrieval concern.
    pub async fn insert(&self, properties: Value, vector: &[f32]) -> Result<(), StoreError> {
        let object = json!({
            "class": self.class,
            "properties": properties,
            "vector": vector,
        });
        let response = self
            .http
            .post(format!("{}/v1/objects", self.base_url))
            .json(&object)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api(format!("object insert failed: {status}: {body}")));
        }
        debug!(class = %self.class, "object inserted");
        Ok(())
    }

    /// Nearest-neighbour lookup; returns the stored properties of the
    /// matched objects, verbatim.
    pub async fn near_vector(&self, vector: &[f32], limit: usize) -> Result<Vec<Value>, StoreError> {
        let query = near_vector_query(&self.class, vector, limit);
        let response = self
            .http
            .post(format!("{}/v1/graphql", self.base_url))
            .json(&json!({"query": query}))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api(format!("nearVector query failed: {status}: {body}")));
        }

        let body: Value = response.json().await?;
        if let Some(errors) = body.get("errors") {
            return Err(StoreError::Api(format!("nearVector query errors: {errors}")));
        }
        let objects = body
            .pointer(&format!("/data/Get/{}", self.class))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(objects)
    }
}

/// Read-side seam for the similar-articles tool, mockable in tests.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn near_vector(&self, vector: &[f32], limit: usize) -> Result<Vec<Value>, StoreError>;
}

#[async_trait]
impl VectorSearch for WeaviateClient {
    async fn near_vector(&self, vector: &[f32], limit: usize) -> Result<Vec<Value>, StoreError> {
        WeaviateClient::near_vector(self, vector, limit).await
    }
}

/// Write-side seam for the vector sink, mockable in tests.
#[async_trait]
pub trait VectorWrite: Send + Sync {
    async fn insert(&self, properties: Value, vector: &[f32]) -> Result<(), StoreError>;
}

#[async_trait]
impl VectorWrite for WeaviateClient {
    async fn insert(&self, properties: Value, vector: &[f32]) -> Result<(), StoreError> {
        WeaviateClient::insert(self, properties, vector).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_uses_http_port() {
        let cfg = WeaviateConfig {
            host: "weaviate".into(),
            http_port: 8080,
            grpc_port: 50051,
            class_name: "articles".into(),
        };
        assert_eq!(cfg.base_url(), "http://weaviate:8080");
    }

    #[test]
    fn near_vector_query_shape() {
        let q = near_vector_query("articles", &[0.5, -0.25], 5);
        assert!(q.contains("Get { articles(nearVector: {vector: [0.5,-0.25]}, limit: 5)"));
        assert!(q.contains("article_id content"));
    }

    #[test]
    fn near_vector_result_path() {
        let body: Value = serde_json::from_str(
            r#"{"data": {"Get": {"articles": [{"article_id": "a1", "content": "c"}]}}}"#,
        )
        .unwrap();
        let objects = body.pointer("/data/Get/articles").and_then(Value::as_array).unwrap();
        assert_eq!(objects[0]["article_id"], "a1");
    }
}
