use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use newsflow_store::{Embedder, VectorSearch};

use crate::tool::{items_output_schema, required_str_arg, Tool, ToolDefinition, ToolError};

/// Matches returned per lookup.
const SIMILAR_LIMIT: usize = 5;

/// Semantic similar-articles lookup: embed the input, search the vector
/// store, return the matched properties verbatim.
pub struct SimilarArticlesTool {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorSearch>,
}

impl SimilarArticlesTool {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorSearch>) -> Self {
        Self { embedder, store }
    }
}

#[async_trait]
impl Tool for SimilarArticlesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_similar_articles".to_string(),
            description: "Get articles similar to the given content".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "article_content": {
                        "type": "string",
                        "description": "Article text to match against"
                    }
                },
                "required": ["article_content"]
            }),
            output_schema: items_output_schema(),
        }
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let content = required_str_arg(&args, "article_content")?;

        // Blank input short-circuits before any store traffic.
        if content.trim().is_empty() {
            info!("article content is empty, returning no matches");
            return Ok(json!({"items": []}));
        }

        let vector = self
            .embedder
            .encode(content)
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("embedding failed: {e}")))?;

        let items = self
            .store
            .near_vector(&vector, SIMILAR_LIMIT)
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("vector search failed: {e}")))?;

        if items.is_empty() {
            info!("no similar articles found");
        }
        Ok(json!({"items": items}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsflow_store::{EmbeddingError, StoreError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn encode(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
        results: Vec<Value>,
    }

    #[async_trait]
    impl VectorSearch for CountingStore {
        async fn near_vector(&self, _vector: &[f32], limit: usize) -> Result<Vec<Value>, StoreError> {
            assert_eq!(limit, 5);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.results.clone())
        }
    }

    #[tokio::test]
    async fn blank_input_returns_empty_without_store_call() {
        let store = Arc::new(CountingStore::default());
        let tool = SimilarArticlesTool::new(Arc::new(FixedEmbedder), store.clone());

        let result = tool
            .execute(json!({"article_content": "   "}))
            .await
            .unwrap();
        assert_eq!(result, json!({"items": []}));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn matches_are_returned_verbatim() {
        let store = Arc::new(CountingStore {
            calls: AtomicUsize::new(0),
            results: vec![json!({"article_id": "a1", "content": "c1"})],
        });
        let tool = SimilarArticlesTool::new(Arc::new(FixedEmbedder), store.clone());

        let result = tool
            .execute(json!({"article_content": "rates"}))
            .await
            .unwrap();
        assert_eq!(result["items"][0]["article_id"], "a1");
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_argument_is_invalid_input() {
        let tool = SimilarArticlesTool::new(Arc::new(FixedEmbedder), Arc::new(CountingStore::default()));
        assert!(matches!(
            tool.execute(json!({})).await,
            Err(ToolError::InvalidInput(_))
        ));
    }
}
