use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use newsflow_store::AnalysisHistory;

use crate::tool::{items_output_schema, required_str_arg, Tool, ToolDefinition, ToolError};

/// Historical-analysis lookup by article id against the relational store.
/// Zero or one rows, returned as-is.
pub struct HistoricalAnalysisTool {
    store: Arc<dyn AnalysisHistory>,
}

impl HistoricalAnalysisTool {
    pub fn new(store: Arc<dyn AnalysisHistory>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for HistoricalAnalysisTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_article_historical_analysis".to_string(),
            description: "Get the stored analysis of an article by id".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "article_id": {
                        "type": "string",
                        "description": "Article id"
                    }
                },
                "required": ["article_id"]
            }),
            output_schema: items_output_schema(),
        }
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let article_id = required_str_arg(&args, "article_id")?;

        let items = self
            .store
            .history(article_id)
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("history lookup failed: {e}")))?;

        if items.is_empty() {
            info!(article_id, "no stored analysis found");
        }
        Ok(json!({"items": items}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsflow_store::StoreError;
    use std::collections::HashMap;

    struct MapStore {
        rows: HashMap<String, Value>,
    }

    #[async_trait]
    impl AnalysisHistory for MapStore {
        async fn history(&self, article_id: &str) -> Result<Vec<Value>, StoreError> {
            Ok(self.rows.get(article_id).cloned().into_iter().collect())
        }
    }

    fn tool_with_row(id: &str) -> HistoricalAnalysisTool {
        let mut rows = HashMap::new();
        rows.insert(
            id.to_string(),
            json!({"article_id": id, "title": "t", "analysis": "ok"}),
        );
        HistoricalAnalysisTool::new(Arc::new(MapStore { rows }))
    }

    #[tokio::test]
    async fn known_id_returns_single_item() {
        let tool = tool_with_row("a1");
        let result = tool.execute(json!({"article_id": "a1"})).await.unwrap();
        let items = result["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["article_id"], "a1");
    }

    #[tokio::test]
    async fn unknown_id_returns_empty_items() {
        let tool = tool_with_row("a1");
        let result = tool.execute(json!({"article_id": "a2"})).await.unwrap();
        assert_eq!(result, json!({"items": []}));
    }

    #[tokio::test]
    async fn missing_argument_is_invalid_input() {
        let tool = tool_with_row("a1");
        assert!(matches!(
            tool.execute(json!({})).await,
            Err(ToolError::InvalidInput(_))
        ));
    }
}
