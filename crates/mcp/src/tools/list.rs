use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tool::{items_output_schema, Tool, ToolDefinition, ToolError};

/// Tool-form listing of every registered tool, for clients that only speak
/// `tools/call`. Holds a snapshot of the other tools' definitions taken at
/// registration time plus its own.
pub struct ListToolsTool {
    descriptors: Vec<ToolDefinition>,
}

impl ListToolsTool {
    fn own_definition() -> ToolDefinition {
        ToolDefinition {
            name: "list_tools".to_string(),
            description: "List all registered tools".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
            output_schema: items_output_schema(),
        }
    }

    /// Build from the definitions of the already-registered tools.
    pub fn new(other_tools: Vec<ToolDefinition>) -> Self {
        let mut descriptors = other_tools;
        descriptors.push(Self::own_definition());
        Self { descriptors }
    }
}

#[async_trait]
impl Tool for ListToolsTool {
    fn definition(&self) -> ToolDefinition {
        Self::own_definition()
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        let items = self
            .descriptors
            .iter()
            .map(|def| {
                serde_json::to_value(def)
                    .map_err(|e| ToolError::ExecutionFailed(format!("descriptor encode: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(json!({"items": items}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: "d".to_string(),
            input_schema: json!({"type": "object"}),
            output_schema: items_output_schema(),
        }
    }

    #[tokio::test]
    async fn lists_other_tools_and_itself() {
        let tool = ListToolsTool::new(vec![descriptor("a"), descriptor("b")]);
        let result = tool.execute(json!({})).await.unwrap();
        let names: Vec<_> = result["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "list_tools"]);
    }
}
