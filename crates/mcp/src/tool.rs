use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Describes a tool's interface as advertised to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name (e.g. "get_similar_articles").
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema describing the expected input.
    pub input_schema: Value,
    /// JSON Schema describing the result shape.
    pub output_schema: Value,
}

/// Every query tool returns `{"items": [...]}`; this is the schema each one
/// advertises for it.
pub fn items_output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "items": {
                "type": "array",
                "items": {"type": "object"}
            }
        },
        "required": ["items"]
    })
}

/// The extension point: all tools implement this trait.
///
/// A tool invocation moves received → validated → executed →
/// responded/errored; `execute` owns the validated/executed steps and maps
/// bad arguments to [`ToolError::InvalidInput`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's definition (name, description, schemas).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given JSON arguments.
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

/// Pull a required string argument out of a tool's input object.
pub fn required_str_arg<'a>(args: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidInput(format!("missing '{name}' string argument")))
}
