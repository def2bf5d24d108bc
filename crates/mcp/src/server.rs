//! MCP server core: dispatches JSON-RPC requests to the tool registry.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::McpError;
use crate::registry::ToolRegistry;
use crate::tool::ToolError;
use crate::transport::McpTransport;
use crate::types::*;

/// Bridges a [`ToolRegistry`] to MCP clients.
pub struct McpServer {
    registry: ToolRegistry,
    server_name: String,
    server_version: String,
    initialized: bool,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            server_name: "newsflow-mcp".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            initialized: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Serve a line-based transport until it closes.
    pub async fn run<T: McpTransport>(&mut self, transport: &mut T) -> Result<(), McpError> {
        tracing::info!(server = %self.server_name, "MCP server starting");

        loop {
            let line = match transport.receive().await? {
                Some(line) => line,
                None => {
                    info!("transport closed, shutting down");
                    break;
                }
            };

            let raw: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "failed to parse JSON");
                    let resp = JsonRpcResponse {
                        jsonrpc: "2.0".to_string(),
                        id: RpcId::Number(0),
                        result: None,
                        error: Some(McpError::JsonParse(e).to_rpc_error()),
                    };
                    transport.send(&serde_json::to_string(&resp)?).await?;
                    continue;
                }
            };

            // No "id" means a notification; nothing to answer.
            if raw.get("id").is_none() {
                if let Ok(notif) = serde_json::from_value::<JsonRpcNotification>(raw) {
                    self.handle_notification(&notif);
                }
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_value(raw) {
                Ok(req) => req,
                Err(e) => {
                    warn!(error = %e, "failed to parse JSON-RPC request");
                    let resp = JsonRpcResponse {
                        jsonrpc: "2.0".to_string(),
                        id: RpcId::Number(0),
                        result: None,
                        error: Some(McpError::JsonParse(e).to_rpc_error()),
                    };
                    transport.send(&serde_json::to_string(&resp)?).await?;
                    continue;
                }
            };

            let response = self.handle_request(&request).await;
            transport.send(&serde_json::to_string(&response)?).await?;
        }

        Ok(())
    }

    /// Handle a single JSON-RPC request and produce a response.
    pub async fn handle_request(&mut self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, &request.params).await,
            method => {
                warn!(method = %method, "unknown method");
                let err = McpError::MethodNotFound(method.to_string());
                JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string())
            }
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => info!("client confirmed initialization"),
            method => debug!(method = %method, "unknown notification, ignoring"),
        }
    }

    fn handle_initialize(&mut self, id: RpcId) -> JsonRpcResponse {
        info!("handling initialize");
        self.initialized = true;

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: Some(self.server_version.clone()),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                let err = McpError::JsonParse(e);
                JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string())
            }
        }
    }

    fn handle_list_tools(&self, id: RpcId) -> JsonRpcResponse {
        debug!("handling tools/list");

        let tools: Vec<ToolInfo> = self.registry.list().into_iter().map(ToolInfo::from).collect();
        match serde_json::to_value(ListToolsResult { tools }) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                let err = McpError::JsonParse(e);
                JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string())
            }
        }
    }

    async fn handle_call_tool(&self, id: RpcId, params: &Option<Value>) -> JsonRpcResponse {
        // received
        let Some(params) = params else {
            let err = McpError::InvalidParams("missing params".to_string());
            return JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string());
        };

        let call_params: CallToolParams = match serde_json::from_value(params.clone()) {
            Ok(p) => p,
            Err(e) => {
                let err = McpError::InvalidParams(e.to_string());
                return JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string());
            }
        };

        debug!(tool = %call_params.name, "tool call received");

        let tool = match self.registry.get(&call_params.name) {
            Some(t) => t,
            None => {
                let err = McpError::ToolNotFound(call_params.name.clone());
                return JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string());
            }
        };

        // validated → executed → responded | errored
        let result = match tool.execute(call_params.arguments).await {
            Ok(value) => {
                debug!(tool = %call_params.name, "tool call responded");
                CallToolResult {
                    content: vec![ToolContent::Text {
                        text: value.to_string(),
                    }],
                    is_error: false,
                }
            }
            Err(e @ ToolError::InvalidInput(_)) => {
                warn!(tool = %call_params.name, error = %e, "tool call validation failed");
                CallToolResult {
                    content: vec![ToolContent::Text { text: e.to_string() }],
                    is_error: true,
                }
            }
            Err(e) => {
                warn!(tool = %call_params.name, error = %e, "tool call errored");
                CallToolResult {
                    content: vec![ToolContent::Text { text: e.to_string() }],
                    is_error: true,
                }
            }
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                let err = McpError::JsonParse(e);
                JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{items_output_schema, Tool, ToolDefinition};
    use crate::transport::ChannelTransport;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct ItemsTool;

    #[async_trait]
    impl Tool for ItemsTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "items".to_string(),
                description: "returns one item".to_string(),
                input_schema: json!({"type": "object"}),
                output_schema: items_output_schema(),
            }
        }

        async fn execute(&self, args: Value) -> Result<Value, ToolError> {
            if args.get("explode").is_some() {
                return Err(ToolError::ExecutionFailed("exploded".into()));
            }
            Ok(json!({"items": [{"ok": true}]}))
        }
    }

    fn server() -> McpServer {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(ItemsTool)).unwrap();
        McpServer::new(registry)
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let mut server = server();
        let req = JsonRpcRequest::new(RpcId::Number(1), "initialize", Some(json!({})));
        let resp = server.handle_request(&req).await;
        assert!(resp.error.is_none());
        let result: InitializeResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.protocol_version, PROTOCOL_VERSION);
        assert_eq!(result.server_info.name, "newsflow-mcp");
    }

    #[tokio::test]
    async fn list_tools_advertises_output_schema() {
        let mut server = server();
        let req = JsonRpcRequest::new(RpcId::Number(2), "tools/list", None);
        let resp = server.handle_request(&req).await;
        let result: ListToolsResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.tools.len(), 1);
        assert_eq!(result.tools[0].output_schema, items_output_schema());
    }

    #[tokio::test]
    async fn call_tool_returns_items_payload() {
        let mut server = server();
        let req = JsonRpcRequest::new(
            RpcId::Number(3),
            "tools/call",
            Some(json!({"name": "items", "arguments": {}})),
        );
        let resp = server.handle_request(&req).await;
        let result: CallToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(!result.is_error);
        let ToolContent::Text { text } = &result.content[0];
        let value: Value = serde_json::from_str(text).unwrap();
        assert_eq!(value["items"][0]["ok"], true);
    }

    #[tokio::test]
    async fn call_tool_execution_failure_is_surfaced() {
        let mut server = server();
        let req = JsonRpcRequest::new(
            RpcId::Number(4),
            "tools/call",
            Some(json!({"name": "items", "arguments": {"explode": 1}})),
        );
        let resp = server.handle_request(&req).await;
        let result: CallToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let mut server = server();
        let req = JsonRpcRequest::new(
            RpcId::Number(5),
            "tools/call",
            Some(json!({"name": "ghost", "arguments": {}})),
        );
        let resp = server.handle_request(&req).await;
        assert_eq!(resp.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let mut server = server();
        let req = JsonRpcRequest::new(RpcId::Number(6), "unknown/method", None);
        let resp = server.handle_request(&req).await;
        assert_eq!(resp.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn run_serves_a_channel_transport() {
        let (mut client, mut server_side) = ChannelTransport::pair();
        let mut server = server();

        let handle = tokio::spawn(async move { server.run(&mut server_side).await });

        let call = JsonRpcRequest::new(
            RpcId::Number(1),
            "tools/call",
            Some(json!({"name": "items", "arguments": {}})),
        );
        client.send(&serde_json::to_string(&call).unwrap()).await.unwrap();

        let line = client.receive().await.unwrap().unwrap();
        let resp: JsonRpcResponse = serde_json::from_str(&line).unwrap();
        assert!(resp.error.is_none());

        drop(client);
        handle.await.unwrap().unwrap();
    }
}
