//! HTTP front-end for the MCP server: one JSON-RPC request per POST.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::McpError;
use crate::server::McpServer;
use crate::types::{JsonRpcRequest, JsonRpcResponse, RpcId};

type SharedServer = Arc<Mutex<McpServer>>;

/// Build the router serving `POST /mcp`.
pub fn router(server: McpServer) -> Router {
    Router::new()
        .route("/mcp", post(handle))
        .with_state(Arc::new(Mutex::new(server)))
}

async fn handle(
    State(server): State<SharedServer>,
    Json(raw): Json<Value>,
) -> (StatusCode, Json<JsonRpcResponse>) {
    // Notifications carry no id and get no body; acknowledge with 202.
    if raw.get("id").is_none() {
        return (
            StatusCode::ACCEPTED,
            Json(JsonRpcResponse::success(RpcId::Number(0), Value::Null)),
        );
    }

    let request: JsonRpcRequest = match serde_json::from_value(raw) {
        Ok(req) => req,
        Err(e) => {
            let err = McpError::JsonParse(e);
            return (
                StatusCode::OK,
                Json(JsonRpcResponse::error(
                    RpcId::Number(0),
                    err.to_rpc_error().code,
                    err.to_string(),
                )),
            );
        }
    };

    let response = server.lock().await.handle_request(&request).await;
    (StatusCode::OK, Json(response))
}

/// Serve the router until `shutdown` resolves.
pub async fn serve(
    server: McpServer,
    port: u16,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "MCP HTTP server listening");
    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown)
        .await
}
