//! Gateway relay: accepts `Push(message)` calls from the analyser and
//! forwards the payload to the configured external HTTP endpoint.

pub mod forward;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub use forward::{classify_body, BodyKind, Forwarder};

#[derive(Debug, Deserialize)]
pub struct PushRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PushResponse {
    pub status_code: i32,
    pub response_text: String,
}

/// Build the router serving `POST /push`.
pub fn router(forwarder: Forwarder) -> Router {
    Router::new()
        .route("/push", post(handle_push))
        .with_state(Arc::new(forwarder))
}

async fn handle_push(
    State(forwarder): State<Arc<Forwarder>>,
    Json(request): Json<PushRequest>,
) -> (StatusCode, Json<PushResponse>) {
    match forwarder.forward(&request.message).await {
        Ok((status_code, response_text)) => {
            info!(status_code, "push relayed");
            (
                StatusCode::OK,
                Json(PushResponse {
                    status_code: i32::from(status_code),
                    response_text,
                }),
            )
        }
        Err(e) => {
            error!(error = %e, "failed to relay push");
            (
                StatusCode::BAD_GATEWAY,
                Json(PushResponse {
                    status_code: 502,
                    response_text: e.to_string(),
                }),
            )
        }
    }
}

/// Serve the router until `shutdown` resolves.
pub async fn serve(
    forwarder: Forwarder,
    port: u16,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "gateway relay listening");
    axum::serve(listener, router(forwarder))
        .with_graceful_shutdown(shutdown)
        .await
}
