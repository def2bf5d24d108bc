use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use newsflow_broker::{DeliveryHandler, HandlerError, Publisher};
use newsflow_core::ArticleMessage;

use crate::analyser::ArticleAnalyser;
use crate::gateway::GatewayClient;
use crate::policy::{TradeExecutor, TradePolicy};

/// Per-message orchestration for the analyser stage.
///
/// Runs inside the broker's delivery scope: a returned error rejects the
/// message without requeue. The gateway push and the trade policy are both
/// best-effort and never fail the message.
pub struct AnalyserStage<E: TradeExecutor> {
    analyser: ArticleAnalyser,
    policy: TradePolicy<E>,
    publisher: Arc<dyn Publisher>,
    out_queue: String,
    gateway: Option<GatewayClient>,
    /// Open question knob: also publish enriched messages that carry no
    /// structured block. Off by default.
    publish_unstructured: bool,
}

impl<E: TradeExecutor> AnalyserStage<E> {
    pub fn new(
        analyser: ArticleAnalyser,
        policy: TradePolicy<E>,
        publisher: Arc<dyn Publisher>,
        out_queue: impl Into<String>,
        gateway: Option<GatewayClient>,
    ) -> Self {
        Self {
            analyser,
            policy,
            publisher,
            out_queue: out_queue.into(),
            gateway,
            publish_unstructured: false,
        }
    }

    pub fn publish_unstructured(mut self, yes: bool) -> Self {
        self.publish_unstructured = yes;
        self
    }

    async fn publish_enriched(&self, msg: &ArticleMessage) -> Result<(), HandlerError> {
        let body = msg
            .to_json()
            .map_err(|e| HandlerError::new(format!("failed to encode enriched message: {e}")))?;
        self.publisher
            .publish(&self.out_queue, body.as_bytes())
            .await
            .map_err(|e| HandlerError::new(format!("failed to publish enriched message: {e}")))?;
        info!(queue = %self.out_queue, message_id = %msg.message_id, "enriched message published");
        Ok(())
    }

    async fn push_to_gateway(&self, message_id: &str, body: &str) {
        let Some(gateway) = &self.gateway else {
            return;
        };
        // Timeouts and transport errors are logged and swallowed: the
        // article is already on queue B by the time we get here.
        if let Err(e) = gateway.push(body).await {
            error!(message_id, error = %e, "gateway push failed, skipping");
        }
    }
}

#[async_trait]
impl<E: TradeExecutor> DeliveryHandler for AnalyserStage<E> {
    async fn handle(&self, body: &str) -> Result<(), HandlerError> {
        let mut msg = ArticleMessage::from_json(body)
            .map_err(|e| HandlerError::new(format!("failed to decode article message: {e}")))?;
        info!(message_id = %msg.message_id, "new message received");

        let (structured, raw) = self
            .analyser
            .analyse(&msg.title, &msg.content)
            .await
            .map_err(|e| HandlerError::new(format!("analysis failed: {e}")))?;

        msg.response_struct = structured;
        msg.response_raw = Some(raw);

        let gateway_body = match &msg.response_struct {
            Some(value) => {
                self.policy.evaluate(value);
                self.publish_enriched(&msg).await?;
                serde_json::to_string_pretty(value)
                    .unwrap_or_else(|_| value.to_string())
            }
            None => {
                if self.publish_unstructured {
                    self.publish_enriched(&msg).await?;
                }
                msg.response_raw.clone().unwrap_or_default()
            }
        };

        self.push_to_gateway(&msg.message_id, &gateway_body).await;
        Ok(())
    }
}
