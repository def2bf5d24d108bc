use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{BasicAckOptions, BasicCancelOptions, BasicConsumeOptions, BasicRejectOptions};
use lapin::types::FieldTable;
use lapin::Channel;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::BrokerError;

/// Error returned by a delivery handler. The consumer only needs to know
/// that the delivery failed; the handler has already logged the details.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Processes one queue delivery. Handlers run in registration order inside
/// the delivery scope; the message is acknowledged iff every handler
/// returns `Ok`.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn handle(&self, body: &str) -> Result<(), HandlerError>;
}

/// Outcome of running all handlers for one delivery.
#[derive(Debug, PartialEq, Eq)]
pub enum DeliveryVerdict {
    Ack,
    /// Rejected without requeue so a poison message cannot loop forever.
    Reject,
}

/// Run every handler in registration order; the first failure decides a
/// reject. Factored out of the consume loop so the ack/reject discipline is
/// testable without a broker.
pub async fn run_handlers(
    handlers: &[Arc<dyn DeliveryHandler>],
    body: &str,
) -> DeliveryVerdict {
    for handler in handlers {
        if let Err(e) = handler.handle(body).await {
            error!(error = %e, "delivery handler failed");
            return DeliveryVerdict::Reject;
        }
    }
    DeliveryVerdict::Ack
}

/// Consumes one queue with per-delivery acknowledgement.
///
/// Deliveries are processed one at a time; handlers are never re-entered
/// concurrently for the same consumer. A stop signal terminates the loop
/// after the in-flight delivery completes.
pub struct QueueConsumer {
    channel: Channel,
    queue: String,
    consumer_tag: String,
    handlers: Vec<Arc<dyn DeliveryHandler>>,
}

impl QueueConsumer {
    pub fn new(channel: Channel, queue: impl Into<String>) -> Self {
        let queue = queue.into();
        Self {
            consumer_tag: format!("{queue}-consumer"),
            channel,
            queue,
            handlers: Vec::new(),
        }
    }

    /// Register a handler. Handlers run in registration order.
    pub fn with_handler(mut self, handler: Arc<dyn DeliveryHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Consume until the stop signal fires.
    ///
    /// Each delivery is decoded as UTF-8, passed through [`run_handlers`],
    /// and acked or rejected-without-requeue accordingly. Undecodable
    /// bodies are rejected. Returns after cancelling the consumer tag.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) -> Result<(), BrokerError> {
        if self.handlers.is_empty() {
            return Err(BrokerError::NoHandlers(self.queue.clone()));
        }

        let mut consumer = self
            .channel
            .basic_consume(
                &self.queue,
                &self.consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        info!(queue = %self.queue, "consumer started, waiting for messages");

        loop {
            tokio::select! {
                delivery = consumer.next() => {
                    let delivery = match delivery {
                        Some(Ok(d)) => d,
                        Some(Err(e)) => {
                            warn!(queue = %self.queue, error = %e, "consume error");
                            continue;
                        }
                        None => {
                            info!(queue = %self.queue, "consumer stream closed");
                            break;
                        }
                    };

                    match std::str::from_utf8(&delivery.data) {
                        Ok(body) => match run_handlers(&self.handlers, body).await {
                            DeliveryVerdict::Ack => {
                                delivery.ack(BasicAckOptions::default()).await?;
                                debug!(queue = %self.queue, "delivery acked");
                            }
                            DeliveryVerdict::Reject => {
                                delivery
                                    .reject(BasicRejectOptions { requeue: false })
                                    .await?;
                            }
                        },
                        Err(e) => {
                            error!(queue = %self.queue, error = %e, "delivery is not valid UTF-8");
                            delivery
                                .reject(BasicRejectOptions { requeue: false })
                                .await?;
                        }
                    }
                }
                changed = stop.changed() => {
                    // A dropped sender counts as a stop request too.
                    if changed.is_err() || *stop.borrow() {
                        info!(queue = %self.queue, "stop signalled, ending consume loop");
                        break;
                    }
                }
            }
        }

        if let Err(e) = self
            .channel
            .basic_cancel(&self.consumer_tag, BasicCancelOptions::default())
            .await
        {
            warn!(queue = %self.queue, error = %e, "failed to cancel consumer");
        }
        Ok(())
    }
}
