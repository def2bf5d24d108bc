use std::time::{Duration, Instant};

use async_trait::async_trait;
use lapin::options::{ConfirmSelectOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::{error, info, warn};

use crate::config::BrokerConfig;
use crate::error::BrokerError;

/// Publish seam so stages can be exercised against a mock broker.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), BrokerError>;
}

/// Delivery mode 2 marks messages persistent so they survive broker restarts.
const PERSISTENT: u8 = 2;

/// Interval between connect attempts inside the retry budget.
const CONNECT_RETRY_WAIT: Duration = Duration::from_secs(5);

/// One broker connection plus one channel with publisher confirms enabled.
///
/// Owned by the supervisor of each process; consumers and publishers borrow
/// the channel. `shutdown` releases the channel then the connection and is
/// safe to call more than once.
pub struct Broker {
    connection: Connection,
    channel: Channel,
}

impl Broker {
    /// Connect with a fixed-backoff retry loop.
    ///
    /// Retries every 5 s until `config.connect_timeout` is spent, then fails
    /// with [`BrokerError::ConnectTimeout`]. Auth and host errors inside the
    /// budget are logged and retried; the broker may simply not be up yet.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let deadline = Instant::now() + config.connect_timeout;
        let uri = config.uri();

        loop {
            match Connection::connect(&uri, ConnectionProperties::default()).await {
                Ok(connection) => {
                    let channel = connection.create_channel().await?;
                    channel
                        .confirm_select(ConfirmSelectOptions::default())
                        .await?;
                    info!(host = %config.host, "connected to broker");
                    return Ok(Self { connection, channel });
                }
                Err(e) => {
                    if Instant::now() + CONNECT_RETRY_WAIT > deadline {
                        error!(error = %e, "giving up connecting to broker");
                        return Err(BrokerError::ConnectTimeout(config.connect_timeout));
                    }
                    warn!(error = %e, "broker connect failed, retrying");
                    tokio::time::sleep(CONNECT_RETRY_WAIT).await;
                }
            }
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Declare a durable queue.
    pub async fn declare_queue(&self, name: &str) -> Result<(), BrokerError> {
        self.channel
            .queue_declare(
                name,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    /// Publish to the default exchange and await the publisher confirm.
    ///
    /// At-least-once: an error here means the message may or may not have
    /// reached the broker, and the caller decides whether to retry.
    pub async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), BrokerError> {
        let confirm = self
            .channel
            .basic_publish(
                "",
                routing_key,
                Default::default(),
                body,
                BasicProperties::default().with_delivery_mode(PERSISTENT),
            )
            .await?
            .await?;

        if confirm.is_nack() {
            return Err(BrokerError::Unconfirmed {
                routing_key: routing_key.to_string(),
            });
        }
        Ok(())
    }

    /// Close the channel then the connection. Idempotent: failures are
    /// logged, never propagated, and a second call is a no-op at the
    /// protocol level.
    pub async fn shutdown(&self) {
        if let Err(e) = self.channel.close(200, "shutdown").await {
            warn!(error = %e, "failed to close broker channel");
        }
        if let Err(e) = self.connection.close(200, "shutdown").await {
            warn!(error = %e, "failed to close broker connection");
        }
        info!("broker connection closed");
    }
}

#[async_trait]
impl Publisher for Broker {
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), BrokerError> {
        Broker::publish(self, routing_key, body).await
    }
}
