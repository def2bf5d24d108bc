use std::time::Duration;

use thiserror::Error;

/// Errors from the broker adapter.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to connect to broker within {0:?}")]
    ConnectTimeout(Duration),

    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("publish to '{routing_key}' was not confirmed")]
    Unconfirmed { routing_key: String },

    #[error("no handlers registered for queue '{0}'")]
    NoHandlers(String),
}
