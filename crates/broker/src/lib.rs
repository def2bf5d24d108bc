//! AMQP broker adapter.
//!
//! The single place that knows connection parameters, declares durable
//! queues, publishes with confirms, and consumes with per-delivery
//! ack/reject. Every stage of the pipeline talks to the broker through
//! this crate; nothing else holds a channel.

pub mod config;
pub mod connection;
pub mod consumer;
pub mod error;

pub use config::BrokerConfig;
pub use connection::{Broker, Publisher};
pub use consumer::{DeliveryHandler, HandlerError, QueueConsumer};
pub use error::BrokerError;
