//! # Broker Channel Abstraction
//!
//! A platform-level abstraction over a message broker channel for producer
//! modules that publish routed, durable messages.
//!
//! ## Why This Lives in Tier 1
//!
//! Producers share one physical broker channel and the same topology model
//! (exchange, queue, binding). Placing the abstraction in `platform/` allows:
//! - Producer modules to stay independent of the broker client library
//! - Config-driven swap between AMQP (production) and InMemory (dev/test)
//! - Deterministic tests of topology declaration and routing without a broker
//!
//! ## Implementations
//!
//! - **AmqpBus**: Production implementation on a shared AMQP channel with
//!   publisher confirms
//! - **InMemoryBus**: Test/dev implementation modelling exchanges, queues and
//!   bindings in memory
//!
//! ## Usage
//!
//! ```rust
//! use event_bus::{BrokerChannel, ExchangeKind, InMemoryBus, OutboundMessage, PublishFlags};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus: Arc<dyn BrokerChannel> = Arc::new(InMemoryBus::new());
//!
//! bus.declare_exchange("orders", ExchangeKind::Direct, true).await?;
//! bus.declare_queue("orders_queue", true).await?;
//! bus.bind_queue("orders_queue", "orders", "orders_key").await?;
//!
//! let message = OutboundMessage::json(br#"{"order_id":"1"}"#.to_vec());
//! bus.publish("orders", "orders_key", PublishFlags::default(), message).await?;
//! # Ok(())
//! # }
//! ```

mod amqp_bus;
pub mod connect_retry;
mod envelope;
mod inmemory_bus;
mod message;

pub use amqp_bus::AmqpBus;
pub use envelope::{validate_envelope_fields, MutationAction, MutationEnvelope};
pub use inmemory_bus::InMemoryBus;
pub use message::{MessageProperties, OutboundMessage, RoutedMessage, JSON_CONTENT_TYPE};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange routing strategy
///
/// Producers only route point-to-point, so only direct exchanges are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    /// Routes to queues whose binding key equals the routing key
    Direct,
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeKind::Direct => f.write_str("direct"),
        }
    }
}

/// Broker-side publish flags for unroutable/undeliverable messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishFlags {
    /// Return the message to the publisher if no queue is bound for it
    pub mandatory: bool,
    /// Return the message if no consumer can take it immediately
    pub immediate: bool,
}

impl PublishFlags {
    pub const fn new(mandatory: bool, immediate: bool) -> Self {
        Self {
            mandatory,
            immediate,
        }
    }
}

/// Broker's view of a declared queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueInfo {
    pub name: String,
    pub message_count: u32,
    pub consumer_count: u32,
}

/// Errors that can occur when talking to the broker
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// An entity already exists with different parameters
    #[error("topology conflict on {entity}: {reason}")]
    TopologyConflict { entity: String, reason: String },

    #[error("{entity} not found")]
    NotFound { entity: String },

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// A mandatory publish matched no bound queue
    #[error("message to exchange '{exchange}' with routing key '{routing_key}' was unroutable")]
    Unroutable {
        exchange: String,
        routing_key: String,
    },

    #[error("broker rejected message to exchange '{exchange}'")]
    Nacked { exchange: String },

    #[error("failed to publish message: {0}")]
    PublishError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),
}

/// Result type for broker operations
pub type BusResult<T> = Result<T, BusError>;

/// Core broker channel abstraction for topology declaration and publishing
///
/// Every method must be safe to call concurrently from many tasks sharing one
/// channel. Declarations are idempotent: repeating a declaration with identical
/// parameters succeeds without changing broker state.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Declare an exchange
    ///
    /// # Returns
    /// * `Ok(())` if the exchange exists with exactly these parameters afterwards
    /// * `Err(BusError::TopologyConflict)` if it exists with a different durability
    async fn declare_exchange(&self, name: &str, kind: ExchangeKind, durable: bool)
        -> BusResult<()>;

    /// Declare a queue
    ///
    /// # Returns
    /// * `Ok(QueueInfo)` describing the queue as the broker sees it
    /// * `Err(BusError::TopologyConflict)` if it exists with a different durability
    async fn declare_queue(&self, name: &str, durable: bool) -> BusResult<QueueInfo>;

    /// Bind a queue to an exchange under a routing key
    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> BusResult<()>;

    /// Publish a message to an exchange
    ///
    /// Resolves once the broker has accepted the message. Implementations with
    /// publisher confirms resolve only after the confirm arrives.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        flags: PublishFlags,
        message: OutboundMessage,
    ) -> BusResult<()>;

    /// Whether the underlying channel is currently usable
    fn is_connected(&self) -> bool;
}

impl fmt::Debug for dyn BrokerChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BrokerChannel")
    }
}
