//! # Booking Producer
//!
//! Accepts booking-side requests over HTTP and turns each one into a single
//! AMQP message: payment outcomes, seat locks and unlocks, confirmation mails
//! and catalog mutations. Every request is answered within a fixed deadline,
//! whether or not the broker ever confirms the publish.
//!
//! ## Flow
//!
//! ```text
//! HTTP request -> Dispatcher (validate, map) -> publish task
//!                                                 |- topology::declare
//!                                                 |- codec::encode
//!                                                 '- BrokerChannel::publish (+ confirm)
//! ```

pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod models;
pub mod publisher;
pub mod routes;
pub mod supervisor;
pub mod topology;

pub use config::{BusType, Config, ConfigError};
pub use dispatcher::{DispatchError, DispatchResult, DispatchTimeouts, Dispatcher};
pub use metrics::Metrics;
pub use publisher::{PublishError, Publisher};
pub use routes::{producer_router, AppState};
pub use topology::{Operation, OperationDescriptor};
