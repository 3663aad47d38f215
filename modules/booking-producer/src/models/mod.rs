//! Domain payloads and the inbound request/response types that produce them
//!
//! Each inbound request is validated and mapped field by field into the
//! payload the codec serialises. Payload field names are the wire contract
//! consumers already depend on.

pub mod catalog;
pub mod mail;
pub mod payment;
pub mod seats;

pub use catalog::{CastAndCrew, CastEvent, CastMutationRequest, MovieTimeSlot, MovieTimeSlotEvent};
pub use mail::{MailRequest, SendMailRequest};
pub use payment::{Payment, PaymentOutcome, PaymentWebhookRequest};
pub use seats::{SeatIdSet, SeatsRequest};

use serde::{Deserialize, Serialize};

/// Response body shared by every operation
///
/// An empty `error` means the message was accepted by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerResponse {
    pub error: String,
}

impl ProducerResponse {
    pub fn success() -> Self {
        Self {
            error: String::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

/// An inbound request that cannot be turned into a payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// The body is not JSON of the expected shape
    #[error("malformed body: {0}")]
    Malformed(String),
}

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing { field });
    }
    Ok(())
}
