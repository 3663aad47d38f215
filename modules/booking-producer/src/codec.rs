//! JSON codec for outgoing payloads
//!
//! Encoding is pure and deterministic: the same payload always yields the
//! same bytes, with keys emitted in declaration order.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{CastEvent, MailRequest, MovieTimeSlotEvent, Payment, SeatIdSet};

/// A payload that can be published
pub trait WirePayload: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Kind name used in logs and errors
    const KIND: &'static str;

    /// Stable identifier used as message and correlation id
    fn natural_key(&self) -> Option<&str> {
        None
    }
}

impl WirePayload for Payment {
    const KIND: &'static str = "payment";
}

impl WirePayload for SeatIdSet {
    const KIND: &'static str = "seat_ids";
}

impl WirePayload for MailRequest {
    const KIND: &'static str = "mail_request";
}

impl WirePayload for CastEvent {
    const KIND: &'static str = "cast_and_crew";

    fn natural_key(&self) -> Option<&str> {
        Some(&self.cast.uid)
    }
}

impl WirePayload for MovieTimeSlotEvent {
    const KIND: &'static str = "movie_time_slot";
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encode {kind}: {source}")]
pub struct EncodeError {
    pub kind: &'static str,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to decode {kind}: {source}")]
pub struct DecodeError {
    pub kind: &'static str,
    #[source]
    pub source: serde_json::Error,
}

pub fn encode<P: WirePayload>(payload: &P) -> Result<Vec<u8>, EncodeError> {
    serde_json::to_vec(payload).map_err(|source| EncodeError {
        kind: P::KIND,
        source,
    })
}

/// Inverse of [`encode`], used by consumers and tests
pub fn decode<P: WirePayload>(bytes: &[u8]) -> Result<P, DecodeError> {
    serde_json::from_slice(bytes).map_err(|source| DecodeError {
        kind: P::KIND,
        source,
    })
}
