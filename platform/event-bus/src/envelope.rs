//! # Mutation Envelope
//!
//! Envelope for catalog mutation messages published by producer modules.
//!
//! ## Envelope Fields
//!
//! - `action`: What happened to the entity (`create` or `delete`)
//! - `model`: Fixed string naming the entity kind (e.g. `cast-and-crew`)
//! - `data`: Entity payload (generic type parameter)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationAction {
    Create,
    Delete,
}

impl MutationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationAction::Create => "create",
            MutationAction::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope wrapping a catalog entity for downstream consumers
///
/// # Examples
///
/// ```rust
/// use event_bus::{MutationAction, MutationEnvelope};
///
/// let envelope = MutationEnvelope::new(MutationAction::Delete, "cast-and-crew", serde_json::json!({"uid": "cast-123"}));
/// let body = serde_json::to_value(&envelope).unwrap();
/// assert_eq!(body["action"], "delete");
/// assert_eq!(body["model"], "cast-and-crew");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationEnvelope<T> {
    pub action: MutationAction,
    pub model: String,
    pub data: T,
}

impl<T> MutationEnvelope<T> {
    pub fn new(action: MutationAction, model: impl Into<String>, data: T) -> Self {
        Self {
            action,
            model: model.into(),
            data,
        }
    }
}

/// Validate a serialized mutation envelope
///
/// # Validation Rules
///
/// - `action`: Must be `create` or `delete`
/// - `model`: Must be a non-empty string
/// - `data`: Must be present and not null
///
/// # Errors
///
/// Returns a descriptive error string if validation fails
pub fn validate_envelope_fields(envelope: &serde_json::Value) -> Result<(), String> {
    let action = envelope
        .get("action")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid action")?;

    if action != "create" && action != "delete" {
        return Err(format!("Unknown action: {action}"));
    }

    let model = envelope
        .get("model")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid model")?;

    if model.is_empty() {
        return Err("model cannot be empty".to_string());
    }

    match envelope.get("data") {
        Some(data) if !data.is_null() => Ok(()),
        _ => Err("Missing data".to_string()),
    }
}
