use chrono::{DateTime, Utc};
use event_bus::{MutationAction, MutationEnvelope};
use serde::{Deserialize, Serialize};

use super::{require_non_empty, ValidationError};
use crate::topology::Operation;

pub const CAST_AND_CREW_MODEL: &str = "cast-and-crew";
pub const MOVIE_TIME_SLOT_MODEL: &str = "movie-time-slot";

/// A cast or crew member attached to a movie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastAndCrew {
    pub uid: String,
    /// `cast` or `crew`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub character: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub movie_id: u64,
}

/// A cast/crew create or delete, serialised inside a mutation envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    into = "MutationEnvelope<CastAndCrew>",
    try_from = "MutationEnvelope<CastAndCrew>"
)]
pub struct CastEvent {
    pub action: MutationAction,
    pub cast: CastAndCrew,
}

/// Routing operation for a cast/crew mutation
pub fn cast_operation(action: MutationAction) -> Operation {
    match action {
        MutationAction::Create => Operation::CastCreate,
        MutationAction::Delete => Operation::CastDelete,
    }
}

impl From<CastEvent> for MutationEnvelope<CastAndCrew> {
    fn from(event: CastEvent) -> Self {
        MutationEnvelope::new(event.action, CAST_AND_CREW_MODEL, event.cast)
    }
}

impl TryFrom<MutationEnvelope<CastAndCrew>> for CastEvent {
    type Error = String;

    fn try_from(envelope: MutationEnvelope<CastAndCrew>) -> Result<Self, Self::Error> {
        if envelope.model != CAST_AND_CREW_MODEL {
            return Err(format!(
                "expected model '{CAST_AND_CREW_MODEL}', got '{}'",
                envelope.model
            ));
        }
        Ok(Self {
            action: envelope.action,
            cast: envelope.data,
        })
    }
}

/// Body of `POST /api/catalog/cast`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CastMutationRequest {
    pub action: MutationAction,
    pub cast: CastAndCrew,
}

impl TryFrom<CastMutationRequest> for CastEvent {
    type Error = ValidationError;

    fn try_from(request: CastMutationRequest) -> Result<Self, Self::Error> {
        let cast = request.cast;
        require_non_empty("cast.uid", &cast.uid)?;

        // Deletes only need the uid
        if request.action == MutationAction::Create {
            require_non_empty("cast.name", &cast.name)?;
            if cast.kind != "cast" && cast.kind != "crew" {
                return Err(ValidationError::Invalid {
                    field: "cast.type",
                    reason: format!("expected 'cast' or 'crew', got '{}'", cast.kind),
                });
            }
        }

        Ok(Self {
            action: request.action,
            cast,
        })
    }
}

/// A scheduled screening of a movie at a venue
///
/// Timestamps are RFC 3339 on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieTimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Minutes
    pub duration: i32,
    pub movie_id: u64,
    pub date: DateTime<Utc>,
    pub movie_format: String,
    pub venue_id: u64,
}

/// A newly created time slot, serialised inside a mutation envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    into = "MutationEnvelope<MovieTimeSlot>",
    try_from = "MutationEnvelope<MovieTimeSlot>"
)]
pub struct MovieTimeSlotEvent {
    pub slot: MovieTimeSlot,
}

impl From<MovieTimeSlotEvent> for MutationEnvelope<MovieTimeSlot> {
    fn from(event: MovieTimeSlotEvent) -> Self {
        MutationEnvelope::new(MutationAction::Create, MOVIE_TIME_SLOT_MODEL, event.slot)
    }
}

impl TryFrom<MutationEnvelope<MovieTimeSlot>> for MovieTimeSlotEvent {
    type Error = String;

    fn try_from(envelope: MutationEnvelope<MovieTimeSlot>) -> Result<Self, Self::Error> {
        if envelope.model != MOVIE_TIME_SLOT_MODEL {
            return Err(format!(
                "expected model '{MOVIE_TIME_SLOT_MODEL}', got '{}'",
                envelope.model
            ));
        }
        if envelope.action != MutationAction::Create {
            return Err(format!("unsupported time slot action '{}'", envelope.action));
        }
        Ok(Self {
            slot: envelope.data,
        })
    }
}

impl TryFrom<MovieTimeSlot> for MovieTimeSlotEvent {
    type Error = ValidationError;

    fn try_from(slot: MovieTimeSlot) -> Result<Self, Self::Error> {
        if slot.end_time <= slot.start_time {
            return Err(ValidationError::Invalid {
                field: "end_time",
                reason: format!("must be after start_time {}", slot.start_time.to_rfc3339()),
            });
        }
        if slot.duration <= 0 {
            return Err(ValidationError::Invalid {
                field: "duration",
                reason: format!("must be positive, got {}", slot.duration),
            });
        }
        Ok(Self { slot })
    }
}
