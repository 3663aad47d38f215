use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Ordered seat identifiers, serialised as a bare JSON array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatIdSet(pub Vec<i64>);

impl SeatIdSet {
    pub fn ids(&self) -> &[i64] {
        &self.0
    }
}

/// Body of `POST /api/seats/lock` and `POST /api/seats/unlock`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeatsRequest {
    pub seat_ids: Vec<i32>,
}

impl TryFrom<SeatsRequest> for SeatIdSet {
    type Error = ValidationError;

    /// Keeps request order; every id widens losslessly
    fn try_from(request: SeatsRequest) -> Result<Self, Self::Error> {
        if request.seat_ids.is_empty() {
            return Err(ValidationError::Missing { field: "seat_ids" });
        }

        Ok(Self(request.seat_ids.into_iter().map(i64::from).collect()))
    }
}
