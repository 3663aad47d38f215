//! HTTP rendering of dispatch failures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::dispatcher::DispatchError;
use crate::models::ProducerResponse;
use crate::publisher::PublishError;

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::DeadlineExceeded { .. }
            | DispatchError::Publish(PublishError::DeadlineExceeded { .. }) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            DispatchError::Publish(e) if e.is_conflict() => StatusCode::CONFLICT,
            DispatchError::Publish(PublishError::Encode(_)) | DispatchError::Aborted { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DispatchError::Publish(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ProducerResponse::failure(self.to_string())),
        )
            .into_response()
    }
}
