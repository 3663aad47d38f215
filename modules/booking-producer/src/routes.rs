use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use event_bus::BrokerChannel;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::dispatcher::{DispatchError, Dispatcher};
use crate::metrics::Metrics;
use crate::models::{
    CastMutationRequest, MovieTimeSlot, PaymentWebhookRequest, ProducerResponse, SeatsRequest,
    SendMailRequest, ValidationError,
};
use crate::topology::{self, Operation};

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub channel: Arc<dyn BrokerChannel>,
    pub metrics: Metrics,
    /// Serve `GET /api/topology`
    pub expose_topology: bool,
}

pub fn producer_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Operations
        .route("/api/payments/webhook", post(payment_webhook))
        .route("/api/seats/lock", post(lock_seats))
        .route("/api/seats/unlock", post(unlock_seats))
        .route("/api/mail", post(send_mail))
        .route("/api/catalog/cast", post(cast_mutation))
        .route("/api/catalog/movie-time-slots", post(movie_time_slot))
        // Operational
        .route("/api/health", get(health_live))
        .route("/api/ready", get(health_ready))
        .route("/metrics", get(metrics));

    if state.expose_topology {
        router = router.route("/api/topology", get(topology_table));
    }

    router.with_state(state)
}

type DispatchResponse = Result<Json<ProducerResponse>, DispatchError>;

/// A JSON body, or the rejection rendered like every other invalid request
type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Unwrap a parsed body, counting an unparseable one against `operation`
///
/// Operations chosen from the body itself (payment outcome, cast action) are
/// counted against their default.
fn parsed<T>(
    state: &AppState,
    operation: Operation,
    body: JsonBody<T>,
) -> Result<T, DispatchError> {
    body.map(|Json(req)| req).map_err(|rejection| {
        state
            .dispatcher
            .reject(operation, ValidationError::Malformed(rejection.body_text()))
    })
}

/// POST /api/payments/webhook - Forward a payment outcome
async fn payment_webhook(
    State(state): State<AppState>,
    body: JsonBody<PaymentWebhookRequest>,
) -> DispatchResponse {
    let req = parsed(&state, Operation::PaymentSuccess, body)?;
    state.dispatcher.payment_webhook(req).await.map(Json)
}

/// POST /api/seats/lock
async fn lock_seats(
    State(state): State<AppState>,
    body: JsonBody<SeatsRequest>,
) -> DispatchResponse {
    let req = parsed(&state, Operation::LockSeats, body)?;
    state.dispatcher.lock_seats(req).await.map(Json)
}

/// POST /api/seats/unlock
async fn unlock_seats(
    State(state): State<AppState>,
    body: JsonBody<SeatsRequest>,
) -> DispatchResponse {
    let req = parsed(&state, Operation::UnlockSeats, body)?;
    state.dispatcher.unlock_seats(req).await.map(Json)
}

/// POST /api/mail - Queue a booking confirmation mail
async fn send_mail(
    State(state): State<AppState>,
    body: JsonBody<SendMailRequest>,
) -> DispatchResponse {
    let req = parsed(&state, Operation::SendMail, body)?;
    state.dispatcher.send_mail(req).await.map(Json)
}

/// POST /api/catalog/cast - Create or delete a cast/crew member
async fn cast_mutation(
    State(state): State<AppState>,
    body: JsonBody<CastMutationRequest>,
) -> DispatchResponse {
    let req = parsed(&state, Operation::CastCreate, body)?;
    state.dispatcher.cast_mutation(req).await.map(Json)
}

/// POST /api/catalog/movie-time-slots
async fn movie_time_slot(
    State(state): State<AppState>,
    body: JsonBody<MovieTimeSlot>,
) -> DispatchResponse {
    let req = parsed(&state, Operation::MovieTimeSlotCreate, body)?;
    state.dispatcher.movie_time_slot_created(req).await.map(Json)
}

async fn health_live() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "module": "booking-producer",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health_ready(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let connected = state.channel.is_connected();
    state
        .metrics
        .dep_up
        .with_label_values(&["amqp"])
        .set(i64::from(connected));

    if !connected {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(json!({
        "status": "ready",
        "amqp": "connected"
    })))
}

async fn topology_table() -> Json<Value> {
    Json(json!({ "operations": topology::descriptors() }))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics error: {e}")),
    }
}
