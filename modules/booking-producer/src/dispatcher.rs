//! Request dispatcher
//!
//! Every inbound request is validated, mapped to its payload and handed to a
//! detached publish task. The caller waits for whichever comes first: the
//! task's result or the dispatch deadline. A task that loses the race is
//! aborted and its result is never observed.

use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::codec::WirePayload;
use crate::metrics::Metrics;
use crate::models::catalog::cast_operation;
use crate::models::{
    CastEvent, CastMutationRequest, MailRequest, MovieTimeSlot, MovieTimeSlotEvent, Payment,
    PaymentOutcome, PaymentWebhookRequest, ProducerResponse, SeatIdSet, SeatsRequest,
    SendMailRequest, ValidationError,
};
use crate::publisher::{PublishError, Publisher};
use crate::topology::Operation;

pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadlines applied to each dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTimeouts {
    /// Bounds the whole request, from validation to response
    pub dispatch: Duration,
    /// Bounds the broker submission inside the publish task
    pub publish: Duration,
}

impl Default for DispatchTimeouts {
    fn default() -> Self {
        Self {
            dispatch: DEFAULT_DISPATCH_TIMEOUT,
            publish: DEFAULT_PUBLISH_TIMEOUT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("{operation} did not complete within {timeout:?}")]
    DeadlineExceeded {
        operation: Operation,
        timeout: Duration,
    },

    /// The publish task panicked or was cancelled
    #[error("{operation} publish task aborted: {reason}")]
    Aborted {
        operation: Operation,
        reason: String,
    },
}

impl DispatchError {
    /// True for both the outer deadline and the broker submission deadline
    pub fn is_deadline(&self) -> bool {
        matches!(
            self,
            DispatchError::DeadlineExceeded { .. }
                | DispatchError::Publish(PublishError::DeadlineExceeded { .. })
        )
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            DispatchError::InvalidRequest(_) => "invalid",
            DispatchError::Publish(PublishError::DeadlineExceeded { .. })
            | DispatchError::DeadlineExceeded { .. } => "timeout",
            DispatchError::Publish(_) => "failure",
            DispatchError::Aborted { .. } => "aborted",
        }
    }
}

pub type DispatchResult = Result<ProducerResponse, DispatchError>;

/// Turns inbound requests into bounded-time publishes
#[derive(Clone)]
pub struct Dispatcher {
    publisher: Publisher,
    metrics: Metrics,
    timeouts: DispatchTimeouts,
}

impl Dispatcher {
    pub fn new(publisher: Publisher, metrics: Metrics, timeouts: DispatchTimeouts) -> Self {
        Self {
            publisher,
            metrics,
            timeouts,
        }
    }

    pub async fn payment_webhook(&self, request: PaymentWebhookRequest) -> DispatchResult {
        let operation = match request.outcome {
            PaymentOutcome::Success => Operation::PaymentSuccess,
            PaymentOutcome::Failure => Operation::PaymentFailure,
        };
        let payment = Payment::try_from(request.payment_payload);
        self.dispatch(operation, payment).await
    }

    pub async fn lock_seats(&self, request: SeatsRequest) -> DispatchResult {
        self.dispatch(Operation::LockSeats, SeatIdSet::try_from(request))
            .await
    }

    pub async fn unlock_seats(&self, request: SeatsRequest) -> DispatchResult {
        self.dispatch(Operation::UnlockSeats, SeatIdSet::try_from(request))
            .await
    }

    pub async fn send_mail(&self, request: SendMailRequest) -> DispatchResult {
        self.dispatch(Operation::SendMail, MailRequest::try_from(request))
            .await
    }

    /// Create or delete a cast/crew member depending on the request action
    pub async fn cast_mutation(&self, request: CastMutationRequest) -> DispatchResult {
        let operation = cast_operation(request.action);
        self.dispatch(operation, CastEvent::try_from(request)).await
    }

    pub async fn movie_time_slot_created(&self, slot: MovieTimeSlot) -> DispatchResult {
        self.dispatch(
            Operation::MovieTimeSlotCreate,
            MovieTimeSlotEvent::try_from(slot),
        )
        .await
    }

    /// Record a request whose body never parsed, returning its error
    ///
    /// Counted against `operation` like any other rejected request.
    pub fn reject(&self, operation: Operation, error: ValidationError) -> DispatchError {
        let error = DispatchError::InvalidRequest(error);
        self.record(operation, Uuid::new_v4(), Metrics::timer(), Err(&error));
        error
    }

    async fn dispatch<P: WirePayload>(
        &self,
        operation: Operation,
        payload: Result<P, ValidationError>,
    ) -> DispatchResult {
        let started = Metrics::timer();
        let request_id = Uuid::new_v4();

        let result = match payload {
            Ok(payload) => self.race(operation, payload).await,
            Err(e) => Err(DispatchError::InvalidRequest(e)),
        };

        self.record(
            operation,
            request_id,
            started,
            result.as_ref().map(|_| ()),
        );
        result
    }

    /// Count, time and log a finished request
    fn record(
        &self,
        operation: Operation,
        request_id: Uuid,
        started: Instant,
        result: Result<(), &DispatchError>,
    ) {
        let outcome = match result {
            Ok(()) => "success",
            Err(e) => e.outcome_label(),
        };
        self.metrics
            .dispatch_total
            .with_label_values(&[operation.as_str(), outcome])
            .inc();
        self.metrics
            .dispatch_duration_seconds
            .with_label_values(&[operation.as_str()])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => tracing::info!(
                %request_id,
                %operation,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request dispatched"
            ),
            Err(DispatchError::InvalidRequest(e)) => {
                tracing::warn!(%request_id, %operation, error = %e, "Request rejected")
            }
            Err(e) => tracing::error!(%request_id, %operation, error = %e, "Dispatch failed"),
        }
    }

    /// Run the publish on its own task and wait at most the dispatch timeout
    async fn race<P: WirePayload>(&self, operation: Operation, payload: P) -> DispatchResult {
        let publisher = self.publisher.clone();
        let publish_timeout = self.timeouts.publish;
        let descriptor = operation.descriptor();

        let task = tokio::spawn(async move {
            publisher
                .publish(descriptor, &payload, publish_timeout)
                .await
        });
        let abort = task.abort_handle();

        match tokio::time::timeout(self.timeouts.dispatch, task).await {
            Ok(Ok(Ok(()))) => Ok(ProducerResponse::success()),
            Ok(Ok(Err(e))) => Err(DispatchError::Publish(e)),
            Ok(Err(join_error)) => Err(DispatchError::Aborted {
                operation,
                reason: join_error.to_string(),
            }),
            Err(_) => {
                abort.abort();
                Err(DispatchError::DeadlineExceeded {
                    operation,
                    timeout: self.timeouts.dispatch,
                })
            }
        }
    }
}
