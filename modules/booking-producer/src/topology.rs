//! Operation descriptors and the topology declarator
//!
//! Every publish re-declares its exchange, queue and binding. Declarations are
//! idempotent on the broker, so a restarted broker gets its topology back on
//! the next call without any process-local bookkeeping.

use event_bus::{BrokerChannel, BusError, ExchangeKind, PublishFlags, QueueInfo};
use serde::Serialize;
use std::fmt;

/// Every operation this service can publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    PaymentSuccess,
    PaymentFailure,
    LockSeats,
    UnlockSeats,
    SendMail,
    CastCreate,
    CastDelete,
    #[serde(rename = "movie-timeslot-create")]
    MovieTimeSlotCreate,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::PaymentSuccess,
        Operation::PaymentFailure,
        Operation::LockSeats,
        Operation::UnlockSeats,
        Operation::SendMail,
        Operation::CastCreate,
        Operation::CastDelete,
        Operation::MovieTimeSlotCreate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::PaymentSuccess => "payment-success",
            Operation::PaymentFailure => "payment-failure",
            Operation::LockSeats => "lock-seats",
            Operation::UnlockSeats => "unlock-seats",
            Operation::SendMail => "send-mail",
            Operation::CastCreate => "cast-create",
            Operation::CastDelete => "cast-delete",
            Operation::MovieTimeSlotCreate => "movie-timeslot-create",
        }
    }

    /// The broker wire contract for this operation
    pub fn descriptor(&self) -> &'static OperationDescriptor {
        &DESCRIPTORS[*self as usize]
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable per-operation routing and durability parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDescriptor {
    pub operation: Operation,
    pub exchange: &'static str,
    pub exchange_kind: ExchangeKind,
    pub exchange_durable: bool,
    pub queue: &'static str,
    pub queue_durable: bool,
    pub routing_key: &'static str,
    pub mandatory: bool,
    pub immediate: bool,
}

impl OperationDescriptor {
    pub fn publish_flags(&self) -> PublishFlags {
        PublishFlags::new(self.mandatory, self.immediate)
    }
}

// Indexed by Operation discriminant
static DESCRIPTORS: [OperationDescriptor; 8] = [
    OperationDescriptor {
        operation: Operation::PaymentSuccess,
        exchange: "payment_success_exchange",
        exchange_kind: ExchangeKind::Direct,
        exchange_durable: true,
        queue: "payment_service_success",
        queue_durable: true,
        routing_key: "payment_success_key",
        mandatory: false,
        immediate: false,
    },
    OperationDescriptor {
        operation: Operation::PaymentFailure,
        exchange: "payment_failure_exchange",
        exchange_kind: ExchangeKind::Direct,
        exchange_durable: true,
        queue: "payment_service_failure",
        queue_durable: true,
        routing_key: "payment_failure_key",
        mandatory: false,
        immediate: false,
    },
    OperationDescriptor {
        operation: Operation::LockSeats,
        exchange: "lock_seats",
        exchange_kind: ExchangeKind::Direct,
        exchange_durable: false,
        queue: "lock_seats_queue",
        queue_durable: true,
        routing_key: "lock_seats_key",
        mandatory: false,
        immediate: true,
    },
    OperationDescriptor {
        operation: Operation::UnlockSeats,
        exchange: "unlock_seats",
        exchange_kind: ExchangeKind::Direct,
        exchange_durable: false,
        queue: "unlock_seats_queue",
        queue_durable: true,
        routing_key: "unlock_seats_key",
        mandatory: false,
        immediate: true,
    },
    OperationDescriptor {
        operation: Operation::SendMail,
        exchange: "send_mail",
        exchange_kind: ExchangeKind::Direct,
        exchange_durable: false,
        queue: "send_mail_queue",
        queue_durable: true,
        routing_key: "send_mail_key",
        mandatory: false,
        immediate: false,
    },
    OperationDescriptor {
        operation: Operation::CastCreate,
        exchange: "strapi_create_exchange",
        exchange_kind: ExchangeKind::Direct,
        exchange_durable: true,
        queue: "strapi_create",
        queue_durable: true,
        routing_key: "cast_creation",
        mandatory: false,
        immediate: false,
    },
    OperationDescriptor {
        operation: Operation::CastDelete,
        exchange: "strapi_create_exchange",
        exchange_kind: ExchangeKind::Direct,
        exchange_durable: true,
        queue: "strapi_create",
        queue_durable: true,
        routing_key: "cast_deletion",
        mandatory: false,
        immediate: false,
    },
    OperationDescriptor {
        operation: Operation::MovieTimeSlotCreate,
        exchange: "strapi_create_exchange",
        exchange_kind: ExchangeKind::Direct,
        exchange_durable: true,
        queue: "strapi_create",
        queue_durable: true,
        routing_key: "movie_time_slot_creation",
        mandatory: false,
        immediate: false,
    },
];

/// The full descriptor table
pub fn descriptors() -> &'static [OperationDescriptor] {
    &DESCRIPTORS
}

/// Queue as reported by the broker after declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    pub name: String,
    pub message_count: u32,
}

impl From<QueueInfo> for QueueHandle {
    fn from(info: QueueInfo) -> Self {
        Self {
            name: info.name,
            message_count: info.message_count,
        }
    }
}

/// Which declaration step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyStep {
    Exchange,
    Queue,
    Binding,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TopologyError {
    #[error("declaring exchange '{exchange}' failed: {source}")]
    Exchange {
        exchange: &'static str,
        #[source]
        source: BusError,
    },

    #[error("declaring queue '{queue}' failed: {source}")]
    Queue {
        queue: &'static str,
        #[source]
        source: BusError,
    },

    #[error("binding queue '{queue}' to '{exchange}' with key '{routing_key}' failed: {source}")]
    Binding {
        queue: &'static str,
        exchange: &'static str,
        routing_key: &'static str,
        #[source]
        source: BusError,
    },
}

impl TopologyError {
    pub fn step(&self) -> TopologyStep {
        match self {
            TopologyError::Exchange { .. } => TopologyStep::Exchange,
            TopologyError::Queue { .. } => TopologyStep::Queue,
            TopologyError::Binding { .. } => TopologyStep::Binding,
        }
    }

    /// The underlying broker error
    pub fn bus_error(&self) -> &BusError {
        match self {
            TopologyError::Exchange { source, .. }
            | TopologyError::Queue { source, .. }
            | TopologyError::Binding { source, .. } => source,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.bus_error(), BusError::TopologyConflict { .. })
    }
}

/// Ensure the exchange, queue and binding for `descriptor` exist
///
/// Aborts at the first failing step.
pub async fn declare(
    channel: &dyn BrokerChannel,
    descriptor: &OperationDescriptor,
) -> Result<QueueHandle, TopologyError> {
    channel
        .declare_exchange(
            descriptor.exchange,
            descriptor.exchange_kind,
            descriptor.exchange_durable,
        )
        .await
        .map_err(|source| TopologyError::Exchange {
            exchange: descriptor.exchange,
            source,
        })?;

    let queue = channel
        .declare_queue(descriptor.queue, descriptor.queue_durable)
        .await
        .map_err(|source| TopologyError::Queue {
            queue: descriptor.queue,
            source,
        })?;

    channel
        .bind_queue(descriptor.queue, descriptor.exchange, descriptor.routing_key)
        .await
        .map_err(|source| TopologyError::Binding {
            queue: descriptor.queue,
            exchange: descriptor.exchange,
            routing_key: descriptor.routing_key,
            source,
        })?;

    tracing::debug!(
        operation = %descriptor.operation,
        exchange = descriptor.exchange,
        queue = descriptor.queue,
        routing_key = descriptor.routing_key,
        "Topology declared"
    );

    Ok(queue.into())
}
