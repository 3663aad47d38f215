//! Message publisher
//!
//! Declares topology, encodes the payload and submits it on the shared
//! channel, bounding the broker submission (including the confirm) by a
//! deadline.

use event_bus::{BrokerChannel, BusError, OutboundMessage};
use std::sync::Arc;
use std::time::Duration;

use crate::codec::{self, EncodeError, WirePayload};
use crate::metrics::Metrics;
use crate::topology::{self, OperationDescriptor, TopologyError};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("publishing to exchange '{exchange}' failed: {source}")]
    Broker {
        exchange: &'static str,
        #[source]
        source: BusError,
    },

    #[error("broker did not confirm publish to '{exchange}' within {timeout:?}")]
    DeadlineExceeded {
        exchange: &'static str,
        timeout: Duration,
    },
}

impl PublishError {
    fn result_label(&self) -> &'static str {
        match self {
            PublishError::Topology(_) => "topology_error",
            PublishError::Encode(_) => "encode_error",
            PublishError::Broker { .. } => "broker_error",
            PublishError::DeadlineExceeded { .. } => "timeout",
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, PublishError::Topology(e) if e.is_conflict())
    }
}

/// Publishes payloads on one shared broker channel
#[derive(Clone)]
pub struct Publisher {
    channel: Arc<dyn BrokerChannel>,
    metrics: Metrics,
}

impl Publisher {
    pub fn new(channel: Arc<dyn BrokerChannel>, metrics: Metrics) -> Self {
        Self { channel, metrics }
    }

    /// Declare, encode and publish `payload` per `descriptor`
    ///
    /// `deadline` bounds only the broker submission; topology declaration
    /// is bounded by the caller.
    pub async fn publish<P: WirePayload>(
        &self,
        descriptor: &'static OperationDescriptor,
        payload: &P,
        deadline: Duration,
    ) -> Result<(), PublishError> {
        let result = self.try_publish(descriptor, payload, deadline).await;

        let label = match &result {
            Ok(()) => "success",
            Err(e) => e.result_label(),
        };
        self.metrics
            .publish_total
            .with_label_values(&[descriptor.operation.as_str(), label])
            .inc();

        result
    }

    async fn try_publish<P: WirePayload>(
        &self,
        descriptor: &'static OperationDescriptor,
        payload: &P,
        deadline: Duration,
    ) -> Result<(), PublishError> {
        let queue = topology::declare(self.channel.as_ref(), descriptor).await?;

        let body = codec::encode(payload)?;
        let key = payload.natural_key().map(str::to_owned);
        let message = OutboundMessage::json(body)
            .with_message_id(key.clone())
            .with_correlation_id(key);

        let submit = self.channel.publish(
            descriptor.exchange,
            descriptor.routing_key,
            descriptor.publish_flags(),
            message,
        );

        match tokio::time::timeout(deadline, submit).await {
            Ok(Ok(())) => {
                tracing::debug!(
                    operation = %descriptor.operation,
                    exchange = descriptor.exchange,
                    routing_key = descriptor.routing_key,
                    queue = %queue.name,
                    backlog = queue.message_count,
                    "Message published"
                );
                Ok(())
            }
            Ok(Err(source)) => Err(PublishError::Broker {
                exchange: descriptor.exchange,
                source,
            }),
            Err(_) => Err(PublishError::DeadlineExceeded {
                exchange: descriptor.exchange,
                timeout: deadline,
            }),
        }
    }
}
