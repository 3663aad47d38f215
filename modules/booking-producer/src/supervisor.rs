//! Broker connection lifecycle
//!
//! One connection is opened at startup and shared by every request until
//! shutdown. Its confirm-mode channel is reopened by the bus whenever the
//! broker closes it.

use anyhow::Context;
use event_bus::connect_retry::{retry_with_fixed_delay, RetryConfig};
use event_bus::{AmqpBus, BrokerChannel};
use lapin::{Connection, ConnectionProperties};
use std::sync::Arc;

const REPLY_SUCCESS: u16 = 200;

pub struct BrokerConnection {
    bus: AmqpBus,
}

impl BrokerConnection {
    /// Connect with bounded retries and open the shared channel
    pub async fn open(url: &str, retry: &RetryConfig) -> anyhow::Result<Self> {
        tracing::info!(
            attempts = retry.max_attempts,
            delay_ms = retry.delay.as_millis() as u64,
            "Connecting to AMQP broker"
        );

        let connection = retry_with_fixed_delay(
            || Connection::connect(url, ConnectionProperties::default()),
            retry,
            "amqp_connect",
        )
        .await
        .context("failed to connect to AMQP broker")?;

        let bus = AmqpBus::open(connection)
            .await
            .context("failed to open confirm-mode AMQP channel")?;

        tracing::info!("AMQP channel ready");
        Ok(Self { bus })
    }

    pub fn channel(&self) -> Arc<dyn BrokerChannel> {
        Arc::new(self.bus.clone())
    }

    /// Close the channel, then the connection
    pub async fn close(self) {
        match self.bus.close(REPLY_SUCCESS, "shutdown").await {
            Ok(()) => tracing::info!("AMQP connection closed"),
            Err(e) => tracing::warn!(error = %e, "Failed to close AMQP connection cleanly"),
        }
    }
}
