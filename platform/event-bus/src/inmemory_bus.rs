//! In-memory implementation of the BrokerChannel trait for testing and development

use crate::{
    BrokerChannel, BusError, BusResult, ExchangeKind, OutboundMessage, PublishFlags, QueueInfo,
    RoutedMessage,
};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExchangeDecl {
    kind: ExchangeKind,
    durable: bool,
}

#[derive(Debug, Default)]
struct QueueState {
    durable: bool,
    messages: VecDeque<RoutedMessage>,
}

#[derive(Debug, Default)]
struct BrokerState {
    exchanges: HashMap<String, ExchangeDecl>,
    queues: HashMap<String, QueueState>,
    // (exchange, binding key, queue)
    bindings: BTreeSet<(String, String, String)>,
}

/// BrokerChannel implementation holding all broker state in memory
///
/// This implementation is suitable for:
/// - Unit tests (no external dependencies)
/// - Local development without Docker
/// - Deadline and concurrency tests, via injected latency, stalls and closure
///
/// Declarations behave like an AMQP broker: identical re-declarations are
/// no-ops, conflicting ones fail with `BusError::TopologyConflict`. Published
/// messages are routed into every bound queue whose binding key equals the
/// routing key and also broadcast to any `tap()` streams.
///
/// Each queue keeps at most `max_queue_depth` messages (default 10 000) and
/// drops the oldest beyond that, so a long-running dev process stays bounded.
///
/// # Example
/// ```rust
/// use event_bus::{BrokerChannel, ExchangeKind, InMemoryBus, OutboundMessage, PublishFlags};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = InMemoryBus::new();
/// bus.declare_exchange("seats", ExchangeKind::Direct, false).await?;
/// bus.declare_queue("seats_queue", true).await?;
/// bus.bind_queue("seats_queue", "seats", "seats_key").await?;
///
/// bus.publish("seats", "seats_key", PublishFlags::default(), OutboundMessage::json(b"[1]".to_vec())).await?;
///
/// assert_eq!(bus.queued_messages("seats_queue").len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryBus {
    state: Arc<Mutex<BrokerState>>,
    // Observers of every routed message
    sender: Arc<broadcast::Sender<RoutedMessage>>,
    publish_latency: Option<Duration>,
    max_queue_depth: usize,
    stalled: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    // Broker-style channel loss on conflict, recovered by the next call
    close_channel_on_conflict: bool,
    channel_lost: Arc<AtomicBool>,
    channel_reopens: Arc<AtomicUsize>,
}

impl InMemoryBus {
    /// Create a new in-memory broker
    ///
    /// Tap streams are backed by a broadcast channel with a buffer of 1000
    /// messages; slow tap readers skip the oldest ones.
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    /// Create a new in-memory broker with a custom tap buffer size
    pub fn with_capacity(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self {
            state: Arc::new(Mutex::new(BrokerState::default())),
            sender: Arc::new(sender),
            publish_latency: None,
            max_queue_depth: 10_000,
            stalled: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
            close_channel_on_conflict: false,
            channel_lost: Arc::new(AtomicBool::new(false)),
            channel_reopens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Keep at most `depth` messages per queue, dropping the oldest
    pub fn with_max_queue_depth(mut self, depth: usize) -> Self {
        self.max_queue_depth = depth.max(1);
        self
    }

    /// Lose the channel on every topology conflict, as an AMQP broker does
    ///
    /// The next call reopens it and counts the reopen.
    pub fn with_channel_close_on_conflict(mut self) -> Self {
        self.close_channel_on_conflict = true;
        self
    }

    /// How many times a lost channel has been reopened
    pub fn channel_reopens(&self) -> usize {
        self.channel_reopens.load(Ordering::SeqCst)
    }

    /// Delay every publish by `latency` before the broker accepts it
    pub fn with_publish_latency(mut self, latency: Duration) -> Self {
        self.publish_latency = Some(latency);
        self
    }

    /// Make every subsequent publish hang forever without being accepted
    pub fn stall_publishes(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    /// Close the channel; every subsequent call fails with `ChannelClosed`
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Stream of every message routed from now on
    pub fn tap(&self) -> BoxStream<'static, RoutedMessage> {
        let mut receiver = self.sender.subscribe();

        let stream = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(msg) => yield msg,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "InMemoryBus: tap lagged, skipped messages");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };

        stream.boxed()
    }

    /// Messages currently sitting in a queue, oldest first
    pub fn queued_messages(&self, queue: &str) -> Vec<RoutedMessage> {
        self.lock()
            .queues
            .get(queue)
            .map(|q| q.messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_exchange(&self, name: &str) -> bool {
        self.lock().exchanges.contains_key(name)
    }

    pub fn has_queue(&self, name: &str) -> bool {
        self.lock().queues.contains_key(name)
    }

    pub fn has_binding(&self, exchange: &str, routing_key: &str, queue: &str) -> bool {
        self.lock().bindings.contains(&(
            exchange.to_string(),
            routing_key.to_string(),
            queue.to_string(),
        ))
    }

    /// Total number of distinct bindings
    pub fn binding_count(&self) -> usize {
        self.lock().bindings.len()
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        // A panicking test thread must not wedge the broker for the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_open(&self) -> BusResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::ChannelClosed("in-memory channel closed".to_string()));
        }
        if self.channel_lost.swap(false, Ordering::SeqCst) {
            let reopens = self.channel_reopens.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::warn!(reopens, "InMemoryBus: channel lost on conflict, reopening");
        }
        Ok(())
    }

    fn conflict(&self, entity: String, reason: String) -> BusError {
        if self.close_channel_on_conflict {
            self.channel_lost.store(true, Ordering::SeqCst);
        }
        BusError::TopologyConflict { entity, reason }
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerChannel for InMemoryBus {
    async fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> BusResult<()> {
        self.ensure_open()?;
        let requested = ExchangeDecl { kind, durable };
        let mut state = self.lock();

        match state.exchanges.get(name) {
            Some(existing) if *existing != requested => Err(self.conflict(
                format!("exchange '{name}'"),
                format!(
                    "declared as {} (durable={}), requested {} (durable={})",
                    existing.kind, existing.durable, kind, durable
                ),
            )),
            Some(_) => Ok(()),
            None => {
                state.exchanges.insert(name.to_string(), requested);
                Ok(())
            }
        }
    }

    async fn declare_queue(&self, name: &str, durable: bool) -> BusResult<QueueInfo> {
        self.ensure_open()?;
        let mut state = self.lock();

        let queue = state.queues.entry(name.to_string()).or_insert_with(|| QueueState {
            durable,
            messages: VecDeque::new(),
        });

        if queue.durable != durable {
            let reason = format!("declared durable={}, requested durable={durable}", queue.durable);
            return Err(self.conflict(format!("queue '{name}'"), reason));
        }

        Ok(QueueInfo {
            name: name.to_string(),
            message_count: u32::try_from(queue.messages.len()).unwrap_or(u32::MAX),
            consumer_count: 0,
        })
    }

    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> BusResult<()> {
        self.ensure_open()?;
        let mut state = self.lock();

        if !state.exchanges.contains_key(exchange) {
            return Err(BusError::NotFound {
                entity: format!("exchange '{exchange}'"),
            });
        }
        if !state.queues.contains_key(queue) {
            return Err(BusError::NotFound {
                entity: format!("queue '{queue}'"),
            });
        }

        state.bindings.insert((
            exchange.to_string(),
            routing_key.to_string(),
            queue.to_string(),
        ));
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        flags: PublishFlags,
        message: OutboundMessage,
    ) -> BusResult<()> {
        self.ensure_open()?;

        if let Some(latency) = self.publish_latency {
            tokio::time::sleep(latency).await;
        }
        if self.stalled.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        // The channel may have been closed while the publish was in flight
        self.ensure_open()?;

        let routed = {
            let mut state = self.lock();

            if !state.exchanges.contains_key(exchange) {
                return Err(BusError::NotFound {
                    entity: format!("exchange '{exchange}'"),
                });
            }

            let targets: Vec<String> = state
                .bindings
                .iter()
                .filter(|(ex, key, _)| ex == exchange && key == routing_key)
                .map(|(_, _, queue)| queue.clone())
                .collect();

            if targets.is_empty() && flags.mandatory {
                return Err(BusError::Unroutable {
                    exchange: exchange.to_string(),
                    routing_key: routing_key.to_string(),
                });
            }

            let mut routed = Vec::with_capacity(targets.len());
            for queue in targets {
                let delivered = RoutedMessage {
                    exchange: exchange.to_string(),
                    routing_key: routing_key.to_string(),
                    queue: queue.clone(),
                    message: message.clone(),
                };
                if let Some(q) = state.queues.get_mut(&queue) {
                    q.messages.push_back(delivered.clone());
                    while q.messages.len() > self.max_queue_depth {
                        q.messages.pop_front();
                    }
                }
                routed.push(delivered);
            }
            routed
        };

        // We ignore the error if there are no tap receivers (that's fine)
        for delivered in routed {
            let _ = self.sender.send(delivered);
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}
