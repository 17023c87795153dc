//! Channel: the append-only log plus its registered subscribers.

use crate::error::{BusError, Result};
use crate::log::{MemoryLog, MessageLog};
use crate::publisher::Publisher;
use crate::subscriptions::{inbox, Inbox, Receive, Subscriber, SubscriberShared};
use crate::types::{ChannelStats, DeliveryKind, Message, Offset};
use parking_lot::{RwLock, RwLockWriteGuard};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// What to do when a subscriber is registered twice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail with [`BusError::DuplicateSubscriber`].
    #[default]
    Reject,
    /// Treat the second registration as a no-op.
    Ignore,
}

/// Channel configuration.
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Name used in logs and stats.
    pub name: String,

    /// Handling of repeated registration of the same subscriber.
    pub duplicate_policy: DuplicatePolicy,

    /// Messages to pre-allocate room for in the in-memory log.
    pub initial_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            duplicate_policy: DuplicatePolicy::Reject,
            initial_capacity: 0,
        }
    }
}

/// Everything guarded by the channel lock.
struct ChannelState {
    log: Box<dyn MessageLog>,
    /// Registration order is delivery order.
    subscribers: Vec<Arc<SubscriberShared>>,
}

pub(crate) struct ChannelShared {
    config: ChannelConfig,
    state: RwLock<ChannelState>,
}

/// A named, append-only message log with live fan-out and replay.
///
/// Appends, registrations and replays share one lock:
/// - `append` and `register` mutate under the write lock, then downgrade to
///   a read lock for delivery, so offset order is fan-out order and a new
///   subscriber's catch-up burst finishes before the next append
/// - `replay` runs under the read lock and may overlap other replays
///
/// Delivery is synchronous on the calling thread. Receivers must not call
/// back into the same channel.
///
/// `Channel` is a cheap handle; clones share the same log.
#[derive(Clone)]
pub struct Channel {
    shared: Arc<ChannelShared>,
}

impl Channel {
    /// Create a channel backed by an in-memory log.
    pub fn new(config: ChannelConfig) -> Self {
        let log = MemoryLog::with_capacity(config.initial_capacity);
        Self::with_log(config, log)
    }

    /// Create an in-memory channel with default settings.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(ChannelConfig {
            name: name.into(),
            ..Default::default()
        })
    }

    /// Create a channel on top of an existing log backend.
    ///
    /// Messages already in the log count as history: new subscribers get
    /// them in their catch-up burst.
    pub fn with_log(config: ChannelConfig, log: impl MessageLog + 'static) -> Self {
        debug!(channel = %config.name, messages = log.len(), "channel created");
        Self {
            shared: Arc::new(ChannelShared {
                config,
                state: RwLock::new(ChannelState {
                    log: Box::new(log),
                    subscribers: Vec::new(),
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.shared.config
    }

    /// A publisher bound to this channel.
    pub fn publisher(&self) -> Publisher {
        Publisher::new(self)
    }

    // --- Subscriptions ---

    /// Create and register a subscriber delivering into `receiver`.
    pub fn subscribe(&self, receiver: impl Receive + 'static) -> Result<Subscriber> {
        let subscriber = Subscriber::unregistered(self, receiver);
        self.register(&subscriber)?;
        Ok(subscriber)
    }

    /// Subscribe with an [`Inbox`] to read deliveries from.
    pub fn subscribe_inbox(&self) -> Result<(Subscriber, Inbox)> {
        let (sink, inbox) = inbox();
        let subscriber = self.subscribe(sink)?;
        Ok((subscriber, inbox))
    }

    /// Register a subscriber and send it the full log as a catch-up burst.
    ///
    /// The burst is delivered regardless of the subscriber's mode. A
    /// subscriber that is already registered is handled per
    /// [`ChannelConfig::duplicate_policy`]. If the log cannot be read the
    /// subscriber is not registered.
    pub fn register(&self, subscriber: &Subscriber) -> Result<()> {
        if !subscriber.is_bound_to(self) {
            let channel = subscriber
                .channel()
                .map(|c| c.name().to_string())
                .unwrap_or_else(|_| "<closed>".to_string());
            return Err(BusError::ForeignSubscriber {
                subscriber: subscriber.id(),
                channel,
            });
        }

        let id = subscriber.id();
        let mut state = self.shared.state.write();

        if state.subscribers.iter().any(|s| s.id == id) {
            return match self.shared.config.duplicate_policy {
                DuplicatePolicy::Reject => {
                    warn!(channel = %self.name(), subscriber = %id, "duplicate registration rejected");
                    Err(BusError::DuplicateSubscriber(id))
                }
                DuplicatePolicy::Ignore => {
                    debug!(channel = %self.name(), subscriber = %id, "duplicate registration ignored");
                    Ok(())
                }
            };
        }

        // Read the whole burst before joining, so a storage error leaves no
        // registration behind.
        let burst = state
            .log
            .iter_from(Offset(0))
            .collect::<Result<Vec<_>>>()?;

        state.subscribers.push(Arc::clone(subscriber.shared()));
        let _state = RwLockWriteGuard::downgrade(state);

        for message in &burst {
            subscriber.shared().deliver(message, DeliveryKind::CatchUp);
        }
        let delivered = burst.len();

        debug!(
            channel = %self.name(),
            subscriber = %id,
            catch_up = delivered,
            "subscriber registered"
        );
        Ok(())
    }

    // --- Log Operations ---

    /// Append a message and deliver it to every live subscriber.
    ///
    /// Subscribers in replay mode are skipped and never see this message
    /// unless a later replay covers it. If the log refuses the message
    /// nothing is stored or delivered.
    pub fn append(&self, content: impl Into<Vec<u8>>) -> Result<Arc<Message>> {
        let mut state = self.shared.state.write();

        let message = Arc::new(Message::new(Offset(state.log.len()), content.into()));
        if let Err(e) = state.log.append(Arc::clone(&message)) {
            if matches!(e, BusError::OffsetMismatch { .. }) {
                warn!(channel = %self.name(), offset = %message.offset, error = %e, "log refused append");
            }
            return Err(e);
        }

        let state = RwLockWriteGuard::downgrade(state);

        let mut delivered = 0usize;
        for subscriber in state.subscribers.iter().filter(|s| !s.is_replaying()) {
            subscriber.deliver(&message, DeliveryKind::Live);
            delivered += 1;
        }

        trace!(channel = %self.name(), offset = %message.offset, delivered, "appended");
        Ok(message)
    }

    /// Deliver `log[from..]` to one subscriber.
    ///
    /// Negative `from` starts at 0; `from` past the end delivers nothing.
    /// The subscriber's mode is left alone and it need not be registered.
    /// Returns the number of messages delivered.
    pub fn replay(&self, from: i64, subscriber: &Subscriber) -> Result<usize> {
        let start = Offset::from_signed(from);
        let state = self.shared.state.read();

        let mut delivered = 0usize;
        for message in state.log.iter_from(start) {
            subscriber.shared().deliver(&message?, DeliveryKind::Replay);
            delivered += 1;
        }

        debug!(
            channel = %self.name(),
            subscriber = %subscriber.id(),
            from = %start,
            delivered,
            "replayed"
        );
        Ok(delivered)
    }

    // --- Queries ---

    /// Number of messages in the log.
    pub fn len(&self) -> u64 {
        self.shared.state.read().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a message by offset.
    pub fn get(&self, offset: Offset) -> Result<Option<Arc<Message>>> {
        self.shared.state.read().log.get(offset)
    }

    /// Snapshot of the log from `from` onwards.
    pub fn messages_from(&self, from: Offset) -> Result<Vec<Arc<Message>>> {
        self.shared.state.read().log.iter_from(from).collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.state.read().subscribers.len()
    }

    /// Get channel statistics.
    pub fn stats(&self) -> ChannelStats {
        let state = self.shared.state.read();
        ChannelStats {
            name: self.name().to_string(),
            message_count: state.log.len(),
            subscriber_count: state.subscribers.len(),
            replaying_count: state.subscribers.iter().filter(|s| s.is_replaying()).count(),
            payload_bytes: state.log.payload_bytes(),
        }
    }

    pub(crate) fn from_shared(shared: Arc<ChannelShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn downgrade(&self) -> Weak<ChannelShared> {
        Arc::downgrade(&self.shared)
    }

    pub(crate) fn as_ptr(&self) -> *const ChannelShared {
        Arc::as_ptr(&self.shared)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
