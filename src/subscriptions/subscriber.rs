//! Subscriber handle and its live/replay state machine.

use super::receiver::Receive;
use crate::channel::{Channel, ChannelShared};
use crate::error::{BusError, Result};
use crate::types::{DeliveryKind, Message, Offset, SubscriberId};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Counter for generating subscriber IDs.
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Which deliveries a subscriber currently accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriberMode {
    /// Receives every append as it happens.
    Live,
    /// Receives only its requested replay; live appends are skipped.
    Replaying,
}

/// State shared between a subscriber handle and the channel's registry.
pub(crate) struct SubscriberShared {
    pub(crate) id: SubscriberId,
    replaying: AtomicBool,
    /// Offset after the last message of this subscriber's own replay.
    /// Written only by `start_replay`.
    cursor: AtomicU64,
    receiver: Box<dyn Receive>,
}

impl SubscriberShared {
    pub(crate) fn is_replaying(&self) -> bool {
        self.replaying.load(Ordering::Acquire)
    }

    pub(crate) fn deliver(&self, message: &Arc<Message>, kind: DeliveryKind) {
        self.receiver.receive(message, kind);
    }
}

/// A client of exactly one channel.
///
/// Created live and registered, which delivers the channel's full history as
/// a catch-up burst. [`start_replay`](Self::start_replay) switches to replay
/// mode and streams a slice of the log; [`stop_replay`](Self::stop_replay)
/// switches back. Messages appended in between are never delivered to this
/// subscriber unless a later replay covers them.
///
/// Dropping the handle does not unregister the subscriber; the channel keeps
/// delivering to its receiver until the channel itself is dropped.
pub struct Subscriber {
    shared: Arc<SubscriberShared>,
    channel: Weak<ChannelShared>,
}

impl Subscriber {
    /// Create a subscriber on `channel` and register it.
    pub fn new(channel: &Channel, receiver: impl Receive + 'static) -> Result<Self> {
        channel.subscribe(receiver)
    }

    /// Create a subscriber bound to `channel` without registering it.
    ///
    /// It gets no catch-up and no live deliveries until passed to
    /// [`Channel::register`], but can still replay.
    pub fn unregistered(channel: &Channel, receiver: impl Receive + 'static) -> Self {
        let id = SubscriberId(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            shared: Arc::new(SubscriberShared {
                id,
                replaying: AtomicBool::new(false),
                cursor: AtomicU64::new(0),
                receiver: Box::new(receiver),
            }),
            channel: channel.downgrade(),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.shared.id
    }

    pub fn mode(&self) -> SubscriberMode {
        if self.shared.is_replaying() {
            SubscriberMode::Replaying
        } else {
            SubscriberMode::Live
        }
    }

    pub fn is_replaying(&self) -> bool {
        self.shared.is_replaying()
    }

    /// Offset just past this subscriber's own replay; `None` while live.
    pub fn cursor(&self) -> Option<Offset> {
        if self.shared.is_replaying() {
            Some(Offset(self.shared.cursor.load(Ordering::Acquire)))
        } else {
            None
        }
    }

    /// The channel this subscriber is bound to.
    pub fn channel(&self) -> Result<Channel> {
        self.channel
            .upgrade()
            .map(Channel::from_shared)
            .ok_or(BusError::ChannelClosed)
    }

    /// Enter replay mode and stream the log from `from` to this subscriber.
    ///
    /// Negative offsets start at 0; offsets past the end deliver nothing.
    /// Live appends are skipped from the moment this is called. Calling it
    /// again while replaying restarts the replay from the new offset.
    ///
    /// Returns the number of messages replayed. On a storage error the
    /// subscriber stays in replay mode.
    pub fn start_replay(&self, from: i64) -> Result<usize> {
        let channel = self.channel()?;
        let start = Offset::from_signed(from);

        self.shared.cursor.store(start.0, Ordering::Release);
        self.shared.replaying.store(true, Ordering::Release);
        debug!(channel = %channel.name(), subscriber = %self.id(), from = %start, "replay started");

        // The replayed slice is contiguous from `start`.
        let delivered = channel.replay(from, self)?;
        self.shared
            .cursor
            .store(start.0 + delivered as u64, Ordering::Release);
        Ok(delivered)
    }

    /// Return to live mode.
    ///
    /// Returns where the replay stopped, so the caller knows which offsets
    /// it skipped. `None` if the subscriber was already live.
    pub fn stop_replay(&self) -> Option<Offset> {
        if !self.shared.replaying.swap(false, Ordering::AcqRel) {
            return None;
        }

        let cursor = Offset(self.shared.cursor.load(Ordering::Acquire));
        debug!(subscriber = %self.id(), cursor = %cursor, "replay stopped");
        Some(cursor)
    }

    pub(crate) fn shared(&self) -> &Arc<SubscriberShared> {
        &self.shared
    }

    pub(crate) fn is_bound_to(&self, channel: &Channel) -> bool {
        std::ptr::eq(self.channel.as_ptr(), channel.as_ptr())
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.shared.id)
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}
