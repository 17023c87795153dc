//! Delivery sinks.

use crate::types::{DeliveryKind, Message};
use crossbeam_channel::{unbounded, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

/// Sink for messages delivered to a subscriber.
///
/// Called synchronously from the thread that appended, replayed or
/// registered, while the channel lock is held. Implementations must return
/// quickly and must not call back into the same channel.
pub trait Receive: Send + Sync {
    fn receive(&self, message: &Arc<Message>, kind: DeliveryKind);
}

impl<F> Receive for F
where
    F: Fn(&Arc<Message>, DeliveryKind) + Send + Sync,
{
    fn receive(&self, message: &Arc<Message>, kind: DeliveryKind) {
        self(message, kind)
    }
}

/// A message together with how it was delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub message: Arc<Message>,
    pub kind: DeliveryKind,
}

impl Delivery {
    /// Payload as UTF-8, or empty if it isn't.
    pub fn text(&self) -> &str {
        self.message.content_str().unwrap_or_default()
    }
}

/// Create a connected sink/inbox pair.
pub fn inbox() -> (InboxSink, Inbox) {
    let (sender, receiver) = unbounded();
    (InboxSink { sender }, Inbox { receiver })
}

/// [`Receive`] implementation that forwards into an [`Inbox`].
///
/// Unbounded, so delivery never blocks the channel.
#[derive(Clone, Debug)]
pub struct InboxSink {
    sender: Sender<Delivery>,
}

impl Receive for InboxSink {
    fn receive(&self, message: &Arc<Message>, kind: DeliveryKind) {
        let delivery = Delivery {
            message: Arc::clone(message),
            kind,
        };
        if self.sender.send(delivery).is_err() {
            tracing::trace!(offset = %message.offset, "inbox dropped, discarding delivery");
        }
    }
}

/// Receiving end of an inbox.
#[derive(Clone, Debug)]
pub struct Inbox {
    receiver: Receiver<Delivery>,
}

impl Inbox {
    /// Receive the next delivery (blocking).
    pub fn recv(&self) -> Result<Delivery, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a delivery (non-blocking).
    pub fn try_recv(&self) -> Result<Delivery, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Delivery, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Take everything currently queued.
    pub fn drain(&self) -> Vec<Delivery> {
        self.receiver.try_iter().collect()
    }

    /// Number of queued deliveries.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
