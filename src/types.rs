//! Core types for the bus.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Position of a message in a channel's log.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Offset(pub u64);

impl fmt::Debug for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Offset({})", self.0)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Offset {
    pub fn next(self) -> Self {
        Offset(self.0 + 1)
    }

    /// Clamp a signed starting point into the log's offset space.
    ///
    /// Negative values map to the start of the log.
    pub fn from_signed(from: i64) -> Self {
        Offset(u64::try_from(from).unwrap_or(0))
    }

    /// Index into an in-memory sequence, saturating on narrow targets.
    pub fn as_index(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

/// Unique identifier for a subscriber within a process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(pub u64);

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriberId({})", self.0)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time. A clock set before the epoch reads as zero.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Self::saturating_micros(d.as_micros()))
            .unwrap_or(0);
        Timestamp(micros)
    }

    fn saturating_micros(micros: u128) -> i64 {
        i64::try_from(micros).unwrap_or(i64::MAX)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// A single message in a channel.
///
/// Messages are immutable once created at their offset. Channels
/// hand them out as `Arc<Message>` so every subscriber sees the same record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Position in the channel (the log's length at append).
    pub offset: Offset,

    /// When the message was appended.
    pub timestamp: Timestamp,

    /// Opaque payload.
    pub content: Vec<u8>,
}

impl Message {
    pub fn new(offset: Offset, content: Vec<u8>) -> Self {
        Self {
            offset,
            timestamp: Timestamp::now(),
            content,
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// The payload as UTF-8, if it is valid UTF-8.
    pub fn content_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// How a message reached a subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryKind {
    /// Part of the burst sent when the subscriber registered.
    CatchUp,
    /// Fanned out as it was appended.
    Live,
    /// Streamed by an explicit replay request.
    Replay,
}

/// Point-in-time statistics for a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelStats {
    pub name: String,
    pub message_count: u64,
    pub subscriber_count: usize,
    pub replaying_count: usize,
    pub payload_bytes: u64,
}
