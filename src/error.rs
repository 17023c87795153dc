//! Error types for the bus.

use crate::types::{Offset, SubscriberId};
use thiserror::Error;

/// Main error type for channel operations.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Subscriber already registered: {0}")]
    DuplicateSubscriber(SubscriberId),

    #[error("Subscriber {subscriber} is bound to channel '{channel}'")]
    ForeignSubscriber {
        subscriber: SubscriberId,
        channel: String,
    },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Offset mismatch: expected {expected}, got {got}")]
    OffsetMismatch { expected: Offset, got: Offset },

    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, BusError>;
