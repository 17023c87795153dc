//! Message log storage.
//!
//! A channel keeps its messages in a [`MessageLog`]. The channel builds each
//! message at offset `len()` and the log refuses anything else, so
//! `log[i].offset == i` holds for every backend. [`MemoryLog`] keeps
//! everything in process memory and is what channels use by default.

mod memory;

pub use memory::MemoryLog;

use crate::error::{BusError, Result};
use crate::types::{Message, Offset};
use std::sync::Arc;

/// Iterator over stored messages, yielding backend errors in place.
pub type MessageIter<'a> = Box<dyn Iterator<Item = Result<Arc<Message>>> + Send + 'a>;

/// Append-only storage behind a channel.
///
/// Callers serialize access: `append` is only invoked under the channel's
/// write lock, reads under its read lock. Backend failures should surface as
/// [`BusError::StorageUnavailable`](crate::BusError::StorageUnavailable); the
/// channel returns them to its caller unchanged.
pub trait MessageLog: Send + Sync {
    /// Store `message`, which must sit at offset `len()`.
    ///
    /// Any other offset must be refused with [`BusError::OffsetMismatch`]
    /// before anything is stored; [`check_next_offset`] does the comparison.
    fn append(&mut self, message: Arc<Message>) -> Result<()>;

    /// Number of stored messages (also the next offset to assign).
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a single message.
    fn get(&self, offset: Offset) -> Result<Option<Arc<Message>>>;

    /// Iterate messages starting at `from` in offset order.
    ///
    /// Starting past the end yields nothing.
    fn iter_from(&self, from: Offset) -> MessageIter<'_>;

    /// Total payload bytes held by the log.
    fn payload_bytes(&self) -> u64;
}

/// Refuse `message` unless it is the next offset of a log holding `len` messages.
pub fn check_next_offset(len: u64, message: &Message) -> Result<()> {
    let expected = Offset(len);
    if message.offset == expected {
        Ok(())
    } else {
        Err(BusError::OffsetMismatch {
            expected,
            got: message.offset,
        })
    }
}
