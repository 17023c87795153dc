//! In-memory message log.

use super::{check_next_offset, MessageIter, MessageLog};
use crate::error::Result;
use crate::types::{Message, Offset};
use std::sync::Arc;

/// Append-only message log held in memory.
///
/// Never truncated; the log lives as long as its channel.
#[derive(Debug, Default)]
pub struct MemoryLog {
    messages: Vec<Arc<Message>>,
    payload_bytes: u64,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log with room for `capacity` messages before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: Vec::with_capacity(capacity),
            payload_bytes: 0,
        }
    }
}

impl MessageLog for MemoryLog {
    fn append(&mut self, message: Arc<Message>) -> Result<()> {
        check_next_offset(self.len(), &message)?;

        self.payload_bytes += message.len() as u64;
        self.messages.push(message);

        Ok(())
    }

    fn len(&self) -> u64 {
        self.messages.len() as u64
    }

    fn get(&self, offset: Offset) -> Result<Option<Arc<Message>>> {
        Ok(self.messages.get(offset.as_index()).cloned())
    }

    fn iter_from(&self, from: Offset) -> MessageIter<'_> {
        let tail = self.messages.get(from.as_index()..).unwrap_or(&[]);
        Box::new(tail.iter().cloned().map(Ok))
    }

    fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusError;

    fn push(log: &mut MemoryLog, content: impl Into<Vec<u8>>) -> Arc<Message> {
        let message = Arc::new(Message::new(Offset(log.len()), content.into()));
        log.append(Arc::clone(&message)).unwrap();
        message
    }

    #[test]
    fn test_append_assigns_sequential_offsets() {
        let mut log = MemoryLog::new();

        for i in 0..10u64 {
            let message = push(&mut log, format!("message {}", i));
            assert_eq!(message.offset, Offset(i));
        }

        assert_eq!(log.len(), 10);
        assert!(!log.is_empty());
    }

    #[test]
    fn test_get() {
        let mut log = MemoryLog::new();
        push(&mut log, "a");
        push(&mut log, "b");

        let second = log.get(Offset(1)).unwrap().unwrap();
        assert_eq!(second.content(), b"b");
        assert!(log.get(Offset(2)).unwrap().is_none());
    }

    #[test]
    fn test_iter_from_middle_and_past_end() {
        let mut log = MemoryLog::with_capacity(4);
        for content in ["a", "b", "c", "d"] {
            push(&mut log, content);
        }

        let tail: Vec<_> = log
            .iter_from(Offset(2))
            .map(|m| m.unwrap().offset)
            .collect();
        assert_eq!(tail, vec![Offset(2), Offset(3)]);

        assert_eq!(log.iter_from(Offset(4)).count(), 0);
        assert_eq!(log.iter_from(Offset(1000)).count(), 0);
    }

    #[test]
    fn test_shares_stored_message() {
        let mut log = MemoryLog::new();
        let appended = push(&mut log, "shared");
        let fetched = log.get(Offset(0)).unwrap().unwrap();

        assert!(Arc::ptr_eq(&appended, &fetched));
    }

    #[test]
    fn test_payload_bytes() {
        let mut log = MemoryLog::new();
        assert_eq!(log.payload_bytes(), 0);

        push(&mut log, "1234");
        push(&mut log, "");
        push(&mut log, "56");

        assert_eq!(log.payload_bytes(), 6);
    }

    #[test]
    fn test_refuses_out_of_place_offset() {
        let mut log = MemoryLog::new();
        push(&mut log, "first");

        for offset in [0, 2, 100] {
            let stray = Arc::new(Message::new(Offset(offset), b"stray".to_vec()));
            let result = log.append(stray);
            assert!(matches!(
                result,
                Err(BusError::OffsetMismatch { expected: Offset(1), got }) if got == Offset(offset)
            ));
        }

        assert_eq!(log.len(), 1);
        assert_eq!(log.payload_bytes(), 5);
        assert_eq!(log.iter_from(Offset(0)).count(), 1);
    }
}
