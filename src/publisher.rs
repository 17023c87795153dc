//! Publishing handle.

use crate::channel::{Channel, ChannelShared};
use crate::error::{BusError, Result};
use crate::types::Message;
use std::fmt;
use std::sync::{Arc, Weak};

/// Appends to a channel without keeping it alive.
///
/// Publishers carry no state of their own; any number of them can share a
/// channel and global ordering is whatever order the channel's lock grants.
#[derive(Clone)]
pub struct Publisher {
    channel: Weak<ChannelShared>,
}

impl Publisher {
    pub fn new(channel: &Channel) -> Self {
        Self {
            channel: channel.downgrade(),
        }
    }

    /// Append `content` to the channel.
    pub fn publish(&self, content: impl Into<Vec<u8>>) -> Result<Arc<Message>> {
        let channel = self
            .channel
            .upgrade()
            .map(Channel::from_shared)
            .ok_or(BusError::ChannelClosed)?;
        channel.append(content)
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("open", &(self.channel.strong_count() > 0))
            .finish()
    }
}
