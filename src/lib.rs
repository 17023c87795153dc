//! # Replay Bus
//!
//! An in-process publish/subscribe bus built on append-only channels.
//!
//! ## Core Concepts
//!
//! - **Channels**: Append-only message logs with a set of registered subscribers
//! - **Offsets**: Gap-free positions assigned at append, starting at 0
//! - **Live delivery**: Every append is pushed to subscribers that are not replaying
//! - **Replay**: A subscriber can stream any suffix of the log on demand
//! - **Catch-up**: New subscribers receive the full log when they register
//!
//! ## Example
//!
//! ```
//! use replay_bus::{Channel, DeliveryKind};
//!
//! let channel = Channel::named("orders");
//! let publisher = channel.publisher();
//!
//! let (subscriber, inbox) = channel.subscribe_inbox()?;
//! publisher.publish("M1")?;
//! publisher.publish("M2")?;
//!
//! // Replay the log; appends made meanwhile are skipped for this subscriber.
//! subscriber.start_replay(0)?;
//! publisher.publish("M3")?;
//! subscriber.stop_replay();
//! publisher.publish("M4")?;
//!
//! let seen: Vec<_> = inbox
//!     .drain()
//!     .iter()
//!     .map(|d| (d.text().to_string(), d.kind))
//!     .collect();
//! assert_eq!(seen.len(), 5);
//! assert_eq!(seen[4], ("M4".to_string(), DeliveryKind::Live));
//! # Ok::<(), replay_bus::BusError>(())
//! ```

pub mod channel;
pub mod error;
pub mod log;
pub mod publisher;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use channel::{Channel, ChannelConfig, DuplicatePolicy};
pub use error::{BusError, Result};
pub use log::{check_next_offset, MemoryLog, MessageIter, MessageLog};
pub use publisher::Publisher;
pub use subscriptions::{inbox, Delivery, Inbox, InboxSink, Receive, Subscriber, SubscriberMode};
pub use types::*;
