//! Subscribers and the sinks they deliver into.
//!
//! A [`Subscriber`] is bound to one channel and is either live or replaying:
//! - Live subscribers get every append as it happens
//! - Replaying subscribers get only the slice they asked for
//! - Appends made while replaying are skipped for that subscriber, never queued
//!
//! Deliveries land in a [`Receive`] implementation. Any
//! `Fn(&Arc<Message>, DeliveryKind)` closure works, and [`Inbox`] forwards
//! deliveries into a channel for consumers on other threads.
//!
//! # Example
//!
//! ```
//! use replay_bus::{Channel, DeliveryKind};
//!
//! let channel = Channel::named("events");
//! let (subscriber, inbox) = channel.subscribe_inbox()?;
//!
//! channel.append("M1")?;
//! subscriber.start_replay(0)?;
//! channel.append("M2")?; // skipped: subscriber is replaying
//! subscriber.stop_replay();
//!
//! let kinds: Vec<_> = inbox.drain().into_iter().map(|d| d.kind).collect();
//! assert_eq!(kinds, vec![DeliveryKind::Live, DeliveryKind::Replay]);
//! # Ok::<(), replay_bus::BusError>(())
//! ```

mod receiver;
mod subscriber;

pub use receiver::{inbox, Delivery, Inbox, InboxSink, Receive};
pub use subscriber::{Subscriber, SubscriberMode};

pub(crate) use subscriber::SubscriberShared;
