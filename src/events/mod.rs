//! Session events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by sharing sessions and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: mirror/distribute/group coordinators, merge drains and
//!   supervisor, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the hub's subscriber listener (fans out to `SubscriberSet`)
//!   and anything holding [`Hub::subscribe`](crate::Hub::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
