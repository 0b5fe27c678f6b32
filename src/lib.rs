//! # seqfan
//!
//! **seqfan** shares one lazy, single-owner sequence between many concurrent
//! consumers, and merges many sequences into one.
//!
//! A [`Sequence`] is pulled one item at a time and must be released when its
//! consumer is done. seqfan keeps that contract on both sides of a fan-out:
//! the source is only ever advanced by one coordinator task, is pulled only
//! when some consumer asks for an item, and is released exactly once.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                      ┌──────────────────────┐
//!                      │   source: Sequence   │
//!                      └──────────┬───────────┘
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Coordinator task (one per session)                               │
//! │  - SharedSource (first error latched, released once)              │
//! │  - per-handle Buffers (backlog of pulled, unread items)           │
//! │  - mailbox of Next / Close requests                               │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────┐       ┌──────────┐       ┌──────────┐       │
//!     │ Handle 0 │       │ Handle 1 │       │ Handle N │       │ publishes
//!     │(Sequence)│       │(Sequence)│       │(Sequence)│       │ Events
//!     └──────────┘       └──────────┘       └──────────┘       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast channel)                       │
//! │                  (capacity: HubConfig::bus_capacity)              │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                            SubscriberSet
//!                        ┌──────────┼──────────┐
//!                        ▼          ▼          ▼
//!                     worker1    worker2    workerN
//! ```
//!
//! ### Handle request cycle
//! ```text
//! Handle::advance()
//!   ├─► own buffer non-empty ──► pop, done
//!   └─► Next ──► coordinator
//!                 ├─ buffer non-empty (filled meanwhile) ──► answer
//!                 ├─ session over ──► End / Failed(latched error)
//!                 └─ pull source ──► route item
//!                       mirror:     clone to every live buffer, answer
//!                       distribute: next open partition (round-robin)
//!                       group:      buffer of the item's key (new key → new group)
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / functions                          |
//! |-------------------|----------------------------------------------------------|------------------------------------------------|
//! | **Sequences**     | The pull contract and leaf producers.                    | [`Sequence`], [`from_iter`], [`from_receiver`] |
//! | **Fan-out**       | One source, many consumers.                              | [`mirror`], [`distribute`], [`group_by`]       |
//! | **Fan-in**        | Many sources, one consumer.                              | [`merge`], [`Merged`]                          |
//! | **Set filters**   | Keys seen once or more than once.                        | [`uniques`], [`duplicates`]                    |
//! | **Subscriber API**| Hook into session events (logging, metrics).             | [`Subscribe`], [`Event`]                       |
//! | **Configuration** | Mailbox sizes, merge capacity, release grace.            | [`HubConfig`], [`Hub`]                         |
//! | **Errors**        | One cloneable error latched per session.                 | [`SequenceError`]                              |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use seqfan::{collect, from_iter, mirror};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), seqfan::SequenceError> {
//!     let handles = mirror(from_iter(1..=3), 2);
//!     for h in handles {
//!         assert_eq!(collect(h).await?, vec![1, 2, 3]);
//!     }
//!     Ok(())
//! }
//! ```
mod buffer;
mod core;
mod error;
mod events;
mod fanin;
mod fanout;
mod sequence;
mod subscribers;

// ---- Public re-exports ----

pub use buffer::{Buffer, Handle};
pub use core::{
    distribute, duplicates, group, group_by, merge, mirror, try_duplicates, try_group_by,
    try_uniques, uniques, Hub, HubBuilder, HubConfig,
};
pub use error::{SequenceError, ValErr};
pub use events::{Event, EventKind};
pub use fanin::Merged;
pub use fanout::{Distinct, Distributor, Group, Groups, Mirror, Partition};
pub use sequence::{
    collect, drain, flatten, from_iter, from_receiver, from_results, BoxSequence, ChannelSeq,
    Flatten, IterSeq, Sequence,
};
pub use subscribers::Subscribe;

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
