//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the `SubscriberSet` that
//! fans events out to subscribers, and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! coordinator ── publish(Event) ──► Bus ──► hub listener ──► SubscriberSet::emit
//!                                                               │
//!                                                    ┌──────────┼──────────┐
//!                                                    ▼          ▼          ▼
//!                                                LogWriter   Metrics    Custom
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub(crate) use subscriber_set::SubscriberSet;
