//! # Subscriber trait
//!
//! [`Subscribe`] is how callers observe sharing sessions: every coordinator and
//! merge drain publishes [`Event`]s, and each subscriber gets its own bounded
//! queue and worker inside the `SubscriberSet`.
//!
//! ## Contract
//! - A slow subscriber never slows down a coordinator; when its queue is full
//!   the event is dropped for that subscriber only.
//! - A panicking subscriber is isolated and reported as
//!   [`EventKind::SubscriberPanicked`](crate::EventKind::SubscriberPanicked).
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use seqfan::{Event, Subscribe};
//!
//! #[derive(Default)]
//! struct ErrorCounter(AtomicUsize);
//!
//! #[async_trait::async_trait]
//! impl Subscribe for ErrorCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.is_error() {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "error-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of session events.
///
/// Runs on a worker task owned by the subscriber set; avoid blocking calls.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue (minimum 1).
    fn queue_capacity(&self) -> usize {
        256
    }
}
