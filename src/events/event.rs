//! # Lifecycle events emitted by sharing sessions.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Session events**: a coordinator starting, exhausting or failing its source
//! - **Handle events**: consumers being opened and released, backlog warnings
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! The [`Event`] struct carries the session label, handle position, reason and
//! backlog size, depending on the kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use seqfan::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ErrorLatched)
//!     .with_session("group#3")
//!     .with_handle(2)
//!     .with_reason("source failed: eof");
//!
//! assert_eq!(ev.kind, EventKind::ErrorLatched);
//! assert_eq!(ev.session.as_deref(), Some("group#3"));
//! assert_eq!(ev.handle, Some(2));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `session`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `session`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Session events ===
    /// A coordinator (or merge supervisor) started.
    ///
    /// Sets:
    /// - `session`: session label (e.g. `mirror#4`)
    /// - `handle`: number of handles created up front
    SessionStarted,

    /// The shared source reported a clean end.
    ///
    /// Sets:
    /// - `session`: session label
    /// - `backlog`: number of items pulled from the source
    SourceExhausted,

    /// The first error of the session was latched.
    ///
    /// Sets:
    /// - `session`: session label
    /// - `handle`: handle that was waiting when it happened (if any)
    /// - `reason`: error message
    ErrorLatched,

    /// The shared source was released.
    ///
    /// Sets:
    /// - `session`: session label
    /// - `reason`: release error message (only on failure)
    SourceReleased,

    /// The coordinator stopped; every handle is done.
    ///
    /// Sets:
    /// - `session`: session label
    SessionEnded,

    // === Handle events ===
    /// A handle was created after the session started (distribute partitions).
    ///
    /// Sets:
    /// - `session`: session label
    /// - `handle`: handle position
    HandleOpened,

    /// A new key was seen and its group created.
    ///
    /// Sets:
    /// - `session`: session label
    /// - `handle`: group position (first-seen order)
    GroupOpened,

    /// A handle was released (explicitly or by drop) before its end.
    ///
    /// Sets:
    /// - `session`: session label
    /// - `handle`: handle position
    HandleReleased,

    /// A handle's backlog crossed its configured watermark.
    ///
    /// Sets:
    /// - `session`: session label
    /// - `handle`: handle position
    /// - `backlog`: items queued after the push
    BacklogExceeded,

    /// A merge drain failed and cancelled its siblings.
    ///
    /// Sets:
    /// - `session`: session label
    /// - `handle`: index of the failing source
    /// - `reason`: error message
    MergeCancelled,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Session label (or subscriber name for subscriber events).
    pub session: Option<Arc<str>>,
    /// Handle, group or source position within the session.
    pub handle: Option<usize>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Queue length or item count, depending on the kind.
    pub backlog: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            session: None,
            handle: None,
            reason: None,
            backlog: None,
        }
    }

    /// Attaches a session label.
    #[inline]
    pub fn with_session(mut self, session: impl Into<Arc<str>>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Attaches a handle position.
    #[inline]
    pub fn with_handle(mut self, handle: usize) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a queue length or item count.
    #[inline]
    pub fn with_backlog(mut self, backlog: usize) -> Self {
        self.backlog = Some(backlog);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_session(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_session(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// Returns true for events that carry a session failure.
    ///
    /// Lets a custom [`Subscribe`](crate::Subscribe) filter failures without
    /// matching every kind.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ErrorLatched | EventKind::MergeCancelled
        ) || (self.kind == EventKind::SourceReleased && self.reason.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::SessionStarted);
        let b = Event::new(EventKind::SessionEnded);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn failed_release_counts_as_error() {
        let ok = Event::new(EventKind::SourceReleased).with_session("mirror#1");
        let failed = Event::new(EventKind::SourceReleased).with_reason("release failed: x");
        assert!(!ok.is_error());
        assert!(failed.is_error());
        assert!(Event::new(EventKind::ErrorLatched).is_error());
    }
}
