//! # Session identity and event publishing.
//!
//! Every coordinator (and every merge) runs as one *session* with a
//! process-unique label such as `mirror#3`. [`Session`] stamps that label on
//! each event it publishes.
//!
//! [`Observers`] owns the bus and the stop token of the hub's subscriber
//! listener. Hubs and sessions share it through an `Arc`; the listener stops
//! once the last of them is gone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::SequenceError;
use crate::events::{Bus, Event, EventKind};

/// Global counter for session labels.
static SESSION_SEQ: AtomicU64 = AtomicU64::new(1);

/// Event bus plus the token that stops the subscriber listener on drop.
pub(crate) struct Observers {
    pub(crate) bus: Bus,
    stop: CancellationToken,
}

impl Observers {
    pub(crate) fn new(bus: Bus, stop: CancellationToken) -> Self {
        Self { bus, stop }
    }
}

impl Drop for Observers {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Label and event sink of one sharing session.
#[derive(Clone)]
pub(crate) struct Session {
    label: Arc<str>,
    observers: Arc<Observers>,
}

impl Session {
    pub(crate) fn new(kind: &'static str, observers: Arc<Observers>) -> Self {
        let n = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            label: format!("{kind}#{n}").into(),
            observers,
        }
    }

    #[cfg(test)]
    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    fn publish(&self, kind: EventKind, build: impl FnOnce(Event) -> Event) {
        let bus = &self.observers.bus;
        if !bus.has_listeners() {
            return;
        }
        bus.publish(build(Event::new(kind).with_session(Arc::clone(&self.label))));
    }

    pub(crate) fn started(&self, handles: usize) {
        self.publish(EventKind::SessionStarted, |ev| ev.with_handle(handles));
    }

    pub(crate) fn ended(&self) {
        self.publish(EventKind::SessionEnded, |ev| ev);
    }

    pub(crate) fn handle_opened(&self, id: usize) {
        self.publish(EventKind::HandleOpened, |ev| ev.with_handle(id));
    }

    pub(crate) fn group_opened(&self, id: usize) {
        self.publish(EventKind::GroupOpened, |ev| ev.with_handle(id));
    }

    pub(crate) fn handle_released(&self, id: usize) {
        self.publish(EventKind::HandleReleased, |ev| ev.with_handle(id));
    }

    pub(crate) fn backlog_exceeded(&self, id: usize, queued: usize) {
        self.publish(EventKind::BacklogExceeded, |ev| {
            ev.with_handle(id).with_backlog(queued)
        });
    }

    pub(crate) fn exhausted(&self, pulled: usize) {
        self.publish(EventKind::SourceExhausted, |ev| ev.with_backlog(pulled));
    }

    pub(crate) fn latched(&self, handle: Option<usize>, err: &SequenceError) {
        self.publish(EventKind::ErrorLatched, |ev| {
            let ev = ev.with_reason(err.to_string());
            match handle {
                Some(id) => ev.with_handle(id),
                None => ev,
            }
        });
    }

    pub(crate) fn source_released(&self, res: &Result<(), SequenceError>) {
        self.publish(EventKind::SourceReleased, |ev| match res {
            Ok(()) => ev,
            Err(e) => ev.with_reason(e.to_string()),
        });
    }

    pub(crate) fn merge_cancelled(&self, source: usize, err: &SequenceError) {
        self.publish(EventKind::MergeCancelled, |ev| {
            ev.with_handle(source).with_reason(err.to_string())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_carry_the_session_label() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let session = Session::new(
            "mirror",
            Arc::new(Observers::new(bus, CancellationToken::new())),
        );
        assert!(session.label().starts_with("mirror#"));

        session.latched(Some(2), &SequenceError::source("eof"));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ErrorLatched);
        assert_eq!(ev.session.as_deref(), Some(session.label()));
        assert_eq!(ev.handle, Some(2));
        assert_eq!(ev.reason.as_deref(), Some("source failed: eof"));
    }

    #[test]
    fn labels_are_unique() {
        let observers = Arc::new(Observers::new(Bus::new(1), CancellationToken::new()));
        let a = Session::new("group", observers.clone());
        let b = Session::new("group", observers);
        assert_ne!(a.label(), b.label());
    }

    #[test]
    fn dropping_observers_stops_the_listener() {
        let stop = CancellationToken::new();
        drop(Observers::new(Bus::new(1), stop.clone()));
        assert!(stop.is_cancelled());
    }
}
