//! # Shared source: the one place the underlying sequence is touched.
//!
//! [`SharedSource`] is owned by a coordinator task and never leaves it. It wraps
//! the source with the session-wide terminal state:
//!
//! ```text
//! pull()
//!   ├─ advance() == true   ──► Item(v)                  (pulled += 1)
//!   ├─ advance() == false
//!   │    ├─ last_error()   ──► latch(e) ──► Failed(e)    (source released)
//!   │    └─ clean end      ──► finished, release()
//!   │                            ├─ Ok    ──► End
//!   │                            └─ Err e ──► latch(e) ──► Failed(e)
//! ```
//!
//! ## Rules
//! - The first latched error wins; later errors are discarded.
//! - The source is released at most once. Only the call that performs the
//!   release sees its result; later calls get `Ok(())`.
//! - Callers check [`terminal`](SharedSource::terminal) before pulling, after
//!   serving the requester's own backlog.

use crate::buffer::Reply;
use crate::core::session::Session;
use crate::error::SequenceError;
use crate::sequence::Sequence;

/// Outcome of pulling one item from the shared source.
pub(crate) enum Pull<T> {
    Item(T),
    End,
    Failed(SequenceError),
}


/// Source sequence plus the session's latched terminal state.
pub(crate) struct SharedSource<S> {
    source: S,
    session: Session,
    pulled: usize,
    finished: bool,
    error: Option<SequenceError>,
    released: bool,
}

impl<S: Sequence> SharedSource<S> {
    pub(crate) fn new(source: S, session: Session) -> Self {
        Self {
            source,
            session,
            pulled: 0,
            finished: false,
            error: None,
            released: false,
        }
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    /// Number of items pulled so far (the index of the next item).
    pub(crate) fn pulled(&self) -> usize {
        self.pulled
    }

    /// Reply for a requester with an empty backlog once the session is over.
    pub(crate) fn terminal<T>(&self) -> Option<Reply<T>> {
        if let Some(e) = &self.error {
            return Some(Reply::Failed(e.clone()));
        }
        if self.finished {
            return Some(Reply::End);
        }
        None
    }

    /// Advances the source once on behalf of handle `waiting`.
    pub(crate) async fn pull(&mut self, waiting: Option<usize>) -> Pull<S::Item> {
        if let Some(e) = &self.error {
            return Pull::Failed(e.clone());
        }
        if self.finished {
            return Pull::End;
        }

        if !self.source.advance().await {
            if let Some(e) = self.source.last_error() {
                return Pull::Failed(self.latch(waiting, e).await);
            }
            self.finished = true;
            self.session.exhausted(self.pulled);
            return match self.release().await {
                Ok(()) => Pull::End,
                Err(e) => Pull::Failed(self.latch(waiting, e).await),
            };
        }

        match self.source.take_current() {
            Some(item) => {
                self.pulled += 1;
                Pull::Item(item)
            }
            None => {
                let e = SequenceError::source("advanced without a current item");
                Pull::Failed(self.latch(waiting, e).await)
            }
        }
    }

    /// Latches `err` unless an error is already latched; returns the winner.
    ///
    /// Latching also releases the source; that release result is dropped.
    pub(crate) async fn latch(&mut self, waiting: Option<usize>, err: SequenceError) -> SequenceError {
        if let Some(e) = &self.error {
            return e.clone();
        }
        self.session.latched(waiting, &err);
        self.error = Some(err.clone());
        let _ = self.release().await;
        err
    }

    /// Releases the source if nobody has yet.
    pub(crate) async fn release(&mut self) -> Result<(), SequenceError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let res = self.source.release().await;
        self.session.source_released(&res);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::Observers;
    use crate::events::Bus;
    use crate::sequence::{from_iter, from_results};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn session() -> Session {
        Session::new(
            "test",
            Arc::new(Observers::new(Bus::new(4), CancellationToken::new())),
        )
    }

    #[tokio::test]
    async fn exhaustion_releases_the_source_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let counter = releases.clone();
        let source = from_iter(vec![1]).on_release(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let mut shared = SharedSource::new(source, session());

        assert!(matches!(shared.pull(None).await, Pull::Item(1)));
        assert_eq!(shared.pulled(), 1);
        assert!(shared.terminal::<i32>().is_none());
        assert!(matches!(shared.pull(None).await, Pull::End));
        assert!(matches!(shared.terminal::<i32>(), Some(Reply::End)));
        assert!(shared.release().await.is_ok());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn release_failure_at_exhaustion_becomes_the_session_error() {
        let source = from_iter(Vec::<u8>::new())
            .on_release(|| Err(SequenceError::release("fd leak")));
        let mut shared = SharedSource::new(source, session());

        match shared.pull(Some(0)).await {
            Pull::Failed(e) => assert_eq!(e, SequenceError::release("fd leak")),
            _ => panic!("expected the release error"),
        }
        assert!(matches!(
            shared.terminal::<u8>(),
            Some(Reply::Failed(SequenceError::Release { .. }))
        ));
    }

    #[tokio::test]
    async fn first_error_wins() {
        let source = from_results(vec![Ok(1), Err(SequenceError::source("first"))]);
        let mut shared = SharedSource::new(source, session());

        assert!(matches!(shared.pull(None).await, Pull::Item(1)));
        assert!(matches!(shared.pull(None).await, Pull::Failed(_)));
        let winner = shared.latch(None, SequenceError::source("second")).await;
        assert_eq!(winner, SequenceError::source("first"));
        match shared.pull(None).await {
            Pull::Failed(e) => assert_eq!(e, SequenceError::source("first")),
            _ => panic!("expected the latched error"),
        }
    }
}
