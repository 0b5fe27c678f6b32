//! # Merge: many sources, one consumer.
//!
//! Every source is drained by its own task into one bounded channel; the
//! consumer reads that channel through [`Merged`].
//!
//! ```text
//! source 0 ──► drain 0 ──┐
//! source 1 ──► drain 1 ──┼──► mpsc (merge_capacity) ──► Merged::advance()
//! source N ──► drain N ──┘
//!                 │
//!          error? ├─► send Err ──► cancel token ──► siblings stop
//!                 └─► source.release()          (always, even when cancelled)
//!
//! supervisor: join all drains ──► cancel ──► SessionEnded
//! ```
//!
//! ## Rules
//! - Per-source order is preserved; interleaving across sources is arbitrary.
//! - The first error wins and cancels the siblings; later errors are dropped.
//! - Every source is released exactly once, including cancelled ones.
//! - A source's release error is delivered like a source error unless the
//!   merge already failed or was cancelled.
//! - [`Merged::release`] cancels all drains and waits up to `release_grace`
//!   for them to stop; drains still running after that are reported as
//!   [`SequenceError::GraceExceeded`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::core::session::Session;
use crate::error::{SequenceError, ValErr};
use crate::sequence::{from_receiver, ChannelSeq, Sequence};

/// Sequence returned by [`merge`](crate::merge).
pub struct Merged<T> {
    output: ChannelSeq<T>,
    cancel: CancellationToken,
    supervisor: Option<JoinHandle<()>>,
    running: Arc<AtomicUsize>,
    grace: Option<Duration>,
    released: Option<Result<(), SequenceError>>,
}

/// Decrements the running-drain counter however the drain ends.
struct Running(Arc<AtomicUsize>);

impl Drop for Running {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Starts a merge session over `sources`.
pub(crate) fn spawn<S>(sources: Vec<S>, capacity: usize, grace: Option<Duration>, session: Session) -> Merged<S::Item>
where
    S: Sequence + 'static,
    S::Item: 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let cancel = CancellationToken::new();
    let running = Arc::new(AtomicUsize::new(sources.len()));

    session.started(sources.len());
    let mut drains = JoinSet::new();
    for (index, source) in sources.into_iter().enumerate() {
        let drain = Drain {
            index,
            tx: tx.clone(),
            cancel: cancel.clone(),
            session: session.clone(),
            _running: Running(Arc::clone(&running)),
        };
        drains.spawn(drain_source(drain, source));
    }
    let supervisor = tokio::spawn(supervise(drains, tx, cancel.clone(), session));

    Merged {
        output: from_receiver(rx),
        cancel,
        supervisor: Some(supervisor),
        running,
        grace,
        released: None,
    }
}

struct Drain<T> {
    index: usize,
    tx: mpsc::Sender<ValErr<T>>,
    cancel: CancellationToken,
    session: Session,
    _running: Running,
}

impl<T> Drain<T> {
    /// Delivers `err` unless the merge was cancelled first; cancels the siblings.
    async fn fail(&self, err: SequenceError) {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            sent = self.tx.send(Err(err.clone())) => {
                if sent.is_ok() {
                    self.cancel.cancel();
                    self.session.merge_cancelled(self.index, &err);
                }
            }
        }
    }
}

async fn drain_source<S: Sequence>(drain: Drain<S::Item>, mut source: S) {
    let mut failure = None;
    while !drain.cancel.is_cancelled() {
        if !source.advance().await {
            failure = source.last_error();
            break;
        }
        let Some(item) = source.take_current() else {
            continue;
        };
        tokio::select! {
            biased;
            _ = drain.cancel.cancelled() => break,
            sent = drain.tx.send(Ok(item)) => if sent.is_err() { break },
        }
    }

    let failed = failure.is_some();
    if let Some(e) = failure {
        drain.fail(e).await;
    }
    let released = source.release().await;
    if let (false, Err(e)) = (failed, released) {
        drain.fail(e).await;
    }
}

async fn supervise<T>(
    mut drains: JoinSet<()>,
    tx: mpsc::Sender<ValErr<T>>,
    cancel: CancellationToken,
    session: Session,
) {
    while let Some(joined) = drains.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() && !cancel.is_cancelled() {
                cancel.cancel();
                let _ = tx.send(Err(SequenceError::source("merged source panicked"))).await;
            }
        }
    }
    cancel.cancel();
    session.ended();
}

impl<T> Merged<T> {
    /// Number of drain tasks that have not finished yet.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Send> Sequence for Merged<T> {
    type Item = T;

    async fn advance(&mut self) -> bool {
        if self.released.is_some() {
            return false;
        }
        self.output.advance().await
    }

    fn current(&self) -> Option<&T> {
        self.output.current()
    }

    fn take_current(&mut self) -> Option<T> {
        self.output.take_current()
    }

    async fn release(&mut self) -> Result<(), SequenceError> {
        if let Some(res) = &self.released {
            return res.clone();
        }
        self.cancel.cancel();
        let _ = self.output.release().await;

        let res = match (self.supervisor.take(), self.grace) {
            (Some(supervisor), Some(grace)) => {
                match tokio::time::timeout(grace, supervisor).await {
                    Ok(_) => Ok(()),
                    Err(_) => Err(SequenceError::GraceExceeded {
                        grace,
                        stuck: self.running(),
                    }),
                }
            }
            _ => Ok(()),
        };
        self.released = Some(res.clone());
        res
    }

    fn last_error(&self) -> Option<SequenceError> {
        self.output
            .last_error()
            .or_else(|| self.released.clone().and_then(Result::err))
    }
}

impl<T> Drop for Merged<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
