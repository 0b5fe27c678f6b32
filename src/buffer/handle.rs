//! # Handle: one consumer's view of a shared source.
//!
//! A [`Handle`] implements [`Sequence`] for a single consumer. It owns nothing but
//! its [`Buffer`] and a sender into the coordinator's mailbox; the coordinator is
//! the only task that ever touches the shared source.
//!
//! ## Protocol
//! ```text
//! advance()
//!   ├─► buffer.pop() ─── Some(item) ──► true            (no round-trip)
//!   └─► None
//!        ├─► mailbox.send(Next { id, reply })
//!        └─► reply.await
//!              ├─ Item(v)    ──► true
//!              ├─ End        ──► Finished, false
//!              └─ Failed(e)  ──► Failed(e), false
//!
//! release()
//!   ├─► buffer.close()                (backlog discarded locally)
//!   └─► mailbox.send(Close { id, reply }) ──► reply.await ──► cached result
//! ```
//!
//! ## Rules
//! - Terminal states (`Finished`, `Failed`, `Released`) are sticky and never
//!   contact the coordinator again.
//! - Dropping an active handle counts as a release (fire-and-forget `Close`).
//! - If an `advance()` future is dropped while waiting, the coordinator puts the
//!   undelivered item back at the head of the buffer.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::Buffer;
use crate::error::SequenceError;
use crate::sequence::Sequence;

/// Message from a handle to its coordinator.
pub(crate) enum Request<T> {
    /// "I need the next item."
    Next {
        id: usize,
        reply: oneshot::Sender<Reply<T>>,
    },
    /// "I'm done." `reply` is `None` when sent from `Drop`.
    Close {
        id: usize,
        reply: Option<oneshot::Sender<Result<(), SequenceError>>>,
    },
}

/// Coordinator's answer to [`Request::Next`].
pub(crate) enum Reply<T> {
    Item(T),
    End,
    Failed(SequenceError),
}

impl<T> Reply<T> {
    /// Sends the reply; an item the handle is no longer waiting for goes back
    /// to the head of its buffer.
    pub(crate) fn answer(self, reply: oneshot::Sender<Reply<T>>, buffer: &Buffer<T>) {
        if let Err(Reply::Item(item)) = reply.send(self) {
            buffer.requeue(item);
        }
    }
}

#[derive(Debug)]
enum State {
    Active,
    Finished,
    Failed(SequenceError),
    Released(Result<(), SequenceError>),
}

/// Per-consumer sequence backed by a coordinator.
///
/// Returned by [`mirror`](crate::mirror) (as [`Mirror`](crate::Mirror)),
/// [`distribute`](crate::distribute) (as [`Partition`](crate::Partition)) and the
/// group constructors (as [`Group`](crate::Group)).
pub struct Handle<T> {
    id: usize,
    buffer: Arc<Buffer<T>>,
    mailbox: mpsc::Sender<Request<T>>,
    curr: Option<T>,
    state: State,
}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T> Handle<T> {
    pub(crate) fn new(id: usize, buffer: Arc<Buffer<T>>, mailbox: mpsc::Sender<Request<T>>) -> Self {
        Self {
            id,
            buffer,
            mailbox,
            curr: None,
            state: State::Active,
        }
    }

    /// Position of this handle within its session (creation order).
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of items already pulled for this handle but not yet read.
    pub fn backlog(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true once the handle reached a terminal state.
    pub fn is_done(&self) -> bool {
        !matches!(self.state, State::Active)
    }

    fn terminate(&mut self, state: State) {
        self.curr = None;
        self.buffer.close();
        self.state = state;
    }
}

#[async_trait]
impl<T: Send> Sequence for Handle<T> {
    type Item = T;

    async fn advance(&mut self) -> bool {
        self.curr = None;
        if !matches!(self.state, State::Active) {
            return false;
        }

        if let Some(item) = self.buffer.pop() {
            self.curr = Some(item);
            return true;
        }

        let (tx, rx) = oneshot::channel();
        let req = Request::Next {
            id: self.id,
            reply: tx,
        };
        if self.mailbox.send(req).await.is_err() {
            self.terminate(State::Failed(SequenceError::Disconnected));
            return false;
        }

        match rx.await {
            Ok(Reply::Item(item)) => {
                self.curr = Some(item);
                true
            }
            Ok(Reply::End) => {
                self.terminate(State::Finished);
                false
            }
            Ok(Reply::Failed(e)) => {
                self.terminate(State::Failed(e));
                false
            }
            Err(_) => {
                self.terminate(State::Failed(SequenceError::Disconnected));
                false
            }
        }
    }

    fn current(&self) -> Option<&T> {
        self.curr.as_ref()
    }

    fn take_current(&mut self) -> Option<T> {
        self.curr.take()
    }

    async fn release(&mut self) -> Result<(), SequenceError> {
        match &self.state {
            State::Active => {}
            State::Finished => return Ok(()),
            State::Failed(e) => return Err(e.clone()),
            State::Released(res) => return res.clone(),
        }

        self.curr = None;
        self.buffer.close();

        let (tx, rx) = oneshot::channel();
        let req = Request::Close {
            id: self.id,
            reply: Some(tx),
        };
        let res = match self.mailbox.send(req).await {
            Ok(()) => rx.await.unwrap_or(Ok(())),
            Err(_) => Ok(()),
        };
        self.state = State::Released(res.clone());
        res
    }

    fn last_error(&self) -> Option<SequenceError> {
        match &self.state {
            State::Failed(e) | State::Released(Err(e)) => Some(e.clone()),
            _ => None,
        }
    }
}

impl<T> Drop for Handle<T> {
    fn drop(&mut self) {
        if matches!(self.state, State::Active) {
            self.buffer.close();
            let _ = self.mailbox.try_send(Request::Close {
                id: self.id,
                reply: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_with_mailbox() -> (Handle<u32>, Arc<Buffer<u32>>, mpsc::Receiver<Request<u32>>) {
        let (tx, rx) = mpsc::channel(4);
        let buffer = Arc::new(Buffer::new());
        (Handle::new(0, buffer.clone(), tx), buffer, rx)
    }

    #[tokio::test]
    async fn backlog_is_served_without_the_coordinator() {
        let (mut handle, buffer, mut rx) = handle_with_mailbox();
        buffer.push(5);
        buffer.push(6);

        assert!(handle.advance().await);
        assert_eq!(handle.take_current(), Some(5));
        assert!(handle.advance().await);
        assert_eq!(handle.current(), Some(&6));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn terminal_state_is_sticky() {
        let (mut handle, _buffer, mut rx) = handle_with_mailbox();
        assert!(!handle.is_done());
        let coordinator = tokio::spawn(async move {
            if let Some(Request::Next { reply, .. }) = rx.recv().await {
                let _ = reply.send(Reply::Failed(SequenceError::source("gone")));
            }
            rx
        });

        assert!(!handle.advance().await);
        assert!(handle.is_done());
        let mut rx = coordinator.await.unwrap();
        assert!(!handle.advance().await);
        assert!(rx.try_recv().is_err());
        assert_eq!(handle.last_error(), Some(SequenceError::source("gone")));
        assert_eq!(handle.release().await, Err(SequenceError::source("gone")));
        assert_eq!(handle.release().await, Err(SequenceError::source("gone")));
    }

    #[tokio::test]
    async fn release_is_reported_once_and_cached() {
        let (mut handle, buffer, mut rx) = handle_with_mailbox();
        buffer.push(1);
        let coordinator = tokio::spawn(async move {
            let mut closes = 0;
            while let Some(req) = rx.recv().await {
                if let Request::Close { reply, .. } = req {
                    closes += 1;
                    if let Some(reply) = reply {
                        let _ = reply.send(Err(SequenceError::release("flush failed")));
                    }
                }
            }
            closes
        });

        let first = handle.release().await;
        let second = handle.release().await;
        assert_eq!(first, Err(SequenceError::release("flush failed")));
        assert_eq!(first, second);
        assert!(buffer.is_closed());
        assert!(!handle.advance().await);

        drop(handle);
        assert_eq!(coordinator.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn dropping_an_active_handle_sends_close() {
        let (handle, buffer, mut rx) = handle_with_mailbox();
        drop(handle);
        assert!(buffer.is_closed());
        assert!(matches!(
            rx.recv().await,
            Some(Request::Close { id: 0, reply: None })
        ));
    }

    #[tokio::test]
    async fn missing_coordinator_is_an_error() {
        let (mut handle, _buffer, rx) = handle_with_mailbox();
        drop(rx);
        assert!(!handle.advance().await);
        assert_eq!(handle.last_error(), Some(SequenceError::Disconnected));
    }

    #[test]
    fn unanswered_item_goes_back_to_the_buffer() {
        let buffer = Buffer::new();
        buffer.push(2);
        let (tx, rx) = oneshot::channel();
        drop(rx);
        Reply::Item(1).answer(tx, &buffer);
        assert_eq!(buffer.pop(), Some(1));
        assert_eq!(buffer.pop(), Some(2));
    }
}
