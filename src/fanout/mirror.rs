//! # Mirror: every handle sees every item.
//!
//! One coordinator task owns the source. A handle that finds its buffer empty
//! asks the coordinator for the next item; the coordinator pulls once and
//! appends a clone to every other live handle's buffer before answering.
//!
//! ```text
//!                 ┌────────────── coordinator ──────────────┐
//! handle k ─Next─►│ buffer[k].pop()?  ──► answer             │
//!                 │ terminal?         ──► End / Failed       │
//!                 │ pull() ──► Item(v)                       │
//!                 │   ├─► buffer[j].push(v.clone())  j != k  │
//!                 │   └─► answer k with v                    │
//!                 └──────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - Every handle observes the same items in source order.
//! - A released handle stops receiving clones; the others are unaffected.
//! - The source is released when it is exhausted, fails, or when the last live
//!   handle is released or dropped.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::buffer::{Buffer, Handle, Reply, Request};
use crate::core::session::Session;
use crate::core::shared::{Pull, SharedSource};
use crate::error::SequenceError;
use crate::sequence::Sequence;

/// One consumer of a mirrored source.
pub type Mirror<T> = Handle<T>;

/// Starts a mirror session with `count` handles.
pub(crate) fn spawn<S>(source: S, count: usize, mailbox: usize, session: Session) -> Vec<Mirror<S::Item>>
where
    S: Sequence + 'static,
    S::Item: Clone + 'static,
{
    let (tx, rx) = mpsc::channel(mailbox);
    let buffers: Vec<Arc<Buffer<S::Item>>> = (0..count).map(|_| Arc::new(Buffer::new())).collect();
    let handles = buffers
        .iter()
        .enumerate()
        .map(|(id, buffer)| Handle::new(id, Arc::clone(buffer), tx.clone()))
        .collect();

    session.started(count);
    let coordinator = Coordinator {
        shared: SharedSource::new(source, session),
        buffers,
        rx,
    };
    tokio::spawn(coordinator.run());
    handles
}

struct Coordinator<S: Sequence> {
    shared: SharedSource<S>,
    buffers: Vec<Arc<Buffer<S::Item>>>,
    rx: mpsc::Receiver<Request<S::Item>>,
}

impl<S> Coordinator<S>
where
    S: Sequence,
    S::Item: Clone,
{
    async fn run(mut self) {
        while !self.all_closed() {
            let Some(req) = self.rx.recv().await else {
                break;
            };
            match req {
                Request::Next { id, reply } => self.next(id, reply).await,
                Request::Close { id, reply } => self.close(id, reply).await,
            }
        }
        let _ = self.shared.release().await;
        self.shared.session().ended();
    }

    fn all_closed(&self) -> bool {
        self.buffers.iter().all(|b| b.is_closed())
    }

    async fn next(&mut self, id: usize, reply: oneshot::Sender<Reply<S::Item>>) {
        let Some(buffer) = self.buffers.get(id).cloned() else {
            return;
        };
        if let Some(item) = buffer.pop() {
            Reply::Item(item).answer(reply, &buffer);
            return;
        }
        if let Some(done) = self.shared.terminal() {
            buffer.close();
            let _ = reply.send(done);
            return;
        }

        match self.shared.pull(Some(id)).await {
            Pull::Item(item) => {
                for (other, b) in self.buffers.iter().enumerate() {
                    if other != id && !b.is_closed() {
                        b.push(item.clone());
                    }
                }
                Reply::Item(item).answer(reply, &buffer);
            }
            Pull::End => {
                buffer.close();
                let _ = reply.send(Reply::End);
            }
            Pull::Failed(e) => {
                buffer.close();
                let _ = reply.send(Reply::Failed(e));
            }
        }
    }

    async fn close(&mut self, id: usize, reply: Option<oneshot::Sender<Result<(), SequenceError>>>) {
        if let Some(buffer) = self.buffers.get(id) {
            buffer.close();
        }
        self.shared.session().handle_released(id);

        let res = if self.all_closed() {
            self.shared.release().await
        } else {
            Ok(())
        };
        if let Some(reply) = reply {
            let _ = reply.send(res);
        }
    }
}
