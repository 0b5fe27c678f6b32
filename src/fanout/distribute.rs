//! # Distribute: each item goes to exactly one partition.
//!
//! The caller gets a [`Distributor`], an outer sequence that yields a fresh
//! [`Partition`] on every `advance()`. Items pulled from the source are routed
//! round-robin across the open partitions in creation order.
//!
//! ```text
//! Distributor::advance() ──Next──► coordinator ──► new Partition(id = n)
//!
//! Partition k ──Next──► coordinator
//!                          ├─ buffer[k].pop()?         ──► answer
//!                          ├─ terminal?                ──► End / Failed
//!                          └─ loop pull()
//!                               route(v) = next open partition from cursor
//!                               ├─ == k  ──► answer k
//!                               └─ != k  ──► buffer[i].push(v)
//! ```
//!
//! ## Rules
//! - Every item reaches exactly one partition; none is lost or duplicated
//!   unless its partition was released first.
//! - Closed partitions are skipped by the rotation.
//! - Partition buffers are unbounded; when one grows past `buffer_size`
//!   (non-zero) a `BacklogExceeded` event is published once per crossing.
//! - The outer sequence stops yielding partitions once the session ended.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::buffer::{Buffer, Handle, Reply, Request};
use crate::core::session::Session;
use crate::core::shared::{Pull, SharedSource};
use crate::error::SequenceError;
use crate::sequence::Sequence;

/// One consumer of a distributed source.
pub type Partition<T> = Handle<T>;

/// Outer sequence of partitions returned by [`distribute`](crate::distribute).
pub type Distributor<T> = Handle<Partition<T>>;

/// Starts a distribute session.
pub(crate) fn spawn<S>(source: S, buffer_size: usize, mailbox: usize, session: Session) -> Distributor<S::Item>
where
    S: Sequence + 'static,
    S::Item: 'static,
{
    let (outer_tx, outer_rx) = mpsc::channel(mailbox);
    let (inner_tx, inner_rx) = mpsc::channel(mailbox);
    let outer = Arc::new(Buffer::new());
    let distributor = Handle::new(0, Arc::clone(&outer), outer_tx);

    session.started(0);
    let coordinator = Coordinator {
        shared: SharedSource::new(source, session),
        partitions: Vec::new(),
        watermark: buffer_size,
        cursor: 0,
        outer,
        outer_rx,
        inner_rx,
        inner_tx,
    };
    tokio::spawn(coordinator.run());
    distributor
}

struct Coordinator<S: Sequence> {
    shared: SharedSource<S>,
    partitions: Vec<Arc<Buffer<S::Item>>>,
    watermark: usize,
    cursor: usize,
    outer: Arc<Buffer<Partition<S::Item>>>,
    outer_rx: mpsc::Receiver<Request<Partition<S::Item>>>,
    inner_rx: mpsc::Receiver<Request<S::Item>>,
    inner_tx: mpsc::Sender<Request<S::Item>>,
}

impl<S: Sequence> Coordinator<S> {
    async fn run(mut self) {
        let mut outer_open = true;
        while !self.all_closed() {
            tokio::select! {
                req = self.outer_rx.recv(), if outer_open => match req {
                    Some(req) => self.on_outer(req).await,
                    None => outer_open = false,
                },
                Some(req) = self.inner_rx.recv() => self.on_partition(req).await,
                else => break,
            }
        }
        let _ = self.shared.release().await;
        self.shared.session().ended();
    }

    fn all_closed(&self) -> bool {
        self.outer.is_closed() && self.partitions.iter().all(|p| p.is_closed())
    }

    async fn on_outer(&mut self, req: Request<Partition<S::Item>>) {
        match req {
            Request::Next { reply, .. } => {
                if let Some(done) = self.shared.terminal() {
                    self.outer.close();
                    let _ = reply.send(done);
                    return;
                }
                let id = self.partitions.len();
                let buffer = Arc::new(Buffer::new());
                self.partitions.push(Arc::clone(&buffer));
                self.shared.session().handle_opened(id);
                let partition = Handle::new(id, buffer, self.inner_tx.clone());
                Reply::Item(partition).answer(reply, &self.outer);
            }
            Request::Close { reply, .. } => {
                self.outer.close();
                self.finish_close(reply).await;
            }
        }
    }

    async fn on_partition(&mut self, req: Request<S::Item>) {
        match req {
            Request::Next { id, reply } => self.next(id, reply).await,
            Request::Close { id, reply } => {
                if let Some(buffer) = self.partitions.get(id) {
                    buffer.close();
                }
                self.shared.session().handle_released(id);
                self.finish_close(reply).await;
            }
        }
    }

    async fn finish_close(&mut self, reply: Option<oneshot::Sender<Result<(), SequenceError>>>) {
        let res = if self.all_closed() {
            self.shared.release().await
        } else {
            Ok(())
        };
        if let Some(reply) = reply {
            let _ = reply.send(res);
        }
    }

    async fn next(&mut self, id: usize, reply: oneshot::Sender<Reply<S::Item>>) {
        let Some(buffer) = self.partitions.get(id).cloned() else {
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

        loop {
            match self.shared.pull(Some(id)).await {
                Pull::Item(item) => match self.route() {
                    Some(target) if target != id => self.enqueue(target, item),
                    _ => {
                        Reply::Item(item).answer(reply, &buffer);
                        return;
                    }
                },
                Pull::End => {
                    buffer.close();
                    let _ = reply.send(Reply::End);
                    return;
                }
                Pull::Failed(e) => {
                    buffer.close();
                    let _ = reply.send(Reply::Failed(e));
                    return;
                }
            }
        }
    }

    /// Next open partition at or after the cursor; advances the cursor past it.
    fn route(&mut self) -> Option<usize> {
        let n = self.partitions.len();
        for step in 0..n {
            let i = (self.cursor + step) % n;
            if !self.partitions[i].is_closed() {
                self.cursor = i + 1;
                return Some(i);
            }
        }
        None
    }

    fn enqueue(&self, target: usize, item: S::Item) {
        let buffer = &self.partitions[target];
        if !buffer.push(item) {
            return;
        }
        let queued = buffer.len();
        if self.watermark > 0 && self.watermark.checked_add(1) == Some(queued) {
            self.shared.session().backlog_exceeded(target, queued);
        }
    }
}
