//! # Group: one handle per distinct key.
//!
//! The caller gets [`Groups`], an outer sequence yielding a [`Group`] the first
//! time a new key is seen. Items with a known key are queued on that group's
//! buffer; the group's first item is queued before its handle is handed out.
//!
//! ```text
//! Groups::advance()  ──Next──► coordinator
//!                                ├─ outer.pop()?            (groups found by
//!                                │                           other readers)
//!                                ├─ terminal?  ──► End / Failed
//!                                └─ loop pull + key(index, &v)
//!                                     ├─ known key ──► group buffer
//!                                     └─ new key   ──► answer with new Group
//!
//! Group g ──Next──► coordinator
//!                     ├─ buffer[g].pop()?
//!                     ├─ terminal?
//!                     └─ loop pull + key
//!                          ├─ key == g  ──► answer
//!                          ├─ known key ──► that group's buffer
//!                          └─ new key   ──► new Group queued on outer buffer
//! ```
//!
//! ## Rules
//! - Groups appear in first-occurrence order of their keys.
//! - Within a group, items keep source order.
//! - A key function error is latched like a source error, with the item index.
//! - Items for a released group are discarded.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::buffer::{Buffer, Handle, Reply, Request};
use crate::core::session::Session;
use crate::core::shared::{Pull, SharedSource};
use crate::error::{SequenceError, ValErr};
use crate::sequence::Sequence;

/// Items sharing one key.
pub type Group<T> = Handle<T>;

/// Outer sequence of groups returned by the group constructors.
pub type Groups<T> = Handle<Group<T>>;

/// Starts a group session. `key_fn` gets each item's index in the source.
pub(crate) fn spawn<S, K, F>(source: S, key_fn: F, mailbox: usize, session: Session) -> Groups<S::Item>
where
    S: Sequence + 'static,
    S::Item: 'static,
    K: Eq + Hash + Send + 'static,
    F: FnMut(usize, &S::Item) -> ValErr<K> + Send + 'static,
{
    let (outer_tx, outer_rx) = mpsc::channel(mailbox);
    let (inner_tx, inner_rx) = mpsc::channel(mailbox);
    let outer = Arc::new(Buffer::new());
    let groups = Handle::new(0, Arc::clone(&outer), outer_tx);

    session.started(0);
    let coordinator = Coordinator {
        shared: SharedSource::new(source, session),
        key_fn,
        keys: HashMap::new(),
        groups: Vec::new(),
        outer,
        outer_rx,
        inner_rx,
        inner_tx,
    };
    tokio::spawn(coordinator.run());
    groups
}

struct Coordinator<S: Sequence, K, F> {
    shared: SharedSource<S>,
    key_fn: F,
    keys: HashMap<K, usize>,
    groups: Vec<Arc<Buffer<S::Item>>>,
    outer: Arc<Buffer<Group<S::Item>>>,
    outer_rx: mpsc::Receiver<Request<Group<S::Item>>>,
    inner_rx: mpsc::Receiver<Request<S::Item>>,
    inner_tx: mpsc::Sender<Request<S::Item>>,
}

impl<S, K, F> Coordinator<S, K, F>
where
    S: Sequence,
    K: Eq + Hash,
    F: FnMut(usize, &S::Item) -> ValErr<K>,
{
    async fn run(mut self) {
        let mut outer_open = true;
        while !self.all_closed() {
            tokio::select! {
                req = self.outer_rx.recv(), if outer_open => match req {
                    Some(req) => self.on_outer(req).await,
                    None => outer_open = false,
                },
                Some(req) = self.inner_rx.recv() => self.on_group(req).await,
                else => break,
            }
        }
        let _ = self.shared.release().await;
        self.shared.session().ended();
    }

    fn all_closed(&self) -> bool {
        self.outer.is_closed() && self.groups.iter().all(|g| g.is_closed())
    }

    async fn pull_keyed(&mut self, waiting: Option<usize>) -> Pull<(S::Item, K)> {
        let index = self.shared.pulled();
        match self.shared.pull(waiting).await {
            Pull::Item(item) => match (self.key_fn)(index, &item) {
                Ok(key) => Pull::Item((item, key)),
                Err(e) => Pull::Failed(self.shared.latch(waiting, e).await),
            },
            Pull::End => Pull::End,
            Pull::Failed(e) => Pull::Failed(e),
        }
    }

    fn open_group(&mut self, key: K, first: S::Item) -> Group<S::Item> {
        let id = self.groups.len();
        let buffer = Arc::new(Buffer::new());
        buffer.push(first);
        self.groups.push(Arc::clone(&buffer));
        self.keys.insert(key, id);
        self.shared.session().group_opened(id);
        Handle::new(id, buffer, self.inner_tx.clone())
    }

    async fn on_outer(&mut self, req: Request<Group<S::Item>>) {
        let reply = match req {
            Request::Next { reply, .. } => reply,
            Request::Close { reply, .. } => {
                self.outer.close();
                self.finish_close(reply).await;
                return;
            }
        };

        let outer = Arc::clone(&self.outer);
        if let Some(group) = outer.pop() {
            Reply::Item(group).answer(reply, &outer);
            return;
        }
        if let Some(done) = self.shared.terminal() {
            outer.close();
            let _ = reply.send(done);
            return;
        }

        loop {
            match self.pull_keyed(None).await {
                Pull::Item((item, key)) => match self.keys.get(&key).copied() {
                    Some(id) => {
                        self.groups[id].push(item);
                    }
                    None => {
                        let group = self.open_group(key, item);
                        Reply::Item(group).answer(reply, &outer);
                        return;
                    }
                },
                Pull::End => {
                    outer.close();
                    let _ = reply.send(Reply::End);
                    return;
                }
                Pull::Failed(e) => {
                    outer.close();
                    let _ = reply.send(Reply::Failed(e));
                    return;
                }
            }
        }
    }

    async fn on_group(&mut self, req: Request<S::Item>) {
        match req {
            Request::Next { id, reply } => self.next(id, reply).await,
            Request::Close { id, reply } => {
                if let Some(buffer) = self.groups.get(id) {
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
        let Some(buffer) = self.groups.get(id).cloned() else {
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
            match self.pull_keyed(Some(id)).await {
                Pull::Item((item, key)) => match self.keys.get(&key).copied() {
                    Some(g) if g == id => {
                        Reply::Item(item).answer(reply, &buffer);
                        return;
                    }
                    Some(g) => {
                        self.groups[g].push(item);
                    }
                    None => {
                        let group = self.open_group(key, item);
                        self.outer.push(group);
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::Observers;
    use crate::events::Bus;
    use crate::sequence::{collect, from_iter, from_results};
    use tokio_util::sync::CancellationToken;

    fn session() -> Session {
        Session::new(
            "group",
            Arc::new(Observers::new(Bus::new(8), CancellationToken::new())),
        )
    }

    fn parity(_: usize, v: &u32) -> ValErr<u32> {
        Ok(v % 2)
    }

    #[tokio::test]
    async fn groups_follow_first_occurrence_order() {
        let mut groups = spawn(from_iter(vec![3u32, 4, 5, 6, 7]), parity, 4, session());

        assert!(groups.advance().await);
        let odd = groups.take_current().unwrap();
        assert!(groups.advance().await);
        let even = groups.take_current().unwrap();
        assert!(!groups.advance().await);
        assert!(groups.last_error().is_none());

        assert_eq!(collect(even).await.unwrap(), vec![4, 6]);
        assert_eq!(collect(odd).await.unwrap(), vec![3, 5, 7]);
    }

    #[tokio::test]
    async fn a_group_reader_discovers_new_groups() {
        let mut groups = spawn(from_iter(vec![1u32, 3, 2, 5]), parity, 4, session());

        assert!(groups.advance().await);
        let odd = groups.take_current().unwrap();
        assert_eq!(collect(odd).await.unwrap(), vec![1, 3, 5]);

        assert!(groups.advance().await);
        let even = groups.take_current().unwrap();
        assert_eq!(even.backlog(), 1);
        assert_eq!(collect(even).await.unwrap(), vec![2]);
        assert!(!groups.advance().await);
    }

    #[tokio::test]
    async fn key_errors_carry_the_item_index() {
        let key = |index: usize, v: &u32| {
            if *v == 9 {
                Err(SequenceError::key(index, "nine"))
            } else {
                Ok(*v)
            }
        };
        let mut groups = spawn(from_iter(vec![1u32, 1, 9]), key, 4, session());

        assert!(groups.advance().await);
        let ones = groups.take_current().unwrap();
        assert!(!groups.advance().await);
        assert_eq!(groups.last_error(), Some(SequenceError::key(2, "nine")));
        assert_eq!(collect(ones).await, Err(SequenceError::key(2, "nine")));
    }

    async fn read_all(mut group: Group<u32>) -> (Vec<u32>, Option<SequenceError>) {
        let mut items = Vec::new();
        while group.advance().await {
            items.extend(group.take_current());
        }
        (items, group.last_error())
    }

    #[tokio::test]
    async fn buffered_items_are_delivered_before_the_error() {
        let bad = SequenceError::source("bad");
        let source = from_results(vec![Ok(1u32), Ok(2), Ok(1), Ok(1), Err(bad.clone())]);
        let mut groups = spawn(source, |_, v: &u32| Ok(*v), 4, session());

        assert!(groups.advance().await);
        let ones = groups.take_current().unwrap();
        assert!(groups.advance().await);
        let twos = groups.take_current().unwrap();
        assert!(!groups.advance().await);
        assert_eq!(groups.last_error(), Some(bad.clone()));

        assert_eq!(read_all(twos).await, (vec![2], Some(bad.clone())));
        assert_eq!(read_all(ones).await, (vec![1, 1, 1], Some(bad)));
    }

    #[tokio::test]
    async fn items_for_released_groups_are_dropped() {
        let mut groups = spawn(from_iter(vec![0u32, 1, 0, 1, 0]), parity, 4, session());

        assert!(groups.advance().await);
        let mut zeros = groups.take_current().unwrap();
        assert!(groups.advance().await);
        let ones = groups.take_current().unwrap();

        assert!(zeros.release().await.is_ok());
        assert_eq!(collect(ones).await.unwrap(), vec![1, 1]);
    }
}
