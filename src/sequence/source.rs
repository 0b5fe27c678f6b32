//! # Iterator-backed sequence (`IterSeq`)
//!
//! [`IterSeq`] adapts any `Iterator<Item = ValErr<T>>` to the [`Sequence`] contract.
//! The first `Err` yielded by the iterator is latched and terminal.
//!
//! A release hook can be attached with [`IterSeq::on_release`]; it runs exactly once,
//! on the first [`release`](Sequence::release), and its result is cached.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use seqfan::{from_iter, Sequence};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let released = Arc::new(AtomicBool::new(false));
//! let flag = released.clone();
//! let mut seq = from_iter(0..3).on_release(move || {
//!     flag.store(true, Ordering::SeqCst);
//!     Ok(())
//! });
//!
//! while seq.advance().await {}
//! seq.release().await.unwrap();
//! assert!(released.load(Ordering::SeqCst));
//! # }
//! ```

use async_trait::async_trait;

use crate::error::{SequenceError, ValErr};
use crate::sequence::Sequence;

type ReleaseHook = Box<dyn FnOnce() -> Result<(), SequenceError> + Send>;

/// Sequence over an in-memory iterator of [`ValErr`] items.
pub struct IterSeq<I, T> {
    iter: Option<I>,
    curr: Option<T>,
    err: Option<SequenceError>,
    hook: Option<ReleaseHook>,
    released: Option<Result<(), SequenceError>>,
}

/// Creates a sequence over plain values.
pub fn from_iter<I>(items: I) -> IterSeq<std::iter::Map<I::IntoIter, fn(I::Item) -> ValErr<I::Item>>, I::Item>
where
    I: IntoIterator,
{
    let wrap: fn(I::Item) -> ValErr<I::Item> = Ok;
    IterSeq::new(items.into_iter().map(wrap))
}

/// Creates a sequence over value-or-error items.
///
/// The sequence stops at the first `Err` and reports it through
/// [`last_error`](Sequence::last_error).
pub fn from_results<I, T>(items: I) -> IterSeq<I::IntoIter, T>
where
    I: IntoIterator<Item = ValErr<T>>,
{
    IterSeq::new(items.into_iter())
}

impl<I, T> IterSeq<I, T>
where
    I: Iterator<Item = ValErr<T>>,
{
    /// Wraps an iterator of [`ValErr`] items.
    pub fn new(iter: I) -> Self {
        Self {
            iter: Some(iter),
            curr: None,
            err: None,
            hook: None,
            released: None,
        }
    }

    /// Attaches a hook that runs once, on the first release.
    #[must_use]
    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() -> Result<(), SequenceError> + Send + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }
}

#[async_trait]
impl<I, T> Sequence for IterSeq<I, T>
where
    I: Iterator<Item = ValErr<T>> + Send,
    T: Send,
{
    type Item = T;

    async fn advance(&mut self) -> bool {
        self.curr = None;
        let Some(iter) = self.iter.as_mut() else {
            return false;
        };

        match iter.next() {
            Some(Ok(item)) => {
                self.curr = Some(item);
                true
            }
            Some(Err(e)) => {
                self.err = Some(e);
                self.iter = None;
                false
            }
            None => {
                self.iter = None;
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
        if let Some(res) = &self.released {
            return res.clone();
        }
        self.iter = None;
        self.curr = None;

        let res = match self.hook.take() {
            Some(hook) => hook(),
            None => Ok(()),
        };
        if let Err(e) = &res {
            self.err.get_or_insert_with(|| e.clone());
        }
        self.released = Some(res.clone());
        res
    }

    fn last_error(&self) -> Option<SequenceError> {
        self.err.clone()
    }
}
