//! # The sequence contract and its leaf producers.
//!
//! This module provides:
//! - [`Sequence`] - the four-operation contract every producer and handle implements
//! - [`BoxSequence`] - an owned, type-erased sequence (`Box<dyn Sequence>`)
//! - [`IterSeq`] - a sequence over an in-memory iterator ([`from_iter`], [`from_results`])
//! - [`ChannelSeq`] - a sequence over an `mpsc` receiver of [`ValErr`](crate::ValErr)
//! - [`drain`], [`collect`], [`flatten`] - single-consumer helpers
//!
//! A sequence is stateful and owned by exactly one task at a time. Sharing one
//! between several consumers goes through a coordinator (see [`Hub`](crate::Hub)).

mod channel;
mod drain;
mod source;

pub use channel::{from_receiver, ChannelSeq};
pub use drain::{collect, drain, flatten, Flatten};
pub use source::{from_iter, from_results, IterSeq};

use async_trait::async_trait;

use crate::error::SequenceError;

/// Owned, type-erased sequence.
pub type BoxSequence<T> = Box<dyn Sequence<Item = T>>;

/// # Lazy, stateful, single-owner source of values.
///
/// `advance()` moves to the next position and reports whether an item exists.
/// The item is then read with [`current`](Sequence::current) (borrowed) or
/// [`take_current`](Sequence::take_current) (owned). When `advance()` returns
/// `false`, [`last_error`](Sequence::last_error) tells a clean end (`None`)
/// apart from a failure (`Some`).
///
/// # Example
/// ```
/// use seqfan::{from_iter, Sequence};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut seq = from_iter(vec![1, 2]);
/// assert!(seq.advance().await);
/// assert_eq!(seq.current(), Some(&1));
/// assert!(seq.advance().await);
/// assert!(!seq.advance().await);
/// assert!(seq.last_error().is_none());
/// assert!(seq.release().await.is_ok());
/// # }
/// ```
#[async_trait]
pub trait Sequence: Send {
    /// Type of the produced values.
    type Item: Send;

    /// Moves to the next item. Returns `false` once exhausted, failed or released.
    async fn advance(&mut self) -> bool;

    /// Returns the item at the current position, if any.
    fn current(&self) -> Option<&Self::Item>;

    /// Moves the current item out, leaving the position empty.
    fn take_current(&mut self) -> Option<Self::Item>;

    /// Releases the sequence and its resources.
    ///
    /// Idempotent: every call after the first returns the result of the first.
    async fn release(&mut self) -> Result<(), SequenceError>;

    /// Returns the first error encountered by any operation, if any.
    fn last_error(&self) -> Option<SequenceError>;

    /// Erases the concrete type.
    fn boxed(self) -> BoxSequence<Self::Item>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

#[async_trait]
impl<S> Sequence for Box<S>
where
    S: Sequence + ?Sized,
{
    type Item = S::Item;

    async fn advance(&mut self) -> bool {
        (**self).advance().await
    }

    fn current(&self) -> Option<&Self::Item> {
        (**self).current()
    }

    fn take_current(&mut self) -> Option<Self::Item> {
        (**self).take_current()
    }

    async fn release(&mut self) -> Result<(), SequenceError> {
        (**self).release().await
    }

    fn last_error(&self) -> Option<SequenceError> {
        (**self).last_error()
    }
}
