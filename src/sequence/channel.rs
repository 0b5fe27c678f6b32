//! # Channel-backed sequence (`ChannelSeq`)
//!
//! [`ChannelSeq`] reads [`ValErr`] items from a [`tokio::sync::mpsc`] receiver.
//! An `Err` item is latched and terminal, a closed channel is a clean end.
//!
//! ## Rules
//! - Items after the first `Err` are never observed.
//! - Release closes the receiver and discards anything still queued; producers
//!   see their sends fail from then on.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{SequenceError, ValErr};
use crate::sequence::Sequence;

/// Sequence over the receiving half of a value-or-error channel.
pub struct ChannelSeq<T> {
    rx: mpsc::Receiver<ValErr<T>>,
    curr: Option<T>,
    err: Option<SequenceError>,
    done: bool,
}

/// Wraps a receiver of value-or-error items.
pub fn from_receiver<T>(rx: mpsc::Receiver<ValErr<T>>) -> ChannelSeq<T> {
    ChannelSeq {
        rx,
        curr: None,
        err: None,
        done: false,
    }
}

impl<T> ChannelSeq<T> {
    fn stop(&mut self) {
        self.done = true;
        self.curr = None;
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

#[async_trait]
impl<T: Send> Sequence for ChannelSeq<T> {
    type Item = T;

    async fn advance(&mut self) -> bool {
        self.curr = None;
        if self.done {
            return false;
        }

        match self.rx.recv().await {
            Some(Ok(item)) => {
                self.curr = Some(item);
                true
            }
            Some(Err(e)) => {
                self.err = Some(e);
                self.stop();
                false
            }
            None => {
                self.done = true;
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
        if !self.done {
            self.stop();
        }
        Ok(())
    }

    fn last_error(&self) -> Option<SequenceError> {
        self.err.clone()
    }
}
