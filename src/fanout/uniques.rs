//! # Uniques and duplicates on top of grouping.
//!
//! [`Distinct`] walks the [`Groups`] of a source one at a time. For each group
//! it reads the first item, checks whether a second one exists and releases the
//! group. Depending on the mode it keeps keys seen exactly once or keys seen
//! more than once, yielding the first item of each kept group.

use async_trait::async_trait;

use crate::error::SequenceError;
use crate::fanout::group::Groups;
use crate::sequence::Sequence;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Keep {
    Uniques,
    Duplicates,
}

/// Sequence returned by [`uniques`](crate::uniques) and [`duplicates`](crate::duplicates).
pub struct Distinct<T> {
    groups: Groups<T>,
    keep: Keep,
    curr: Option<T>,
    err: Option<SequenceError>,
    done: bool,
}

impl<T> Distinct<T> {
    pub(crate) fn new(groups: Groups<T>, keep: Keep) -> Self {
        Self {
            groups,
            keep,
            curr: None,
            err: None,
            done: false,
        }
    }
}

#[async_trait]
impl<T: Send> Sequence for Distinct<T> {
    type Item = T;

    async fn advance(&mut self) -> bool {
        self.curr = None;
        while !self.done {
            if !self.groups.advance().await {
                self.done = true;
                self.err = self.groups.last_error();
                return false;
            }
            let Some(mut group) = self.groups.take_current() else {
                continue;
            };

            let first = if group.advance().await {
                group.take_current()
            } else {
                None
            };
            let repeated = first.is_some() && group.advance().await;
            let mut failure = group.last_error();
            // The outer `Groups` is still open, so this never releases the source.
            if let Err(e) = group.release().await {
                failure.get_or_insert(e);
            }

            if let Some(e) = failure {
                self.done = true;
                self.err = Some(e);
                return false;
            }
            let kept = match self.keep {
                Keep::Uniques => !repeated,
                Keep::Duplicates => repeated,
            };
            if let (true, Some(item)) = (kept, first) {
                self.curr = Some(item);
                return true;
            }
        }
        false
    }

    fn current(&self) -> Option<&T> {
        self.curr.as_ref()
    }

    fn take_current(&mut self) -> Option<T> {
        self.curr.take()
    }

    async fn release(&mut self) -> Result<(), SequenceError> {
        self.done = true;
        self.curr = None;
        self.groups.release().await
    }

    fn last_error(&self) -> Option<SequenceError> {
        self.err.clone().or_else(|| self.groups.last_error())
    }
}
