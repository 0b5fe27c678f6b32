//! # Single-consumer helpers: `drain`, `collect`, `flatten`.
//!
//! These own the sequence they are given and always release it before returning
//! (or, for [`Flatten`], once each inner sequence is exhausted).
//!
//! ## Error precedence
//! ```text
//! source error  >  callback error  >  release error
//! ```

use async_trait::async_trait;

use crate::error::SequenceError;
use crate::sequence::Sequence;

/// Advances `seq` to exhaustion, calling `f(index, item)` for every item.
///
/// `f` returns `Ok(true)` to continue, `Ok(false)` to stop early or `Err` to
/// abort. The sequence is released in every case. Returns the number of items
/// handed to `f`.
pub async fn drain<S, F>(mut seq: S, mut f: F) -> Result<usize, SequenceError>
where
    S: Sequence,
    F: FnMut(usize, S::Item) -> Result<bool, SequenceError> + Send,
{
    let mut seen = 0usize;
    let mut failure = None;

    while seq.advance().await {
        let Some(item) = seq.take_current() else {
            continue;
        };
        let index = seen;
        seen += 1;
        match f(index, item) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    let source_err = seq.last_error();
    let released = seq.release().await;

    if let Some(e) = source_err.or(failure) {
        return Err(e);
    }
    released.map(|()| seen)
}

/// Drains `seq` into a vector.
///
/// # Example
/// ```
/// use seqfan::{collect, from_iter};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let items = collect(from_iter(1..=3)).await.unwrap();
/// assert_eq!(items, vec![1, 2, 3]);
/// # }
/// ```
pub async fn collect<S>(seq: S) -> Result<Vec<S::Item>, SequenceError>
where
    S: Sequence,
{
    let mut out = Vec::new();
    drain(seq, |_, item| {
        out.push(item);
        Ok(true)
    })
    .await?;
    Ok(out)
}

/// Concatenates a sequence of sequences, in outer order.
///
/// Each inner sequence is released as soon as it is exhausted. An error from an
/// inner sequence (or its release) ends the flattened sequence.
pub fn flatten<S>(outer: S) -> Flatten<S>
where
    S: Sequence,
    S::Item: Sequence,
{
    Flatten {
        outer,
        inner: None,
        curr: None,
        err: None,
        done: false,
        released: None,
    }
}

/// Sequence returned by [`flatten`].
pub struct Flatten<S>
where
    S: Sequence,
    S::Item: Sequence,
{
    outer: S,
    inner: Option<S::Item>,
    curr: Option<<S::Item as Sequence>::Item>,
    err: Option<SequenceError>,
    done: bool,
    released: Option<Result<(), SequenceError>>,
}

impl<S> Flatten<S>
where
    S: Sequence,
    S::Item: Sequence,
{
    fn fail(&mut self, e: SequenceError) {
        self.err.get_or_insert(e);
        self.done = true;
    }
}

#[async_trait]
impl<S> Sequence for Flatten<S>
where
    S: Sequence,
    S::Item: Sequence,
{
    type Item = <S::Item as Sequence>::Item;

    async fn advance(&mut self) -> bool {
        self.curr = None;
        while !self.done {
            if let Some(inner) = self.inner.as_mut() {
                if inner.advance().await {
                    self.curr = inner.take_current();
                    return true;
                }
                let inner_err = inner.last_error();
                let released = inner.release().await;
                self.inner = None;
                if let Some(e) = inner_err.or(released.err()) {
                    self.fail(e);
                    return false;
                }
            }

            if !self.outer.advance().await {
                self.done = true;
                if let Some(e) = self.outer.last_error() {
                    self.fail(e);
                }
                return false;
            }
            self.inner = self.outer.take_current();
        }
        false
    }

    fn current(&self) -> Option<&Self::Item> {
        self.curr.as_ref()
    }

    fn take_current(&mut self) -> Option<Self::Item> {
        self.curr.take()
    }

    async fn release(&mut self) -> Result<(), SequenceError> {
        if let Some(res) = &self.released {
            return res.clone();
        }
        self.done = true;
        self.curr = None;

        let inner_res = match self.inner.as_mut() {
            Some(inner) => inner.release().await,
            None => Ok(()),
        };
        self.inner = None;
        let outer_res = self.outer.release().await;

        let res = inner_res.and(outer_res);
        self.released = Some(res.clone());
        res
    }

    fn last_error(&self) -> Option<SequenceError> {
        self.err.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::{from_iter, from_results};

    #[tokio::test]
    async fn drain_stops_early_and_releases() {
        let released = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = released.clone();
        let seq = from_iter(0..100).on_release(move || {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        });

        let mut seen = Vec::new();
        let n = drain(seq, |i, item| {
            seen.push(item);
            Ok(i < 2)
        })
        .await
        .unwrap();

        assert_eq!(n, 3);
        assert_eq!(seen, vec![0, 1, 2]);
        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn collect_reports_source_error_over_release_error() {
        let seq = from_results(vec![Ok(1), Err(SequenceError::source("bad row"))])
            .on_release(|| Err(SequenceError::release("still open")));
        assert_eq!(
            collect(seq).await,
            Err(SequenceError::source("bad row"))
        );
    }

    #[tokio::test]
    async fn flatten_concatenates_in_outer_order() {
        let outer = from_iter(vec![from_iter(vec![1, 2]), from_iter(vec![]), from_iter(vec![3])]);
        assert_eq!(collect(flatten(outer)).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn flatten_stops_on_inner_error() {
        let outer = from_iter(vec![
            from_results(vec![Ok(1), Err(SequenceError::source("inner"))]),
            from_results(vec![Ok(2)]),
        ]);
        let mut flat = flatten(outer);
        assert!(flat.advance().await);
        assert_eq!(flat.take_current(), Some(1));
        assert!(!flat.advance().await);
        assert_eq!(flat.last_error(), Some(SequenceError::source("inner")));
        assert!(flat.release().await.is_ok());
    }
}
