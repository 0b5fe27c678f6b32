//! Merge sessions through the public API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use seqfan::{
    collect, from_iter, from_results, merge, BoxSequence, EventKind, Hub, HubConfig, Sequence,
    SequenceError,
};

/// A source whose `advance` never completes.
struct Stuck;

#[async_trait]
impl Sequence for Stuck {
    type Item = u32;

    async fn advance(&mut self) -> bool {
        std::future::pending::<()>().await;
        false
    }

    fn current(&self) -> Option<&u32> {
        None
    }

    fn take_current(&mut self) -> Option<u32> {
        None
    }

    async fn release(&mut self) -> Result<(), SequenceError> {
        Ok(())
    }

    fn last_error(&self) -> Option<SequenceError> {
        None
    }
}

fn flagged(items: Vec<u32>, flag: &Arc<AtomicBool>) -> BoxSequence<u32> {
    let flag = Arc::clone(flag);
    from_iter(items)
        .on_release(move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .boxed()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn all_items_arrive() {
    let sources: Vec<_> = (0..5u32).map(|i| from_iter(i * 100..i * 100 + 100)).collect();
    let mut out = collect(merge(sources)).await.unwrap();
    out.sort_unstable();
    assert_eq!(out, (0..500).collect::<Vec<_>>());
}

#[tokio::test]
async fn a_failure_cancels_and_releases_the_siblings() {
    let endless_released = Arc::new(AtomicBool::new(false));
    let failing_released = Arc::new(AtomicBool::new(false));

    let failing = {
        let flag = Arc::clone(&failing_released);
        from_results(vec![Ok(1u32), Err(SequenceError::source("broken pipe"))])
            .on_release(move || {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .boxed()
    };
    let endless = {
        let flag = Arc::clone(&endless_released);
        from_iter(std::iter::repeat(0u32))
            .on_release(move || {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .boxed()
    };

    let merged = merge(vec![failing, endless]);
    assert_eq!(collect(merged).await, Err(SequenceError::source("broken pipe")));
    assert!(failing_released.load(Ordering::SeqCst));
    assert!(endless_released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn early_release_releases_every_source() {
    let a = Arc::new(AtomicBool::new(false));
    let b = Arc::new(AtomicBool::new(false));
    let mut merged = merge(vec![flagged((0..1000).collect(), &a), flagged(vec![7; 1000], &b)]);

    assert!(merged.advance().await);
    assert!(merged.release().await.is_ok());
    assert!(!merged.advance().await);
    assert!(a.load(Ordering::SeqCst));
    assert!(b.load(Ordering::SeqCst));
    assert_eq!(merged.running(), 0);
}

#[tokio::test]
async fn stuck_sources_exceed_the_grace() {
    let hub = Hub::new(HubConfig {
        release_grace: Duration::from_millis(20),
        ..HubConfig::default()
    });
    let mut merged = hub.merge(vec![Stuck.boxed(), from_iter(vec![1u32]).boxed()]);

    assert!(merged.advance().await);
    assert_eq!(merged.take_current(), Some(1));
    let err = merged.release().await.unwrap_err();
    assert_eq!(
        err,
        SequenceError::GraceExceeded {
            grace: Duration::from_millis(20),
            stuck: 1
        }
    );
    assert_eq!(merged.release().await, Err(err));
}

#[tokio::test]
async fn cancellation_is_published() {
    let hub = Hub::default();
    let mut events = hub.subscribe();
    let merged = hub.merge(vec![
        from_results(vec![Err(SequenceError::source("nope"))]).boxed(),
        from_iter(std::iter::repeat(1u32)).boxed(),
    ]);
    assert!(collect(merged).await.is_err());

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    assert!(kinds.contains(&EventKind::MergeCancelled));
}
