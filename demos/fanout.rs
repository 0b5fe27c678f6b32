//! # Example: fanout
//!
//! Demonstrates the four sharing sessions on one hub with the built-in
//! [`LogWriter`] attached.
//!
//! Shows how to:
//! - Mirror one source to several concurrent readers.
//! - Distribute work round-robin across partitions.
//! - Group items by key and read each group.
//! - Merge several sources and release the merged sequence.
//!
//! ## Flow
//! ```text
//! Hub::builder(cfg).with_subscribers([LogWriter]).build()
//!     ├─► mirror(words, 2)      ──► 2 tasks, each collects every word
//!     ├─► distribute(0..9, 2)   ──► 3 partitions, round-robin
//!     ├─► group_by(words, len)  ──► one Group per word length
//!     └─► merge([a, b, c])      ──► one interleaved sequence
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example fanout --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use seqfan::{collect, from_iter, Hub, HubConfig, LogWriter, Sequence, SequenceError, Subscribe};

const WORDS: [&str; 7] = ["ant", "bee", "wasp", "moth", "fly", "beetle", "gnat"];

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), SequenceError> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let hub = Hub::builder(HubConfig::default())
        .with_subscribers(subs)
        .build();

    // === Mirror ===
    let readers: Vec<_> = hub
        .mirror(from_iter(WORDS), 2)
        .into_iter()
        .map(|h| tokio::spawn(collect(h)))
        .collect();
    for (i, reader) in readers.into_iter().enumerate() {
        let words = reader.await.map_err(|e| SequenceError::source(e.to_string()))??;
        println!("mirror reader {i}: {words:?}");
    }

    // === Distribute ===
    let mut partitions = hub.distribute(from_iter(0..9), 2);
    let mut workers = Vec::new();
    for _ in 0..3 {
        if !partitions.advance().await {
            break;
        }
        if let Some(p) = partitions.take_current() {
            let id = p.id();
            workers.push(tokio::spawn(async move { (id, collect(p).await) }));
        }
    }
    partitions.release().await?;
    for worker in workers {
        let (id, items) = worker.await.map_err(|e| SequenceError::source(e.to_string()))?;
        println!("partition {id}: {:?}", items?);
    }

    // === Group ===
    let mut groups = hub.group_by(from_iter(WORDS), |w: &&str| w.len());
    while groups.advance().await {
        if let Some(group) = groups.take_current() {
            let id = group.id();
            println!("group {id}: {:?}", collect(group).await?);
        }
    }
    groups.release().await?;

    // === Merge ===
    let merged = hub.merge(vec![from_iter(0..3), from_iter(10..13), from_iter(20..23)]);
    println!("merged: {:?}", collect(merged).await?);

    // Let the subscriber drain its queue before exiting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
