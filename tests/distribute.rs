//! Distribute sessions through the public API.

use seqfan::{collect, distribute, from_iter, Partition, Sequence};

async fn open(d: &mut seqfan::Distributor<u32>, n: usize) -> Vec<Partition<u32>> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        assert!(d.advance().await);
        out.push(d.take_current().unwrap());
    }
    out
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_item_is_delivered_exactly_once() {
    let mut d = distribute(from_iter(0..1000u32), 16);
    let workers: Vec<_> = open(&mut d, 4)
        .await
        .into_iter()
        .map(|p| tokio::spawn(collect(p)))
        .collect();

    let mut all = Vec::new();
    for w in workers {
        let part = w.await.unwrap().unwrap();
        let mut sorted = part.clone();
        sorted.sort_unstable();
        assert_eq!(part, sorted, "partition order follows the source");
        all.extend(part);
    }
    all.sort_unstable();
    assert_eq!(all, (0..1000).collect::<Vec<_>>());
}

#[tokio::test]
async fn watermark_is_only_a_warning_threshold() {
    let mut d = distribute(from_iter(0..3u32), usize::MAX);
    let only = open(&mut d, 1).await.pop().unwrap();
    assert_eq!(collect(only).await.unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn partitions_ids_follow_creation_order() {
    let mut d = distribute(from_iter(0..3u32), 0);
    let parts = open(&mut d, 3).await;
    let ids: Vec<_> = parts.iter().map(|p| p.id()).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[tokio::test]
async fn late_partitions_join_the_rotation() {
    let mut d = distribute(from_iter(0..6u32), 0);
    let mut first = open(&mut d, 1).await.pop().unwrap();

    assert!(first.advance().await);
    assert_eq!(first.take_current(), Some(0));

    let second = open(&mut d, 1).await.pop().unwrap();
    let firsts = collect(first).await.unwrap();
    let seconds = collect(second).await.unwrap();
    assert_eq!(firsts, vec![2, 4]);
    assert_eq!(seconds, vec![1, 3, 5]);
}

#[tokio::test]
async fn releasing_the_distributor_keeps_partitions_alive() {
    let mut d = distribute(from_iter(0..4u32), 0);
    let parts = open(&mut d, 2).await;
    assert!(d.release().await.is_ok());

    let mut total = 0;
    for p in parts {
        total += collect(p).await.unwrap().len();
    }
    assert_eq!(total, 4);
}
