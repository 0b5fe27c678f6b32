//! Property tests for the sharing invariants.

use proptest::prelude::*;
use seqfan::{collect, distribute, from_iter, group_by, merge, mirror, Sequence};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn mirror_handles_all_see_the_source(
        items in proptest::collection::vec(any::<u16>(), 0..64),
        count in 1usize..5,
    ) {
        let out = runtime().block_on(async {
            let readers: Vec<_> = mirror(from_iter(items.clone()), count)
                .into_iter()
                .map(|h| tokio::spawn(collect(h)))
                .collect();
            let mut out = Vec::new();
            for r in readers {
                out.push(r.await.unwrap().unwrap());
            }
            out
        });
        prop_assert_eq!(out.len(), count);
        for seen in out {
            prop_assert_eq!(&seen, &items);
        }
    }

    #[test]
    fn distribute_partitions_interleave_back_to_the_source(
        items in proptest::collection::vec(any::<u16>(), 0..64),
        parts in 1usize..5,
    ) {
        let out = runtime().block_on(async {
            let mut d = distribute(from_iter(items.clone()), 0);
            let mut opened = Vec::new();
            for _ in 0..parts {
                assert!(d.advance().await);
                opened.push(d.take_current().unwrap());
            }
            let readers: Vec<_> = opened.into_iter().map(|p| tokio::spawn(collect(p))).collect();
            let mut out = Vec::new();
            for r in readers {
                out.push(r.await.unwrap().unwrap());
            }
            out
        });
        prop_assert_eq!(out.len(), parts);
        for (k, part) in out.iter().enumerate() {
            let expected: Vec<u16> = items.iter().copied().skip(k).step_by(parts).collect();
            prop_assert_eq!(part, &expected);
        }
    }

    #[test]
    fn groups_preserve_source_order_per_key(
        items in proptest::collection::vec(0u8..6, 0..64),
    ) {
        let groups = runtime().block_on(async {
            let mut groups = group_by(from_iter(items.clone()), |v: &u8| *v);
            let mut out = Vec::new();
            while groups.advance().await {
                out.push(collect(groups.take_current().unwrap()).await.unwrap());
            }
            out
        });

        let mut keys: Vec<u8> = Vec::new();
        for v in &items {
            if !keys.contains(v) {
                keys.push(*v);
            }
        }
        prop_assert_eq!(groups.len(), keys.len());
        for (key, group) in keys.iter().zip(&groups) {
            let expected: Vec<u8> = items.iter().copied().filter(|v| v == key).collect();
            prop_assert_eq!(group, &expected);
        }
    }

    #[test]
    fn merge_loses_nothing(
        sources in proptest::collection::vec(proptest::collection::vec(any::<u32>(), 0..16), 0..5),
    ) {
        let mut out = runtime().block_on(async {
            collect(merge(sources.iter().cloned().map(from_iter))).await.unwrap()
        });
        let mut expected: Vec<u32> = sources.into_iter().flatten().collect();
        out.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(out, expected);
    }
}
