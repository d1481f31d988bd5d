//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the in-memory store against simple models.

use std::collections::HashSet;
use std::time::Duration;

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use crate::cache::{CacheStore, Fingerprint};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_TTL: Option<Duration> = Some(Duration::from_secs(300));

// == Strategies ==
/// Generates fingerprints over a small set of paths and mtimes so that
/// operations collide often
fn fingerprint_strategy() -> impl Strategy<Value = Fingerprint> {
    ("[a-d]{1,3}", 0i64..4).prop_map(|(name, secs)| {
        Fingerprint::new(
            format!("/srv/{name}"),
            Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        )
    })
}

fn value_strategy() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 1..64).prop_map(Bytes::from)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: Fingerprint, value: Bytes },
    Get { key: Fingerprint },
    Remove { key: Fingerprint },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (fingerprint_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Put { key, value }),
        fingerprint_strategy().prop_map(|key| CacheOp::Get { key }),
        fingerprint_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hit/miss/write counters match what the caller observed
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;
        let mut expected_writes: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    store.put(key, value, TEST_TTL);
                    expected_writes += 1;
                }
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Remove { key } => {
                    store.remove(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.writes, expected_writes, "Writes mismatch");
        prop_assert_eq!(stats.total_entries, store.len(), "Total entries mismatch");
    }

    // The last value put for a fingerprint is the one returned
    #[test]
    fn prop_last_write_wins(
        key in fingerprint_strategy(),
        values in prop::collection::vec(value_strategy(), 1..8)
    ) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES);
        for value in &values {
            store.put(key.clone(), value.clone(), TEST_TTL);
        }

        prop_assert_eq!(store.get(&key), values.last().cloned());
        prop_assert_eq!(store.len(), 1);
    }

    // Size never exceeds the configured bound
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((fingerprint_strategy(), value_strategy()), 1..200)
    ) {
        let max_entries = 5;
        let mut store = CacheStore::new(max_entries);

        for (key, value) in entries {
            store.put(key, value, TEST_TTL);
            prop_assert!(store.len() <= max_entries, "Cache size {} exceeds max {}", store.len(), max_entries);
        }
    }

    // Filling to capacity and adding one more evicts exactly the oldest key
    #[test]
    fn prop_lru_eviction_order(
        initial in prop::collection::vec(fingerprint_strategy(), 3..10),
        new_key in fingerprint_strategy(),
        new_value in value_strategy()
    ) {
        let mut seen = HashSet::new();
        let unique: Vec<Fingerprint> = initial.into_iter().filter(|k| seen.insert(k.clone())).collect();

        prop_assume!(unique.len() >= 2);
        prop_assume!(!unique.contains(&new_key));

        let capacity = unique.len();
        let mut store = CacheStore::new(capacity);
        for key in &unique {
            store.put(key.clone(), Bytes::from(key.digest()), TEST_TTL);
        }

        store.put(new_key.clone(), new_value, TEST_TTL);

        prop_assert_eq!(store.len(), capacity);
        prop_assert!(store.get(&unique[0]).is_none(), "Oldest key should have been evicted");
        prop_assert!(store.get(&new_key).is_some());
        for key in unique.iter().skip(1) {
            prop_assert!(store.get(key).is_some(), "{} should still exist", key);
        }
    }
}
