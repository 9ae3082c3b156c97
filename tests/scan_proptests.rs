// IncrHashMap scan cursor property tests.
//
// Property 1: stable-key coverage under churn.
//  - Model: a fixed set of "stable" keys plus a script of interleaved
//    inserts, removals, and explicit rehash steps applied between scan
//    calls. Stable keys are never touched by the script.
//  - Invariant: a full 0 -> 0 scan sequence reports every stable key at
//    least once, regardless of how many grows and shrinks the churn
//    forces mid-sequence.
//
// Property 2: quiescent exactness.
//  - Invariant: with no mutation between calls, a full scan sequence
//    reports exactly the live key set (duplicates allowed only across
//    resize boundaries, of which there are none here).
use incr_hashmap::IncrHashMap;
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Clone, Debug)]
enum Churn {
    Insert(u8),
    Remove(u8),
    Steps(u8),
}

fn arb_churn() -> impl Strategy<Value = Vec<Churn>> {
    let op = prop_oneof![
        3 => any::<u8>().prop_map(Churn::Insert),
        2 => any::<u8>().prop_map(Churn::Remove),
        2 => (0u8..8).prop_map(Churn::Steps),
    ];
    proptest::collection::vec(op, 0..200)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_scan_covers_stable_keys_under_churn(
        stable in 1u32..80,
        churn in arb_churn(),
    ) {
        let mut m = IncrHashMap::new();
        for i in 0..stable {
            m.insert(i, i).unwrap();
        }
        // Churn keys live in a disjoint range above the stable ones.
        let base = 1000u32;

        let mut seen = BTreeSet::new();
        let mut cursor = 0;
        let mut script = churn.into_iter();
        let mut rounds = 0;
        loop {
            cursor = m.scan(cursor, |k, _| {
                seen.insert(*k);
            });
            for _ in 0..3 {
                match script.next() {
                    Some(Churn::Insert(x)) => {
                        let _ = m.insert(base + x as u32, 0);
                    }
                    Some(Churn::Remove(x)) => {
                        m.remove(&(base + x as u32));
                    }
                    Some(Churn::Steps(n)) => {
                        for _ in 0..n {
                            m.rehash_step(10);
                        }
                    }
                    None => {}
                }
            }
            rounds += 1;
            prop_assert!(rounds < 100_000, "scan failed to terminate");
            if cursor == 0 {
                break;
            }
        }
        for i in 0..stable {
            prop_assert!(seen.contains(&i), "stable key {} missed", i);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_quiescent_scan_is_exact(keys in proptest::collection::btree_set(any::<u32>(), 0..200)) {
        let mut m = IncrHashMap::new();
        for &k in &keys {
            m.insert(k, k).unwrap();
        }
        while m.is_rehashing() {
            m.rehash_step(10);
        }
        let mut seen = BTreeSet::new();
        let mut count = 0usize;
        let mut cursor = 0;
        loop {
            cursor = m.scan(cursor, |k, _| {
                seen.insert(*k);
                count += 1;
            });
            if cursor == 0 {
                break;
            }
        }
        prop_assert_eq!(&seen, &keys);
        prop_assert_eq!(count, keys.len(), "quiescent scan repeated an entry");
    }
}
