#![cfg(test)]

// Property tests for IncrHashMap kept inside the crate so they can
// drive internals (explicit rehash stepping, pause/resume) without
// feature gates.

use crate::{IncrHashMap, InsertError, ResizeMode};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations to improve shrinking: indices shrink to
// earlier keys, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Replace(usize, i32),
    OrInsert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(usize),
    Reserve(u16),
    RehashSteps(u8),
    PausedSteps(u8),
    SetMode(u8),
    Iterate,
    ScanAll,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=10).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Replace(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::OrInsert(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Get),
            2 => idx.clone().prop_map(OpI::Contains),
            1 => (0u16..512).prop_map(OpI::Reserve),
            2 => any::<u8>().prop_map(OpI::RehashSteps),
            1 => any::<u8>().prop_map(OpI::PausedSteps),
            1 => (0u8..3).prop_map(OpI::SetMode),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::ScanAll),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_scenario<S>(sut: &mut IncrHashMap<String, i32, S>, pool: &[String], ops: Vec<OpI>)
where
    S: BuildHasher,
{
    let mut model: HashMap<String, i32> = HashMap::new();
    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = pool[i].clone();
                let already = model.contains_key(&k);
                match sut.insert(k.clone(), v) {
                    Ok(()) => {
                        assert!(!already, "insert must fail on duplicate");
                        model.insert(k, v);
                    }
                    Err(InsertError::DuplicateKey) => {
                        assert!(already, "duplicate error only when key exists");
                    }
                }
            }
            OpI::Replace(i, v) => {
                let k = pool[i].clone();
                let old = sut.replace(k.clone(), v);
                assert_eq!(old, model.insert(k, v));
            }
            OpI::OrInsert(i, v) => {
                let k = pool[i].clone();
                let got = *sut.or_insert_with(k.clone(), || v);
                let expect = *model.entry(k).or_insert(v);
                assert_eq!(got, expect);
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                assert_eq!(sut.remove(k.as_str()), model.remove(k));
            }
            OpI::Get(i) => {
                let k = &pool[i];
                assert_eq!(sut.get(k.as_str()), model.get(k));
                assert_eq!(sut.peek(k.as_str()), model.get(k));
            }
            OpI::Contains(i) => {
                let k = &pool[i];
                assert_eq!(sut.contains_key(k.as_str()), model.contains_key(k));
            }
            OpI::Reserve(n) => {
                sut.reserve(n as usize);
            }
            OpI::RehashSteps(n) => {
                for _ in 0..n {
                    sut.rehash_step(10);
                }
            }
            OpI::PausedSteps(n) => {
                sut.pause_rehash();
                let cursor = sut.rehash_cursor();
                for _ in 0..n {
                    sut.rehash_step(10);
                }
                assert_eq!(sut.rehash_cursor(), cursor, "paused steps must not advance");
                sut.resume_rehash();
            }
            OpI::SetMode(m) => {
                sut.set_resize_mode(match m {
                    0 => ResizeMode::Enable,
                    1 => ResizeMode::Avoid,
                    _ => ResizeMode::Forbid,
                });
            }
            OpI::Iterate => {
                let got: BTreeSet<String> = sut.iter().map(|(k, _)| k.clone()).collect();
                let expect: BTreeSet<String> = model.keys().cloned().collect();
                assert_eq!(got, expect);
            }
            OpI::ScanAll => {
                // A full scan with no interleaved mutation must report
                // exactly the model's key set.
                let mut got = BTreeSet::new();
                let mut cursor = 0;
                loop {
                    cursor = sut.scan(cursor, |k, _| {
                        got.insert(k.clone());
                    });
                    if cursor == 0 {
                        break;
                    }
                }
                let expect: BTreeSet<String> = model.keys().cloned().collect();
                assert_eq!(got, expect);
            }
        }

        // Post-conditions after each op.
        assert_eq!(sut.len(), model.len());
        assert_eq!(sut.is_empty(), model.is_empty());
        if sut.is_rehashing() {
            assert!(sut.rehash_cursor().is_some());
        } else {
            assert_eq!(sut.rehash_cursor(), None);
        }
    }

    // Final sweep: every model key resolves, nothing extra survives.
    for (k, v) in &model {
        assert_eq!(sut.peek(k.as_str()), Some(v));
    }
    assert_eq!(sut.iter().count(), model.len());
}

// Property: state-machine equivalence against std::collections::HashMap
// across random op sequences, with rehashing driven explicitly and
// implicitly at arbitrary points.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let mut sut: IncrHashMap<String, i32> = IncrHashMap::new();
        run_scenario(&mut sut, &pool, ops);
    }
}

// Collision variant: a constant hasher forces every key into a single
// chain, stressing chain relinking during rehash steps and equality
// probing on lookup.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let mut sut: IncrHashMap<String, i32, ConstBuildHasher> =
            IncrHashMap::with_hasher(ConstBuildHasher);
        run_scenario(&mut sut, &pool, ops);
    }
}
