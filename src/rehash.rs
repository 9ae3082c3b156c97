//! The incremental resize state machine.
//!
//! A resize allocates generation 1 at the target capacity and sets the
//! rehash cursor to 0; from then on each step drains one generation-0
//! bucket, relinking its chain into generation 1 by cached hash. When
//! generation 0 is empty, generation 1 is promoted and the cursor
//! clears. Steps ride along with normal traffic (one bounded step per
//! mutating or advancing call) or run in explicit time-boxed bursts.
//!
//! Entries never call back into user code here: bucket targets come
//! from the hash cached at insert time.

use crate::incr_hash_map::{IncrHashMap, ResizeMode, Table};
use core::mem;
use std::time::{Duration, Instant};

impl<K, V, S> IncrHashMap<K, V, S> {
    /// Migrate one generation-0 bucket, skipping at most
    /// `max_empty_visits` empty buckets first (a bound on wasted work
    /// for sparse tables; values below 1 are treated as 1). Returns
    /// whether a rehash is still in progress afterwards.
    ///
    /// A no-op while the pause counter is held or the resize mode is
    /// [`ResizeMode::Forbid`].
    pub fn rehash_step(&mut self, max_empty_visits: usize) -> bool {
        if self.pause_rehash > 0 || self.resize_mode == ResizeMode::Forbid {
            return self.is_rehashing();
        }
        let Some(mut cursor) = self.rehash_cursor else {
            return false;
        };
        if self.tables[0].used > 0 {
            let mut remaining = max_empty_visits.max(1);
            loop {
                debug_assert!(
                    cursor < self.tables[0].capacity(),
                    "rehash cursor ran past a non-empty generation"
                );
                if self.tables[0].buckets[cursor].is_some() {
                    break;
                }
                cursor += 1;
                remaining -= 1;
                if remaining == 0 {
                    self.rehash_cursor = Some(cursor);
                    return true;
                }
            }
            // Relink the whole chain, head-first, one entry at a time.
            // Counts move with each entry so size is conserved at every
            // intermediate point.
            let mut cur = self.tables[0].buckets[cursor].take();
            while let Some(id) = cur {
                let (hash, next) = {
                    let e = &self.slots[id];
                    (e.hash, e.next)
                };
                let b = (hash as usize) & self.tables[1].mask();
                self.slots[id].next = self.tables[1].buckets[b];
                self.tables[1].buckets[b] = Some(id);
                self.tables[0].used -= 1;
                self.tables[1].used += 1;
                cur = next;
            }
            cursor += 1;
            self.rehash_cursor = Some(cursor);
        }
        if self.tables[0].used == 0 {
            self.tables[0] = mem::replace(&mut self.tables[1], Table::vacant());
            self.rehash_cursor = None;
            return false;
        }
        true
    }

    /// Migrate up to `n` buckets. Returns whether a rehash is still in
    /// progress afterwards.
    pub fn rehash(&mut self, n: usize) -> bool {
        for _ in 0..n {
            if !self.rehash_step(10) {
                return false;
            }
        }
        self.is_rehashing()
    }

    /// Time-boxed burst: migrate buckets in batches of 100 until the
    /// budget elapses or the rehash completes. Returns the number of
    /// buckets attempted. Intended for idle-time maintenance so a
    /// rehash is not left perpetually amortized.
    pub fn rehash_for(&mut self, budget: Duration) -> usize {
        if self.pause_rehash > 0
            || self.resize_mode == ResizeMode::Forbid
            || !self.is_rehashing()
        {
            return 0;
        }
        let start = Instant::now();
        let mut attempted = 0;
        loop {
            let more = self.rehash(100);
            attempted += 100;
            if !more || start.elapsed() >= budget {
                return attempted;
            }
        }
    }

    /// Block rehash progress until a matching
    /// [`resume_rehash`](Self::resume_rehash). Holders keep bucket
    /// indices stable without blocking reads or writes; the pairing is
    /// cooperative, and a missing resume stalls resizing forever.
    pub fn pause_rehash(&mut self) {
        self.pause_rehash += 1;
    }

    pub fn resume_rehash(&mut self) {
        debug_assert!(self.pause_rehash > 0, "resume_rehash without matching pause");
        self.pause_rehash -= 1;
    }

    /// One bounded step on behalf of an unrelated operation.
    pub(crate) fn rehash_step_piggyback(&mut self) {
        if self.pause_rehash == 0 && self.is_rehashing() {
            self.rehash_step(10);
        }
    }
}
