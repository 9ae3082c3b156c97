//! Random sampling of entries.
//!
//! Three levels of fairness/cost: `random_entry` is O(1) expected but
//! uniform per bucket rather than per entry; `some_entries` harvests a
//! batch from a short forward walk at a random offset; and
//! `fair_random_entry` picks uniformly within such a batch, which
//! approximates uniform-per-entry probability at slightly higher cost.
//!
//! Callers supply the RNG, so deterministic tests can seed one.

use crate::incr_hash_map::IncrHashMap;
use rand::Rng;
use slotmap::DefaultKey;

/// Batch size `fair_random_entry` samples from.
const FAIR_SAMPLE_LEN: usize = 15;

impl<K, V, S> IncrHashMap<K, V, S> {
    /// A random entry, uniform per non-empty bucket and then uniform
    /// within that bucket's chain. Entries in long chains are therefore
    /// underweighted; use [`fair_random_entry`](Self::fair_random_entry)
    /// when per-entry fairness matters.
    pub fn random_entry<R>(&self, rng: &mut R) -> Option<(&K, &V)>
    where
        R: Rng + ?Sized,
    {
        let id = self.random_slot(rng)?;
        let e = &self.slots[id];
        Some((&e.key, &e.value))
    }

    fn random_slot<R>(&self, rng: &mut R) -> Option<DefaultKey>
    where
        R: Rng + ?Sized,
    {
        if self.is_empty() {
            return None;
        }
        let head = loop {
            // While rehashing, generation 0's buckets below the cursor
            // are empty by construction; draw from the rest of both
            // generations so migrated entries stay reachable.
            let (t, b) = match self.rehash_cursor {
                Some(migrated) => {
                    let cap0 = self.tables[0].capacity();
                    let total = cap0 + self.tables[1].capacity();
                    let r = migrated + rng.random_range(0..total - migrated);
                    if r >= cap0 {
                        (1, r - cap0)
                    } else {
                        (0, r)
                    }
                }
                None => (0, rng.random_range(0..self.tables[0].capacity())),
            };
            if let Some(head) = self.tables[t].buckets[b] {
                break head;
            }
        };
        let mut chain_len = 0;
        let mut cur = Some(head);
        while let Some(id) = cur {
            chain_len += 1;
            cur = self.slots[id].next;
        }
        let pick = rng.random_range(0..chain_len);
        let mut cur = Some(head);
        let mut at = 0;
        while let Some(id) = cur {
            if at == pick {
                return Some(id);
            }
            at += 1;
            cur = self.slots[id].next;
        }
        None
    }

    /// Up to `count` entries gathered by walking buckets forward from a
    /// random starting index across both live generations. The walk is
    /// bounded (ten visited buckets per requested entry) and re-seeds
    /// its position after runs of empty buckets, so it stays cheap on
    /// sparse tables; it may return fewer entries than requested. The
    /// batch is not uniformly distributed; it is a building block for
    /// fair sampling and sampling-based statistics.
    pub fn some_entries<R>(&self, rng: &mut R, count: usize) -> Vec<(&K, &V)>
    where
        R: Rng + ?Sized,
    {
        let want = count.min(self.len());
        let mut out = Vec::with_capacity(want);
        if want == 0 {
            return out;
        }
        let tables = if self.is_rehashing() { 2 } else { 1 };
        let max_mask = if tables == 2 {
            self.tables[0].mask().max(self.tables[1].mask())
        } else {
            self.tables[0].mask()
        };
        let migrated = self.rehash_cursor.unwrap_or(0);
        let mut i = rng.random_range(0..=max_mask);
        let mut empty_run = 0usize;
        let mut steps = want * 10;
        'outer: while out.len() < want && steps > 0 {
            steps -= 1;
            for t in 0..tables {
                // Generation 0 below the cursor is empty; jump the walk
                // to the cursor when the index is out of the smaller
                // generation's range too.
                if tables == 2 && t == 0 && i < migrated {
                    if i >= self.tables[1].capacity() {
                        i = migrated;
                    } else {
                        continue;
                    }
                }
                if i >= self.tables[t].capacity() {
                    continue;
                }
                let mut cur = self.tables[t].buckets[i];
                if cur.is_none() {
                    empty_run += 1;
                    if empty_run >= 5 && empty_run > count {
                        i = rng.random_range(0..=max_mask);
                        empty_run = 0;
                    }
                } else {
                    empty_run = 0;
                    while let Some(id) = cur {
                        let e = &self.slots[id];
                        out.push((&e.key, &e.value));
                        if out.len() == want {
                            break 'outer;
                        }
                        cur = e.next;
                    }
                }
            }
            i = (i + 1) & max_mask;
        }
        out
    }

    /// A random entry with approximately uniform per-entry probability:
    /// harvests a small batch via [`some_entries`](Self::some_entries)
    /// and picks uniformly within it, falling back to
    /// [`random_entry`](Self::random_entry) when the walk comes back
    /// empty.
    pub fn fair_random_entry<R>(&self, rng: &mut R) -> Option<(&K, &V)>
    where
        R: Rng + ?Sized,
    {
        let batch = self.some_entries(rng, FAIR_SAMPLE_LEN);
        if batch.is_empty() {
            return self.random_entry(rng);
        }
        Some(batch[rng.random_range(0..batch.len())])
    }
}
