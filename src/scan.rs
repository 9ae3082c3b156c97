//! Resumable full-table traversal driven by an opaque cursor.
//!
//! The cursor counts in reverse bit order: after visiting a bucket the
//! cursor's masked bits are set, the value is bit-reversed,
//! incremented, and reversed back. Because capacities are powers of
//! two, a bucket index under a smaller mask designates exactly the set
//! of buckets that expand from it under any larger mask, so a cursor
//! taken against one capacity still means something after the table
//! grows or shrinks: buckets already visited never reappear under the
//! new mask, and unvisited ones are still reachable. While a rehash is
//! active, one call covers the smaller generation's bucket plus all of
//! its expansions in the larger generation, so an entry cannot hide by
//! migrating between calls.

use crate::incr_hash_map::IncrHashMap;

impl<K, V, S> IncrHashMap<K, V, S> {
    /// Visit every entry in the bucket(s) designated by `cursor` and
    /// return the cursor for the next call. A full scan starts at 0 and
    /// is complete when 0 comes back.
    ///
    /// Guarantee: entries present from the start of a full scan
    /// sequence to its end are visited at least once, no matter how
    /// many resizes happen between calls. Entries added or removed
    /// mid-sequence may or may not be visited. Entries may be reported
    /// more than once across calls when resizes intervene.
    pub fn scan<F>(&self, cursor: u64, mut visit: F) -> u64
    where
        F: FnMut(&K, &V),
    {
        if self.is_empty() {
            return 0;
        }
        let mut v = cursor;
        if !self.is_rehashing() {
            let mask = self.tables[0].mask() as u64;
            self.scan_bucket(0, (v & mask) as usize, &mut visit);
            v |= !mask;
            v = v.reverse_bits().wrapping_add(1).reverse_bits();
        } else {
            let (small, large) = if self.tables[0].capacity() <= self.tables[1].capacity() {
                (0, 1)
            } else {
                (1, 0)
            };
            let small_mask = self.tables[small].mask() as u64;
            let large_mask = self.tables[large].mask() as u64;
            self.scan_bucket(small, (v & small_mask) as usize, &mut visit);
            // All expansions of the small bucket under the larger mask.
            loop {
                self.scan_bucket(large, (v & large_mask) as usize, &mut visit);
                v |= !large_mask;
                v = v.reverse_bits().wrapping_add(1).reverse_bits();
                if v & (small_mask ^ large_mask) == 0 {
                    break;
                }
            }
        }
        v
    }

    fn scan_bucket<F>(&self, t: usize, b: usize, visit: &mut F)
    where
        F: FnMut(&K, &V),
    {
        let mut cur = self.tables[t].buckets[b];
        while let Some(id) = cur {
            let e = &self.slots[id];
            visit(&e.key, &e.value);
            cur = e.next;
        }
    }
}
