//! Iteration over the table.
//!
//! Three flavors with different mutation contracts:
//! - [`Iter`]/[`IterMut`] borrow the table and walk the slot arena; the
//!   borrow checker rules out structural mutation for their lifetime.
//! - [`SafeIter`] holds no borrow between steps. It pauses rehashing
//!   for its whole lifetime, so bucket indices stay stable, and the
//!   caller may insert, look up, and remove the just-returned entry
//!   between `next` calls.
//! - [`RawIter`] pauses nothing and instead carries a structural
//!   fingerprint, re-checked on every step in debug builds to catch
//!   callers that mutated the table despite promising not to.

use crate::incr_hash_map::{Entry, IncrHashMap};
use slotmap::DefaultKey;

/// Borrowed iterator over `(&K, &V)` in arena order.
pub struct Iter<'a, K, V> {
    it: slotmap::basic::Iter<'a, DefaultKey, Entry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, e)| (&e.key, &e.value))
    }
}

/// Borrowed iterator over `(&K, &mut V)` in arena order.
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, DefaultKey, Entry<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, e)| (&e.key, &mut e.value))
    }
}

/// Shared bucket-order walk used by the detached iterators: forward
/// through generation 0's chains, then generation 1's while a rehash is
/// active. The successor is prefetched before an entry is yielded, so
/// removal of the yielded entry cannot strand the walk; a successor
/// removed behind our back shows up as a stale slot id and the walk
/// falls forward to the next bucket.
struct BucketWalk {
    table: usize,
    next_bucket: usize,
    next_entry: Option<DefaultKey>,
    done: bool,
}

impl BucketWalk {
    fn start() -> Self {
        BucketWalk {
            table: 0,
            next_bucket: 0,
            next_entry: None,
            done: false,
        }
    }

    fn advance<K, V, S>(&mut self, map: &IncrHashMap<K, V, S>) -> Option<DefaultKey> {
        if self.done {
            return None;
        }
        loop {
            if let Some(id) = self.next_entry.take() {
                if let Some(e) = map.slots.get(id) {
                    self.next_entry = e.next;
                    return Some(id);
                }
                // Stale successor; resume from the next bucket.
            }
            loop {
                if self.next_bucket >= map.tables[self.table].capacity() {
                    if self.table == 0 && map.is_rehashing() {
                        self.table = 1;
                        self.next_bucket = 0;
                        continue;
                    }
                    self.done = true;
                    return None;
                }
                let b = self.next_bucket;
                self.next_bucket += 1;
                if let Some(head) = map.tables[self.table].buckets[b] {
                    self.next_entry = Some(head);
                    break;
                }
            }
        }
    }
}

/// Detached iterator that keeps rehashing paused for its lifetime.
///
/// Created with [`IncrHashMap::safe_iter`]; the table is handed back at
/// every [`next`](SafeIter::next) call, and must be the same table the
/// iterator was created from. Call [`finish`](SafeIter::finish) when
/// done to release the pause; dropping the iterator without finishing
/// stalls resizing forever (reads and writes keep working).
///
/// Guarantee: every entry present for the iterator's entire lifetime is
/// yielded at least once. Entries added during iteration may or may not
/// be. Only the most recently yielded entry may be removed between
/// steps.
pub struct SafeIter {
    walk: BucketWalk,
}

/// Detached iterator for callers that promise not to mutate the table.
///
/// Cheaper than [`SafeIter`] (no pause bookkeeping, nothing to release)
/// but any structural mutation during its lifetime is a caller bug: a
/// fingerprint of the table's structure is captured at creation and
/// re-checked on every step in debug builds.
pub struct RawIter {
    walk: BucketWalk,
    fingerprint: u64,
}

impl<K, V, S> IncrHashMap<K, V, S> {
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.slots.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.slots.iter_mut(),
        }
    }

    pub fn safe_iter(&mut self) -> SafeIter {
        self.pause_rehash();
        SafeIter {
            walk: BucketWalk::start(),
        }
    }

    pub fn raw_iter(&self) -> RawIter {
        RawIter {
            walk: BucketWalk::start(),
            fingerprint: self.fingerprint(),
        }
    }
}

impl SafeIter {
    pub fn next<'a, K, V, S>(&mut self, map: &'a IncrHashMap<K, V, S>) -> Option<(&'a K, &'a V)> {
        let id = self.walk.advance(map)?;
        let e = &map.slots[id];
        Some((&e.key, &e.value))
    }

    /// Release the rehash pause taken at creation. Must be called on
    /// the map this iterator was created from.
    pub fn finish<K, V, S>(self, map: &mut IncrHashMap<K, V, S>) {
        map.resume_rehash();
    }
}

impl RawIter {
    pub fn next<'a, K, V, S>(&mut self, map: &'a IncrHashMap<K, V, S>) -> Option<(&'a K, &'a V)> {
        debug_assert_eq!(
            self.fingerprint,
            map.fingerprint(),
            "table structurally mutated during raw iteration"
        );
        let id = self.walk.advance(map)?;
        let e = &map.slots[id];
        Some((&e.key, &e.value))
    }
}
