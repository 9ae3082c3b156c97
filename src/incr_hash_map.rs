//! Core table: the slot arena, the two bucket generations, and the
//! CRUD operations. The rehash engine, iterators, scan cursor, sampling
//! and stats live in sibling modules but operate on these fields.

use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::mem;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Capacity every table starts at and never shrinks below.
pub(crate) const INITIAL_CAPACITY: usize = 4;

/// In `Avoid` mode growth still happens once the load factor passes this.
const FORCE_RESIZE_RATIO: usize = 5;

/// Shrink when fewer than this percentage of buckets are filled.
const SHRINK_FILL_PERCENT: usize = 10;

/// One key/value pair plus its chain link. The cached hash means
/// `K: Hash` never runs again after insertion; rehashing and lookups
/// compare the cached value first and fall back to `K: Eq` only on a
/// 64-bit match.
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
    pub(crate) next: Option<DefaultKey>,
}

/// One bucket-array generation. Length is zero (vacant) or a power of
/// two; `used` counts entries currently chained in this generation.
pub(crate) struct Table {
    pub(crate) buckets: Vec<Option<DefaultKey>>,
    pub(crate) used: usize,
}

impl Table {
    pub(crate) fn vacant() -> Self {
        Table {
            buckets: Vec::new(),
            used: 0,
        }
    }

    pub(crate) fn with_capacity(cap: usize) -> Self {
        debug_assert!(cap.is_power_of_two());
        Table {
            buckets: vec![None; cap],
            used: 0,
        }
    }

    fn try_with_capacity(cap: usize) -> Result<Self, ReserveError> {
        debug_assert!(cap.is_power_of_two());
        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(cap)
            .map_err(|_| ReserveError::CapacityExhausted)?;
        buckets.resize_with(cap, || None);
        Ok(Table { buckets, used: 0 })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Callers must ensure the table is non-vacant.
    pub(crate) fn mask(&self) -> usize {
        self.buckets.len() - 1
    }
}

/// Smallest power of two holding `n` entries at load factor 1, floored
/// at the initial capacity.
fn target_capacity(n: usize) -> usize {
    n.max(INITIAL_CAPACITY).next_power_of_two()
}

/// Whether the table may allocate a larger (or smaller) generation on
/// its own. `Avoid` defers growth until the load factor becomes
/// pathological; `Forbid` also stops in-flight rehash steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    Enable,
    Avoid,
    Forbid,
}

#[derive(Debug, PartialEq, Eq)]
pub enum InsertError {
    DuplicateKey,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReserveError {
    CapacityExhausted,
}

pub struct IncrHashMap<K, V, S = RandomState> {
    pub(crate) hasher: S,
    pub(crate) slots: SlotMap<DefaultKey, Entry<K, V>>,
    pub(crate) tables: [Table; 2],
    /// `None` while idle; otherwise the next generation-0 bucket to
    /// migrate. Non-`None` iff `tables[1]` is non-vacant.
    pub(crate) rehash_cursor: Option<usize>,
    /// Rehash steps are a no-op while this is positive.
    pub(crate) pause_rehash: isize,
    pub(crate) resize_mode: ResizeMode,
    /// Owner veto on allocating a new generation: `(extra_bytes,
    /// used_ratio) -> allowed`.
    pub(crate) expand_allowed: Option<Box<dyn Fn(usize, f64) -> bool>>,
    pub(crate) reentrancy: DebugReentrancy,
}

impl<K, V> IncrHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn with_capacity(n: usize) -> Self {
        Self::with_capacity_and_hasher(n, Default::default())
    }
}

impl<K, V> Default for IncrHashMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> IncrHashMap<K, V, S> {
    /// Logical size: entries across both generations.
    pub fn len(&self) -> usize {
        self.tables[0].used + self.tables[1].used
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bucket count across both generations. While idle this is
    /// just generation 0's capacity.
    pub fn capacity(&self) -> usize {
        self.tables[0].capacity() + self.tables[1].capacity()
    }

    pub fn is_rehashing(&self) -> bool {
        self.rehash_cursor.is_some()
    }

    /// Diagnostic: the next generation-0 bucket the rehash engine will
    /// migrate, or `None` while idle.
    pub fn rehash_cursor(&self) -> Option<usize> {
        self.rehash_cursor
    }

    pub fn resize_mode(&self) -> ResizeMode {
        self.resize_mode
    }

    pub fn set_resize_mode(&mut self, mode: ResizeMode) {
        self.resize_mode = mode;
    }

    /// Install an owner veto consulted before any grow or shrink
    /// commits. Receives the extra bytes the new generation would cost
    /// and the current fill ratio of generation 0.
    pub fn set_expand_allowed<F>(&mut self, hook: F)
    where
        F: Fn(usize, f64) -> bool + 'static,
    {
        self.expand_allowed = Some(Box::new(hook));
    }

    pub fn clear_expand_allowed(&mut self) {
        self.expand_allowed = None;
    }

    /// Drop every entry and reset to the initial capacity. Also clears
    /// any in-flight rehash and the pause counter.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.tables[0] = Table::with_capacity(INITIAL_CAPACITY);
        self.tables[1] = Table::vacant();
        self.rehash_cursor = None;
        self.pause_rehash = 0;
    }

    /// Structural checksum over both generations' shapes and the rehash
    /// cursor. Any resize, rehash progress, insert, or removal changes
    /// it; in-place value mutation does not.
    pub(crate) fn fingerprint(&self) -> u64 {
        let parts = [
            self.tables[0].capacity() as u64,
            self.tables[0].used as u64,
            self.tables[1].capacity() as u64,
            self.tables[1].used as u64,
            self.rehash_cursor.map_or(u64::MAX, |c| c as u64),
        ];
        let mut acc = 0u64;
        for p in parts {
            acc = mix64(acc.wrapping_add(p));
        }
        acc
    }
}

/// Tomas Wang 64-bit integer mix.
fn mix64(mut k: u64) -> u64 {
    k = (!k).wrapping_add(k << 21);
    k ^= k >> 24;
    k = k.wrapping_add(k << 3).wrapping_add(k << 8);
    k ^= k >> 14;
    k = k.wrapping_add(k << 2).wrapping_add(k << 4);
    k ^= k >> 28;
    k.wrapping_add(k << 31)
}

impl<K, V, S> IncrHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(INITIAL_CAPACITY, hasher)
    }

    pub fn with_capacity_and_hasher(n: usize, hasher: S) -> Self {
        IncrHashMap {
            hasher,
            slots: SlotMap::with_key(),
            tables: [Table::with_capacity(target_capacity(n)), Table::vacant()],
            rehash_cursor: None,
            pause_rehash: 0,
            resize_mode: ResizeMode::Enable,
            expand_allowed: None,
            reentrancy: DebugReentrancy::new(),
        }
    }

    fn hash_of<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        // User Hash runs here; guard against reentry while probing.
        let _g = self.reentrancy.enter();
        self.hasher.hash_one(q)
    }

    /// Probe generation 0's bucket, then generation 1's while a rehash
    /// is active. An entry not yet migrated still lives in generation 0;
    /// a migrated one lives only in generation 1.
    pub(crate) fn find_slot<Q>(&self, hash: u64, q: &Q) -> Option<(usize, DefaultKey)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let _g = self.reentrancy.enter();
        for t in 0..2 {
            if self.tables[t].capacity() == 0 {
                break;
            }
            let b = (hash as usize) & self.tables[t].mask();
            let mut cur = self.tables[t].buckets[b];
            while let Some(id) = cur {
                let e = &self.slots[id];
                if e.hash == hash && e.key.borrow() == q {
                    return Some((t, id));
                }
                cur = e.next;
            }
            if !self.is_rehashing() {
                break;
            }
        }
        None
    }

    /// Detach the entry for `q` from whichever generation holds it and
    /// decrement that generation's count. The slot itself still holds
    /// the entry; the caller removes it from the arena.
    fn unlink_slot<Q>(&mut self, hash: u64, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let _g = self.reentrancy.enter();
        for t in 0..2 {
            if self.tables[t].capacity() == 0 {
                break;
            }
            let b = (hash as usize) & self.tables[t].mask();
            let mut prev: Option<DefaultKey> = None;
            let mut cur = self.tables[t].buckets[b];
            while let Some(id) = cur {
                let (ehash, next) = {
                    let e = &self.slots[id];
                    (e.hash, e.next)
                };
                if ehash == hash && self.slots[id].key.borrow() == q {
                    match prev {
                        None => self.tables[t].buckets[b] = next,
                        Some(p) => self.slots[p].next = next,
                    }
                    self.slots[id].next = None;
                    self.tables[t].used -= 1;
                    return Some(id);
                }
                prev = Some(id);
                cur = next;
            }
            if self.rehash_cursor.is_none() {
                break;
            }
        }
        None
    }

    /// Chain a fresh entry at the head of its bucket in the generation
    /// currently receiving writes (generation 1 while rehashing).
    fn link_new(&mut self, key: K, hash: u64, value: V) -> DefaultKey {
        let t = if self.is_rehashing() { 1 } else { 0 };
        let b = (hash as usize) & self.tables[t].mask();
        let next = self.tables[t].buckets[b];
        let id = self.slots.insert(Entry {
            key,
            value,
            hash,
            next,
        });
        self.tables[t].buckets[b] = Some(id);
        self.tables[t].used += 1;
        id
    }

    fn expand_allowed_for(&self, n: usize) -> bool {
        let Some(hook) = &self.expand_allowed else {
            return true;
        };
        let target = target_capacity(n);
        let extra_bytes = target * mem::size_of::<Option<DefaultKey>>()
            + n * mem::size_of::<Entry<K, V>>();
        let used_ratio = self.tables[0].used as f64 / self.tables[0].capacity() as f64;
        hook(extra_bytes, used_ratio)
    }

    /// Put a generation sized for `n` entries in place: directly as
    /// generation 0 when the table is empty (bulk-load path), otherwise
    /// as generation 1, beginning an incremental rehash.
    fn install_table(&mut self, table: Table) {
        debug_assert!(!self.is_rehashing());
        if self.tables[0].used == 0 {
            self.tables[0] = table;
        } else {
            self.tables[1] = table;
            self.rehash_cursor = Some(0);
        }
    }

    fn resize_to(&mut self, n: usize) {
        let target = target_capacity(n);
        if target == self.tables[0].capacity() {
            return;
        }
        self.install_table(Table::with_capacity(target));
    }

    /// Growth check run on every insert path. Only generation 0 counts:
    /// while a rehash is active the table is already resizing.
    fn expand_if_needed(&mut self) {
        if self.is_rehashing() {
            return;
        }
        let cap = self.tables[0].capacity();
        let used = self.tables[0].used;
        let needs = match self.resize_mode {
            ResizeMode::Enable => used >= cap,
            ResizeMode::Avoid => used / cap > FORCE_RESIZE_RATIO,
            ResizeMode::Forbid => false,
        };
        if needs && self.expand_allowed_for(used + 1) {
            self.resize_to(used + 1);
        }
    }

    /// Shrink check run after every removal. A veto or a non-`Enable`
    /// mode leaves the table oversized but otherwise unaffected.
    fn shrink_if_needed(&mut self) {
        if self.is_rehashing() || self.resize_mode != ResizeMode::Enable {
            return;
        }
        let cap = self.tables[0].capacity();
        let used = self.tables[0].used;
        if cap <= INITIAL_CAPACITY || used * 100 >= cap * SHRINK_FILL_PERCENT {
            return;
        }
        if self.expand_allowed_for(used) {
            self.resize_to(used);
        }
    }

    /// Ensure capacity for at least `n` entries. Intended for bulk
    /// loads: on an empty table the larger generation is installed
    /// directly, with no rehash to pay off afterwards. A veto from the
    /// `expand_allowed` hook makes this a no-op.
    pub fn reserve(&mut self, n: usize) {
        if self.is_rehashing() || target_capacity(n) <= self.tables[0].capacity() {
            return;
        }
        if self.expand_allowed_for(n) {
            self.resize_to(n);
        }
    }

    /// Like [`reserve`](Self::reserve), but reports failure instead of
    /// silently doing nothing: a veto, a failed allocation, or a
    /// request that cannot take effect because a smaller resize is
    /// already in flight all return `CapacityExhausted`. Capacity is
    /// unchanged on error.
    pub fn try_reserve(&mut self, n: usize) -> Result<(), ReserveError> {
        let target = target_capacity(n);
        if self.is_rehashing() {
            // The incoming generation's capacity is what the table is
            // already committed to; a larger request cannot start until
            // that rehash completes.
            if target <= self.tables[1].capacity() {
                return Ok(());
            }
            return Err(ReserveError::CapacityExhausted);
        }
        if target <= self.tables[0].capacity() {
            return Ok(());
        }
        if !self.expand_allowed_for(n) {
            return Err(ReserveError::CapacityExhausted);
        }
        let table = Table::try_with_capacity(target)?;
        self.install_table(table);
        Ok(())
    }

    /// Strict add: fails when the key is already present in either live
    /// generation.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), InsertError> {
        self.rehash_step_piggyback();
        let hash = self.hash_of(&key);
        if self.find_slot(hash, &key).is_some() {
            return Err(InsertError::DuplicateKey);
        }
        self.expand_if_needed();
        self.link_new(key, hash, value);
        Ok(())
    }

    /// Strict add with a lazily built value; `default` runs only when
    /// the key is absent.
    pub fn insert_with<F>(&mut self, key: K, default: F) -> Result<(), InsertError>
    where
        F: FnOnce() -> V,
    {
        self.rehash_step_piggyback();
        let hash = self.hash_of(&key);
        if self.find_slot(hash, &key).is_some() {
            return Err(InsertError::DuplicateKey);
        }
        self.expand_if_needed();
        self.link_new(key, hash, default());
        Ok(())
    }

    /// Add-or-find: one hash computation whether the key is present or
    /// not. Returns the existing value, or inserts `default()` and
    /// returns the fresh one for the caller to fill in.
    pub fn or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        self.rehash_step_piggyback();
        let hash = self.hash_of(&key);
        if let Some((_, id)) = self.find_slot(hash, &key) {
            return &mut self.slots[id].value;
        }
        self.expand_if_needed();
        let id = self.link_new(key, hash, default());
        &mut self.slots[id].value
    }

    /// Upsert: installs `value`, returning the displaced old value when
    /// the key was present (the caller decides whether to drop it).
    pub fn replace(&mut self, key: K, value: V) -> Option<V> {
        self.rehash_step_piggyback();
        let hash = self.hash_of(&key);
        if let Some((_, id)) = self.find_slot(hash, &key) {
            return Some(mem::replace(&mut self.slots[id].value, value));
        }
        self.expand_if_needed();
        self.link_new(key, hash, value);
        None
    }

    /// Lookup that piggy-backs one rehash step, which is why it needs
    /// `&mut self`. Use [`peek`](Self::peek) behind a shared borrow.
    pub fn get<Q>(&mut self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.rehash_step_piggyback();
        let hash = self.hash_of(q);
        let (_, id) = self.find_slot(hash, q)?;
        Some(&self.slots[id].value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.rehash_step_piggyback();
        let hash = self.hash_of(q);
        let (_, id) = self.find_slot(hash, q)?;
        Some(&mut self.slots[id].value)
    }

    /// Read-only lookup; never advances the rehash.
    pub fn peek<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_of(q);
        let (_, id) = self.find_slot(hash, q)?;
        Some(&self.slots[id].value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_of(q);
        self.find_slot(hash, q).is_some()
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    /// Detach and return the owned pair, letting the caller act on the
    /// contents (hand the value elsewhere, inspect the key) before they
    /// are dropped.
    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.rehash_step_piggyback();
        let hash = self.hash_of(q);
        let id = self.unlink_slot(hash, q)?;
        let entry = self.slots.remove(id)?;
        self.shrink_if_needed();
        Some((entry.key, entry.value))
    }
}
