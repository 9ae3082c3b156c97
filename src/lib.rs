//! incr-hashmap: a single-threaded, chained hash table that rehashes
//! incrementally, so no single operation pays the full cost of resizing
//! a large table.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep every operation O(1) amortized even across resizes by
//!   splitting a rehash into per-bucket steps that ride along with
//!   organic traffic or run in explicit time-boxed bursts.
//! - Layout:
//!   - Entries live in a `slotmap::SlotMap` arena and are addressed by
//!     generational slot ids; bucket heads and chain links store slot
//!     ids, never pointers. Stale ids (entry removed, slot reused) are
//!     detectable, which makes unlink/relink during rehashing safe.
//!   - Two bucket arrays ("generations"). While idle all entries live in
//!     generation 0 and generation 1 has zero capacity. A resize
//!     allocates generation 1 at the target capacity and sets a rehash
//!     cursor; each step drains one bucket of generation 0 into
//!     generation 1, and completion promotes generation 1 into slot 0.
//!   - Each entry caches its 64-bit hash at insert time. `K: Hash` is
//!     never invoked again during rehashing, so resizing cannot call
//!     into user code.
//!
//! Constraints
//! - Single-threaded: no locking, no atomics. "Concurrency" here means
//!   only that rehash work is amortized across calls.
//! - Capacities are powers of two; bucket index is `hash & (cap - 1)`.
//! - Lookups that advance the rehash (`get`, `get_mut`) take `&mut self`;
//!   `peek`/`contains_key` are available when only `&self` is held.
//! - Duplicate inserts fail with `InsertError::DuplicateKey`; upserts go
//!   through `replace`.
//! - Reentrancy: disallowed during critical sections (debug-only guard);
//!   only `K: Eq`/`K: Hash` may run while internals are transiently
//!   inconsistent.
//!
//! Iteration while mutating
//! - `iter`/`iter_mut` borrow the table and walk the arena; the borrow
//!   checker rules out structural mutation for their lifetime.
//! - `SafeIter` holds no borrow between steps: it pauses rehashing for
//!   its lifetime and is handed the table at each `next` call, so the
//!   caller may insert, look up, and remove the just-returned entry
//!   between steps.
//! - `RawIter` pauses nothing and instead carries a structural
//!   fingerprint that is re-checked (debug builds only) on every step to
//!   catch callers that mutated the table anyway.
//! - `scan` is a resumable full-table traversal driven by an opaque
//!   reverse-bit-order cursor that stays meaningful across resizes:
//!   every entry present for a whole 0 -> 0 scan sequence is visited at
//!   least once no matter how often the table grows or shrinks between
//!   calls.
//!
//! Sets and plain keys
//! - There is no separate set type; instantiate with `V = ()`. The unit
//!   value compiles away.

mod incr_hash_map;
mod incr_hash_map_proptest;
mod iter;
mod reentrancy;
mod rehash;
mod sample;
mod scan;
mod stats;

// Public surface
pub use incr_hash_map::{IncrHashMap, InsertError, ReserveError, ResizeMode};
pub use iter::{Iter, IterMut, RawIter, SafeIter};
pub use stats::{Stats, TableStats};
