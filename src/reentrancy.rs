//! Debug-only reentrancy guard.
//!
//! Probing runs user code (`K: Hash` / `K: Eq`) while bucket chains may
//! be transiently inconsistent; re-entering the table from inside that
//! code is a bug. In debug builds entering a guarded section twice
//! panics; in release builds the guard is a zero-sized no-op.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-table tracker. Guard the probing sections with
/// `let _g = self.reentrancy.enter();`.
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    depth: Cell<u32>,
    // Also pins the table !Send + !Sync, matching the single-threaded
    // design.
    _not_sync: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        DebugReentrancy {
            #[cfg(debug_assertions)]
            depth: Cell::new(0),
            _not_sync: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                self.depth.get() == 0,
                "reentrant call into the table from user Hash/Eq code"
            );
            self.depth.set(1);
        }
        ReentrancyGuard {
            #[cfg(debug_assertions)]
            owner: self,
            #[cfg(not(debug_assertions))]
            _marker: PhantomData,
        }
    }
}

pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _marker: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.depth.set(0);
    }
}
