//! Time-Indexed Fragment Buffer
//!
//! This module implements `FragmentBuffer`, the synchronization point between
//! the ingest side (many producers) and the builder loop (one consumer).
//!
//! ## What Does FragmentBuffer Do?
//!
//! Fragments from different subsystems do not arrive simultaneously or in a
//! guaranteed order. The buffer:
//!
//! 1. **Absorbs fragments** under their trigger timestamp as they arrive
//! 2. **Answers expiry checks** so the builder can detect wedged, stale data
//! 3. **Drains coherence windows atomically** - a complete-event drain and a
//!    forced (timeout) drain share one code path
//!
//! ## Assembly Modes
//!
//! - **Complete** (`force = false`): the window is anchored on the caller's
//!   reference time and the drain only happens when every required
//!   subsystem is represented inside the window.
//! - **Forced** (`force = true`): the window is anchored on the *oldest*
//!   stored timestamp, ignoring the wall clock, and drains regardless of
//!   completeness. Anchoring on the oldest bucket keeps a stale bucket from
//!   being swept past and orphaned.
//!
//! ## Locking
//!
//! One `std::sync::Mutex` guards the whole map. Every operation is
//! lock-compute-unlock with no I/O inside the critical section, so `add`
//! and `try_assemble` are linearizable with respect to each other and no
//! insertion can ever observe a partial drain.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use fragline_core::{Contributor, Fragment};

/// Time-indexed multimap of fragments awaiting assembly.
pub struct FragmentBuffer {
    /// timestamp -> fragments in arrival order.
    inner: Mutex<BTreeMap<i64, Vec<Fragment>>>,

    /// Subsystems a non-forced drain must cover.
    required: Vec<Contributor>,
}

impl FragmentBuffer {
    /// A buffer requiring all three subsystems for complete assembly.
    pub fn new() -> Self {
        Self::with_required(Contributor::ALL.to_vec())
    }

    /// A buffer with a custom required-contributor set.
    pub fn with_required(required: Vec<Contributor>) -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
            required,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<i64, Vec<Fragment>>> {
        // The map is consistent after every operation, so a panic in some
        // other holder cannot leave torn state behind.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take ownership of a fragment, filing it under its timestamp.
    ///
    /// Two fragments with the same timestamp keep their arrival order for
    /// the eventual drain.
    pub fn add(&self, fragment: Fragment) {
        let mut map = self.lock();
        map.entry(fragment.timestamp).or_default().push(fragment);
    }

    /// True iff the oldest stored timestamp is strictly older than
    /// `reference_time - window_ns`. False on an empty buffer.
    pub fn has_expired(&self, reference_time: i64, window_ns: i64) -> bool {
        let map = self.lock();
        map.keys()
            .next()
            .is_some_and(|oldest| *oldest < reference_time.saturating_sub(window_ns))
    }

    /// Drain one coherence window, if the drain policy allows it.
    ///
    /// The anchor is `reference_time` for a complete-event attempt and the
    /// oldest stored timestamp for a forced drain. Every fragment whose
    /// timestamp lies in the inclusive window `[anchor - window_ns,
    /// anchor + window_ns]` is collected; a non-forced drain additionally
    /// requires the collected contributor set to cover the required
    /// subsystems. The drained timestamps are erased before the lock is
    /// released, so no two calls can ever return overlapping fragments.
    ///
    /// Returned fragments are ordered by ascending timestamp, and within a
    /// timestamp by arrival order.
    pub fn try_assemble(
        &self,
        reference_time: i64,
        window_ns: i64,
        force: bool,
    ) -> Option<Vec<Fragment>> {
        let mut map = self.lock();

        let anchor = if force {
            *map.keys().next()?
        } else {
            if map.is_empty() {
                return None;
            }
            reference_time
        };

        let lo = anchor.saturating_sub(window_ns);
        let hi = anchor.saturating_add(window_ns);

        let keys: Vec<i64> = map.range(lo..=hi).map(|(ts, _)| *ts).collect();
        if keys.is_empty() {
            return None;
        }

        if !force {
            let mut seen = BTreeSet::new();
            for ts in &keys {
                for fragment in &map[ts] {
                    seen.insert(fragment.contributor);
                }
            }
            if !self.required.iter().all(|c| seen.contains(c)) {
                return None;
            }
        }

        let mut drained = Vec::new();
        for ts in keys {
            if let Some(mut bucket) = map.remove(&ts) {
                drained.append(&mut bucket);
            }
        }
        Some(drained)
    }

    /// Number of buffered fragments.
    pub fn len(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Oldest stored trigger timestamp, if any.
    pub fn oldest_timestamp(&self) -> Option<i64> {
        self.lock().keys().next().copied()
    }
}

impl Default for FragmentBuffer {
    fn default() -> Self {
        Self::new()
    }
}
