//! Event Merger
//!
//! Optional downstream stage that consolidates partial combined events
//! sharing a logical event id. A forced (timed-out) drain can split one
//! logical event across several partial records; the merger glues them back
//! together in arrival order.
//!
//! Completion semantics - when a logical event is "done" - are an external
//! concern; the merger only accumulates.

use std::collections::BTreeMap;
use std::sync::Mutex;

use fragline_core::{CombinedEvent, Contributor};
use tracing::debug;

/// Thread-safe accumulator of partial events keyed by logical event id.
pub struct EventMerger {
    inner: Mutex<BTreeMap<u32, CombinedEvent>>,
}

impl EventMerger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<u32, CombinedEvent>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fold a partial event into the record for its logical id.
    ///
    /// First arrival stores the event as-is. Later arrivals append their
    /// `contributors_present` entries and per-subsystem frames; a subsystem
    /// slot the stored record lacks adopts the incoming payload whole.
    pub fn merge(&self, partial: CombinedEvent) {
        let mut map = self.lock();
        let id = partial.logical_event_id;

        match map.entry(id) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                debug!(logical_event_id = id, "stored first part of event");
                slot.insert(partial);
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing
                    .contributors_present
                    .extend(partial.contributors_present.iter().copied());

                let mut incoming = partial;
                for contributor in Contributor::ALL {
                    if let Some(payload) = incoming.slot_mut(contributor).take() {
                        match existing.slot_mut(contributor) {
                            Some(stored) => stored.append_frames(payload),
                            empty => *empty = Some(payload),
                        }
                    }
                }
                debug!(
                    logical_event_id = id,
                    contributors = existing.contributors_present.len(),
                    "merged partial event"
                );
            }
        }
    }

    /// Number of distinct logical events held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return the record for `id`, if present.
    pub fn take(&self, id: u32) -> Option<CombinedEvent> {
        self.lock().remove(&id)
    }

    /// Clone the current records, in id order.
    pub fn snapshot(&self) -> Vec<CombinedEvent> {
        self.lock().values().cloned().collect()
    }
}

impl Default for EventMerger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fragline_core::{Frame, SubsystemPayload};

    fn partial(id: u32, contributor: Contributor, words: Vec<u32>) -> CombinedEvent {
        let mut event = CombinedEvent {
            timestamp: 1_000,
            logical_event_id: id,
            contributors_present: vec![contributor],
            ..Default::default()
        };
        *event.slot_mut(contributor) =
            Some(SubsystemPayload::new(1_000, vec![Frame::new(words)]));
        event
    }

    #[test]
    fn test_first_arrival_is_stored() {
        let merger = EventMerger::new();
        merger.merge(partial(5, Contributor::Hcal, vec![1]));
        assert_eq!(merger.len(), 1);
        let stored = merger.take(5).expect("stored");
        assert_eq!(stored.contributors_present, vec![Contributor::Hcal]);
        assert!(merger.is_empty());
    }

    #[test]
    fn test_merge_appends_in_arrival_order() {
        let merger = EventMerger::new();
        merger.merge(partial(9, Contributor::Ecal, vec![1]));
        merger.merge(partial(9, Contributor::Ecal, vec![2]));
        merger.merge(partial(9, Contributor::Ecal, vec![3]));

        let merged = merger.take(9).expect("merged");
        let words: Vec<u32> = merged
            .ecal
            .expect("ecal")
            .frames
            .iter()
            .flat_map(|f| f.words.clone())
            .collect();
        assert_eq!(words, vec![1, 2, 3]);
        assert_eq!(merged.contributors_present.len(), 3);
    }

    #[test]
    fn test_merge_adopts_missing_slots() {
        let merger = EventMerger::new();
        merger.merge(partial(2, Contributor::Tracker, vec![10]));
        merger.merge(partial(2, Contributor::Hcal, vec![20]));

        let merged = merger.take(2).expect("merged");
        assert_eq!(merged.tracker.expect("tracker").frames[0].words, vec![10]);
        assert_eq!(merged.hcal.expect("hcal").frames[0].words, vec![20]);
        assert!(merged.ecal.is_none());
    }

    #[test]
    fn test_distinct_ids_stay_separate() {
        let merger = EventMerger::new();
        merger.merge(partial(1, Contributor::Hcal, vec![1]));
        merger.merge(partial(2, Contributor::Hcal, vec![2]));
        assert_eq!(merger.len(), 2);
        let snapshot = merger.snapshot();
        assert_eq!(snapshot[0].logical_event_id, 1);
        assert_eq!(snapshot[1].logical_event_id, 2);
    }

    #[test]
    fn test_concurrent_merges_keep_every_frame() {
        use std::sync::Arc;

        let merger = Arc::new(EventMerger::new());
        let mut handles = Vec::new();
        for worker in 0..4u32 {
            let merger = Arc::clone(&merger);
            handles.push(std::thread::spawn(move || {
                for i in 0..50u32 {
                    merger.merge(partial(7, Contributor::Hcal, vec![worker * 100 + i]));
                }
            }));
        }
        for handle in handles {
            handle.join().expect("worker");
        }

        let merged = merger.take(7).expect("merged");
        assert_eq!(merged.contributors_present.len(), 200);
        assert_eq!(merged.hcal.expect("hcal").frames.len(), 200);
    }
}
