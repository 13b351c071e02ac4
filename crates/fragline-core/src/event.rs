//! Combined Event Record
//!
//! The multi-subsystem output of the payload assembler: one record per
//! drained fragment set, carrying the per-subsystem payloads that were
//! found inside the coherence window.

use crate::contributor::Contributor;
use crate::frame::SubsystemPayload;

/// One assembled event: the merged payloads of a drained fragment set.
///
/// `contributors_present` records one entry per fragment, in drain order,
/// with duplicates - a forced (timed-out) assembly is identifiable by the
/// required subsystems it lacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedEvent {
    /// Timestamp of the first fragment in drain order.
    pub timestamp: i64,

    /// Logical event id of the first fragment in drain order.
    pub logical_event_id: u32,

    /// One entry per fragment, in drain order.
    pub contributors_present: Vec<Contributor>,

    pub tracker: Option<SubsystemPayload>,
    pub hcal: Option<SubsystemPayload>,
    pub ecal: Option<SubsystemPayload>,
}

impl CombinedEvent {
    /// The assembled payload for `contributor`, if any fragment of that
    /// subsystem was present.
    pub fn payload(&self, contributor: Contributor) -> Option<&SubsystemPayload> {
        self.slot(contributor).as_ref()
    }

    /// Shared access to the payload slot for `contributor`.
    pub fn slot(&self, contributor: Contributor) -> &Option<SubsystemPayload> {
        match contributor {
            Contributor::Tracker => &self.tracker,
            Contributor::Hcal => &self.hcal,
            Contributor::Ecal => &self.ecal,
        }
    }

    /// Mutable access to the payload slot for `contributor`.
    pub fn slot_mut(&mut self, contributor: Contributor) -> &mut Option<SubsystemPayload> {
        match contributor {
            Contributor::Tracker => &mut self.tracker,
            Contributor::Hcal => &mut self.hcal,
            Contributor::Ecal => &mut self.ecal,
        }
    }

    /// True iff every contributor in `required` appears in
    /// `contributors_present`.
    pub fn is_complete(&self, required: &[Contributor]) -> bool {
        required
            .iter()
            .all(|c| self.contributors_present.contains(c))
    }

    /// Total frame count across all subsystem payloads.
    pub fn total_frames(&self) -> usize {
        Contributor::ALL
            .iter()
            .filter_map(|c| self.payload(*c))
            .map(|p| p.frames.len())
            .sum()
    }
}
