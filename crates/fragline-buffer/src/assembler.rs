//! Payload Assembler
//!
//! Merges one drained fragment set into a single
//! [`CombinedEvent`](fragline_core::CombinedEvent).
//!
//! ## Merge Rules
//!
//! - The event's `timestamp` and `logical_event_id` come from the first
//!   fragment in drain order
//! - `contributors_present` gets one entry per fragment, duplicates allowed
//! - The first fragment of each subsystem initializes that subsystem's
//!   payload (keeping its decoded producer timestamp); later fragments of
//!   the same subsystem append their frames in drain order
//! - Fragments are consumed by value; payload bytes are decoded once and
//!   never copied back out

use fragline_core::{decode_payload, CombinedEvent, Fragment};

use crate::error::{AssemblyError, Result};

/// Assemble a drained fragment set into one combined event.
///
/// A payload that fails to decode aborts the assembly with
/// [`AssemblyError::AssemblyFailed`]; the caller reports and discards the
/// drain.
pub fn assemble(fragments: Vec<Fragment>) -> Result<CombinedEvent> {
    let first = fragments.first().ok_or(AssemblyError::EmptyDrain)?;

    let mut event = CombinedEvent {
        timestamp: first.timestamp,
        logical_event_id: first.logical_event_id,
        ..Default::default()
    };

    for fragment in fragments {
        event.contributors_present.push(fragment.contributor);

        let payload =
            decode_payload(&fragment.payload).map_err(|source| AssemblyError::AssemblyFailed {
                contributor: fragment.contributor,
                timestamp: fragment.timestamp,
                source,
            })?;

        match event.slot_mut(fragment.contributor) {
            Some(existing) => existing.append_frames(payload),
            slot => *slot = Some(payload),
        }
    }

    Ok(event)
}
