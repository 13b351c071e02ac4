//! Fragment Data Structure
//!
//! This module defines the `Fragment` type - the unit of data flowing through
//! the event builder.
//!
//! ## What is a Fragment?
//! A fragment is one subsystem's readout for one trigger instant, similar to:
//! - A single readout board's contribution to a physics event
//! - One message on the ingest wire
//!
//! ## Structure
//! Each fragment contains:
//! - **timestamp**: nanosecond-scale trigger time assigned by the producer;
//!   the sole key used for coherence grouping
//! - **logical_event_id**: producer-assigned identifier, opaque to the
//!   buffer, used only by the downstream merger
//! - **contributor**: which subsystem produced it
//! - **payload**: opaque bytes whose layout is known to the frame codec
//! - **checksum**: CRC-32 of the payload, verified at ingest
//!
//! ## Design Decisions
//! - Uses `bytes::Bytes` for the payload so slicing out of a receive buffer
//!   does not copy
//! - A fragment accepted into the buffer has already passed its CRC check;
//!   it is owned exclusively by the buffer until drained

use bytes::Bytes;

use crate::contributor::Contributor;

/// One subsystem's contribution for one trigger instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Trigger timestamp in nanoseconds.
    pub timestamp: i64,

    /// Producer-assigned logical event identifier.
    pub logical_event_id: u32,

    /// Originating subsystem.
    pub contributor: Contributor,

    /// Opaque payload bytes.
    pub payload: Bytes,

    /// CRC-32 of the payload bytes.
    pub checksum: u32,
}

impl Fragment {
    /// Build a fragment, computing the payload checksum.
    pub fn new(
        timestamp: i64,
        logical_event_id: u32,
        contributor: Contributor,
        payload: Bytes,
    ) -> Self {
        let checksum = crc32fast::hash(&payload);
        Self {
            timestamp,
            logical_event_id,
            contributor,
            payload,
            checksum,
        }
    }

    /// Build a fragment carrying a checksum received off the wire.
    ///
    /// The checksum is stored as-is; call [`Fragment::verify_checksum`] to
    /// validate it against the payload.
    pub fn with_checksum(
        timestamp: i64,
        logical_event_id: u32,
        contributor: Contributor,
        payload: Bytes,
        checksum: u32,
    ) -> Self {
        Self {
            timestamp,
            logical_event_id,
            contributor,
            payload,
            checksum,
        }
    }

    /// True iff the stored checksum matches the payload bytes.
    pub fn verify_checksum(&self) -> bool {
        crc32fast::hash(&self.payload) == self.checksum
    }

    /// Estimate the size of this fragment in bytes.
    pub fn estimated_size(&self) -> usize {
        8 + // timestamp
        4 + // logical_event_id
        8 + // contributor tag
        4 + // checksum
        self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    #[test]
    fn test_new_computes_checksum() {
        let frag = Fragment::new(1_000, 7, Contributor::Hcal, Bytes::from_static(b"payload"));
        assert_eq!(frag.checksum, crc32fast::hash(b"payload"));
        assert!(frag.verify_checksum());
    }

    #[test]
    fn test_new_empty_payload() {
        let frag = Fragment::new(0, 0, Contributor::Tracker, Bytes::new());
        assert_eq!(frag.checksum, crc32fast::hash(b""));
        assert!(frag.verify_checksum());
    }

    #[test]
    fn test_with_checksum_stores_verbatim() {
        let frag = Fragment::with_checksum(1, 2, Contributor::Ecal, Bytes::from_static(b"x"), 42);
        assert_eq!(frag.checksum, 42);
    }

    // ---------------------------------------------------------------
    // verify_checksum
    // ---------------------------------------------------------------

    #[test]
    fn test_verify_rejects_corrupt_trailer() {
        let good = Fragment::new(1, 2, Contributor::Hcal, Bytes::from_static(b"data"));
        let bad = Fragment::with_checksum(
            good.timestamp,
            good.logical_event_id,
            good.contributor,
            good.payload.clone(),
            good.checksum ^ 1,
        );
        assert!(good.verify_checksum());
        assert!(!bad.verify_checksum());
    }

    #[test]
    fn test_verify_rejects_corrupt_payload() {
        let mut frag = Fragment::new(1, 2, Contributor::Hcal, Bytes::from_static(b"data"));
        frag.payload = Bytes::from_static(b"dato");
        assert!(!frag.verify_checksum());
    }

    // ---------------------------------------------------------------
    // estimated_size
    // ---------------------------------------------------------------

    #[test]
    fn test_estimated_size_counts_header_and_payload() {
        let frag = Fragment::new(0, 0, Contributor::Tracker, Bytes::from_static(b"12345"));
        // 8 + 4 + 8 + 4 + 5 = 29
        assert_eq!(frag.estimated_size(), 29);
    }

    #[test]
    fn test_estimated_size_empty_payload() {
        let frag = Fragment::new(0, 0, Contributor::Tracker, Bytes::new());
        assert_eq!(frag.estimated_size(), 24);
    }

    // ---------------------------------------------------------------
    // Clone / Eq
    // ---------------------------------------------------------------

    #[test]
    fn test_clone_preserves_all_fields() {
        let frag = Fragment::new(-5, 9, Contributor::Ecal, Bytes::from_static(b"v"));
        let cloned = frag.clone();
        assert_eq!(frag, cloned);
    }

    #[test]
    fn test_ne_different_timestamp() {
        let a = Fragment::new(1, 2, Contributor::Hcal, Bytes::from_static(b"v"));
        let mut b = a.clone();
        b.timestamp = 2;
        assert_ne!(a, b);
    }
}
