//! Capture packets and the contributor-tag bridge.
//!
//! The raw-capture format identifies subsystems with its own tag space,
//! derived from the hardware system id: `20` for HCal and `30` for ECal.
//! The fragment buffer uses the wire tag space `{0, 1, 2}`. The two spaces
//! are not identical and must be bridged explicitly; [`raw_to_wire`] is the
//! single place that mapping lives.

use fragline_core::{encode_payload, Contributor, Fragment, Frame, SubsystemPayload};

use crate::error::Result;

/// Raw-capture tag for the HCal subsystem.
pub const RAW_HCAL: u32 = 20;

/// Raw-capture tag for the ECal subsystem.
pub const RAW_ECAL: u32 = 30;

/// One parsed raw-capture frame, carrying its capture-space contributor tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePacket {
    /// 64-bit producer timestamp carried by the frame.
    pub pulse_id: u64,

    /// Producer event counter.
    pub event_id: u32,

    /// Full hardware system id, byte-swapped to host order.
    pub raw_system_id: u32,

    /// Capture-space contributor tag: `(raw_system_id >> 16) & 0xFF`.
    pub contributor_raw: u32,

    /// Encoded ADC data, opaque at this layer.
    pub payload: Vec<u8>,
}

impl CapturePacket {
    /// Convert this packet into a buffer fragment, bridging the tag spaces.
    ///
    /// Returns `None` for tags with no wire-space counterpart; such frames
    /// never reach the buffer. The raw ADC bytes are re-encoded as a
    /// single-frame payload container - the capture format carries bare
    /// samples, the buffer side decodes the frame layout - with one 32-bit
    /// word per sample and the pulse id as the payload timestamp. A
    /// trailing partial sample is dropped. The fragment checksum is
    /// computed here since the capture format carries none.
    pub fn into_fragment(self) -> Option<Fragment> {
        let contributor = raw_to_wire(self.contributor_raw)?;
        let words: Vec<u32> = self
            .payload
            .chunks_exact(4)
            .map(|sample| u32::from_le_bytes([sample[0], sample[1], sample[2], sample[3]]))
            .collect();
        let timestamp = self.pulse_id as i64;
        let payload = SubsystemPayload::new(timestamp, vec![Frame::new(words)]);
        Some(Fragment::new(
            timestamp,
            self.event_id,
            contributor,
            encode_payload(&payload),
        ))
    }
}

/// Map a capture-space contributor tag to its wire-space counterpart.
pub fn raw_to_wire(tag: u32) -> Option<Contributor> {
    match tag {
        RAW_HCAL => Some(Contributor::Hcal),
        RAW_ECAL => Some(Contributor::Ecal),
        _ => None,
    }
}

/// Terminal stage of routing mode: receives every forwarded packet.
///
/// Builder-feeding sinks bridge each packet into a
/// [`Fragment`](fragline_core::Fragment) via
/// [`CapturePacket::into_fragment`] and enqueue or transmit it; any
/// `FnMut(CapturePacket) -> Result<()>` closure is also a sink.
pub trait PacketSink {
    fn dispatch(&mut self, packet: CapturePacket) -> Result<()>;
}

impl<F> PacketSink for F
where
    F: FnMut(CapturePacket) -> Result<()>,
{
    fn dispatch(&mut self, packet: CapturePacket) -> Result<()> {
        self(packet)
    }
}
