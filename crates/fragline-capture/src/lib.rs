//! Raw-capture decoding for the fragline event builder.
//!
//! A raw capture is a byte stream of concatenated, size-prefixed frames
//! written by the readout hardware: the size word is little-endian, the
//! header fields inside the frame are big-endian. This crate:
//!
//! - syncs to the first plausible frame boundary and re-syncs after
//!   corruption ([`CaptureDecoder`])
//! - parses frames into [`CapturePacket`]s and routes the calorimeter
//!   subsystems downstream, skipping metadata frames
//! - dumps ADC samples as CSV in decode-and-save mode
//! - bridges the capture's contributor-tag space (`20`, `30`) into the
//!   wire tag space used by the fragment buffer ([`raw_to_wire`])

pub mod decoder;
pub mod error;
pub mod packet;

pub use decoder::{CaptureDecoder, CaptureStats, CSV_HEADER};
pub use error::{CaptureError, Result};
pub use packet::{raw_to_wire, CapturePacket, PacketSink, RAW_ECAL, RAW_HCAL};
