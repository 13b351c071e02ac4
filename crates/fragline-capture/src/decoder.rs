//! Raw-Capture Frame Decoder
//!
//! This module implements `CaptureDecoder`, the sync-and-parse front-end
//! over a raw capture stream.
//!
//! ## Frame Layout
//!
//! ```text
//! [ frame_size    : u32 LE ]   // total bytes including this word
//! [ rogue headers : 8 bytes ]  // skipped verbatim
//! [ raw_system_id : u32 BE ]
//! [ pulse_id      : u64 BE ]
//! [ event_id      : u32 BE ]
//! [ payload       : frame_size - 24 bytes ]
//! ```
//!
//! ## Sync Strategy
//!
//! The stream may start mid-frame or contain corrupted stretches. Sync
//! scans 4 bytes at a time for a plausible little-endian size word
//! (`24 < v < 5000`, high half zero), then rewinds so the word is re-read
//! as part of the frame. A miss backs up 3 bytes - a byte-level sliding
//! window. The main loop applies the same recovery when it reads a size
//! outside `[24, 10_000]`.
//!
//! ## Modes
//!
//! Both public modes share the sync/validate loop; only the terminal sink
//! differs:
//!
//! - [`CaptureDecoder::route`] hands forwarded packets to a
//!   [`PacketSink`] - a builder-feeding sink or a plain closure
//! - [`CaptureDecoder::decode_to_csv`] expands forwarded payloads into one
//!   CSV line per ADC sample
//!
//! Only the calorimeter tags (`20`, `30`) are forwarded; any other frame is
//! skipped by seeking past its payload.

use std::io::{Read, Seek, SeekFrom, Write};

use tracing::{debug, warn};

use crate::error::Result;
use crate::packet::{CapturePacket, PacketSink, RAW_ECAL, RAW_HCAL};

/// Header line of the decode-and-save CSV output.
pub const CSV_HEADER: &str =
    "timestamp,orbit,bx,event,subsystem,raw_hex_ID,contributorID,channel,adc_tm1,adc";

/// Bytes of frame header counted inside `frame_size`.
const FRAME_HEADER_BYTES: u32 = 24;

/// Frames smaller than the header or larger than this are treated as sync
/// loss.
const MAX_FRAME_BYTES: u32 = 10_000;

/// Upper bound used during initial sync; tighter than the in-stream bound.
const SYNC_MAX_FRAME_BYTES: u32 = 5_000;

/// Counters describing one decoding pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames forwarded to the sink.
    pub forwarded: u64,

    /// Frames skipped because their contributor tag is not routed.
    pub skipped: u64,

    /// Size-word rejections that triggered a 3-byte slide.
    pub resyncs: u64,
}

/// Sync-and-parse decoder over a seekable capture stream.
pub struct CaptureDecoder<R> {
    reader: R,
}

impl<R: Read + Seek> CaptureDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Consume the decoder and return the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read 4 bytes, or report end-of-stream. A truncated tail (1-3 bytes)
    /// also counts as end-of-stream.
    fn read_word(&mut self) -> Result<Option<[u8; 4]>> {
        let mut raw = [0u8; 4];
        if self.fill(&mut raw)? {
            Ok(Some(raw))
        } else {
            Ok(None)
        }
    }

    /// Fill `buf` completely; false on a clean or truncated end-of-stream.
    fn fill(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.reader.read(&mut buf[filled..])?;
            if n == 0 {
                return Ok(false);
            }
            filled += n;
        }
        Ok(true)
    }

    /// Scan forward for the first plausible frame-size word and rewind so
    /// it is re-read as part of the frame. False if the stream ends first.
    fn sync_to_frame(&mut self) -> Result<bool> {
        while let Some(raw) = self.read_word()? {
            let word = u32::from_le_bytes(raw);
            if word > FRAME_HEADER_BYTES
                && word < SYNC_MAX_FRAME_BYTES
                && word & 0xFFFF_0000 == 0
            {
                self.reader.seek(SeekFrom::Current(-4))?;
                return Ok(true);
            }
            self.reader.seek(SeekFrom::Current(-3))?;
        }
        Ok(false)
    }

    /// Shared sync/validate loop. `sink` receives every forwarded packet.
    fn process<S: PacketSink>(&mut self, mut sink: S) -> Result<CaptureStats> {
        let mut stats = CaptureStats::default();

        if !self.sync_to_frame()? {
            warn!("no valid frame start found in capture stream");
            return Ok(stats);
        }

        while let Some(raw_size) = self.read_word()? {
            let frame_size = u32::from_le_bytes(raw_size);
            if frame_size < FRAME_HEADER_BYTES || frame_size > MAX_FRAME_BYTES {
                // Mis-synchronization: slide the window by one byte.
                self.reader.seek(SeekFrom::Current(-3))?;
                stats.resyncs += 1;
                continue;
            }

            // Rogue internal headers: skipped verbatim.
            self.reader.seek(SeekFrom::Current(8))?;

            let Some(raw_id) = self.read_word()? else { break };
            let raw_system_id = u32::from_be_bytes(raw_id);

            let mut raw_pulse = [0u8; 8];
            if !self.fill(&mut raw_pulse)? {
                break;
            }
            let pulse_id = u64::from_be_bytes(raw_pulse);

            let Some(raw_event) = self.read_word()? else { break };
            let event_id = u32::from_be_bytes(raw_event);

            let contributor_raw = (raw_system_id >> 16) & 0xFF;
            let payload_len = (frame_size - FRAME_HEADER_BYTES) as usize;

            if contributor_raw == RAW_HCAL || contributor_raw == RAW_ECAL {
                let mut payload = vec![0u8; payload_len];
                if !self.fill(&mut payload)? {
                    break;
                }
                stats.forwarded += 1;
                sink.dispatch(CapturePacket {
                    pulse_id,
                    event_id,
                    raw_system_id,
                    contributor_raw,
                    payload,
                })?;
            } else {
                // Metadata frame: seek past the payload without reading it.
                self.reader.seek(SeekFrom::Current(payload_len as i64))?;
                stats.skipped += 1;
            }
        }

        debug!(
            forwarded = stats.forwarded,
            skipped = stats.skipped,
            resyncs = stats.resyncs,
            "capture pass finished"
        );
        Ok(stats)
    }

    /// Routing mode: forward every calorimeter packet to `sink`.
    pub fn route<S: PacketSink>(&mut self, sink: S) -> Result<CaptureStats> {
        self.process(sink)
    }

    /// Decode-and-save mode: expand forwarded payloads into one CSV line
    /// per ADC sample.
    ///
    /// Samples are consecutive little-endian `u16` pairs
    /// `(adc_tm1, adc)`; the channel column is the sample index within the
    /// payload. A trailing `,-1,0` is appended to every line.
    pub fn decode_to_csv<W: Write>(&mut self, out: &mut W) -> Result<CaptureStats> {
        writeln!(out, "{CSV_HEADER}")?;
        let stats = self.process(|packet: CapturePacket| -> Result<()> {
            write_samples(out, &packet)?;
            Ok(())
        })?;
        out.flush()?;
        Ok(stats)
    }
}

fn write_samples<W: Write>(out: &mut W, packet: &CapturePacket) -> Result<()> {
    for (channel, sample) in packet.payload.chunks_exact(4).enumerate() {
        let adc_tm1 = u16::from_le_bytes([sample[0], sample[1]]);
        let adc = u16::from_le_bytes([sample[2], sample[3]]);
        writeln!(
            out,
            "{},0,0,{},{},{:x},{},{},{},{},-1,0",
            packet.pulse_id,
            packet.event_id,
            packet.contributor_raw,
            packet.raw_system_id,
            packet.contributor_raw,
            channel,
            adc_tm1,
            adc,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Build one raw-capture frame with the given header fields.
    fn frame(raw_system_id: u32, pulse_id: u64, event_id: u32, payload: &[u8]) -> Vec<u8> {
        let frame_size = FRAME_HEADER_BYTES + payload.len() as u32;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&frame_size.to_le_bytes());
        bytes.extend_from_slice(&[0xEE; 8]); // rogue headers
        bytes.extend_from_slice(&raw_system_id.to_be_bytes());
        bytes.extend_from_slice(&pulse_id.to_be_bytes());
        bytes.extend_from_slice(&event_id.to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    fn hcal_system_id() -> u32 {
        RAW_HCAL << 16
    }

    fn ecal_system_id() -> u32 {
        RAW_ECAL << 16
    }

    fn collect(bytes: Vec<u8>) -> (Vec<CapturePacket>, CaptureStats) {
        let mut decoder = CaptureDecoder::new(Cursor::new(bytes));
        let mut packets = Vec::new();
        let stats = decoder
            .route(|p: CapturePacket| -> Result<()> {
                packets.push(p);
                Ok(())
            })
            .expect("route");
        (packets, stats)
    }

    /// 16-byte payload: 4 ADC samples.
    fn sample_payload() -> Vec<u8> {
        let mut payload = Vec::new();
        for sample in 0u16..4 {
            payload.extend_from_slice(&(sample * 10).to_le_bytes()); // adc_tm1
            payload.extend_from_slice(&(sample * 10 + 1).to_le_bytes()); // adc
        }
        payload
    }

    // ---------------------------------------------------------------
    // Parsing
    // ---------------------------------------------------------------

    #[test]
    fn test_single_frame() {
        let (packets, stats) = collect(frame(hcal_system_id(), 777, 3, &sample_payload()));
        assert_eq!(packets.len(), 1);
        assert_eq!(stats.forwarded, 1);
        assert_eq!(stats.skipped, 0);
        let packet = &packets[0];
        assert_eq!(packet.pulse_id, 777);
        assert_eq!(packet.event_id, 3);
        assert_eq!(packet.contributor_raw, RAW_HCAL);
        assert_eq!(packet.payload.len(), 16);
    }

    #[test]
    fn test_consecutive_frames() {
        let mut bytes = frame(hcal_system_id(), 1, 1, &sample_payload());
        bytes.extend(frame(ecal_system_id(), 2, 1, &sample_payload()));
        let (packets, _) = collect(bytes);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].contributor_raw, RAW_HCAL);
        assert_eq!(packets[1].contributor_raw, RAW_ECAL);
    }

    #[test]
    fn test_empty_payload_frame() {
        let (packets, _) = collect(frame(ecal_system_id(), 9, 2, &[]));
        assert_eq!(packets.len(), 1);
        assert!(packets[0].payload.is_empty());
    }

    // ---------------------------------------------------------------
    // Routing
    // ---------------------------------------------------------------

    #[test]
    fn test_unrouted_contributor_is_skipped() {
        // Raw tag 10 has no wire counterpart; its payload must be seeked
        // past without disturbing the following frame.
        let mut bytes = frame(10 << 16, 5, 1, &sample_payload());
        bytes.extend(frame(hcal_system_id(), 6, 1, &sample_payload()));
        let (packets, stats) = collect(bytes);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].pulse_id, 6);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.forwarded, 1);
    }

    // ---------------------------------------------------------------
    // Sync
    // ---------------------------------------------------------------

    #[test]
    fn test_sync_skips_junk_prefix() {
        let mut bytes = vec![0xFF, 0xFF, 0xFF];
        bytes.extend(frame(hcal_system_id(), 777, 3, &sample_payload()));
        let (packets, _) = collect(bytes);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].pulse_id, 777);
        assert_eq!(packets[0].payload.len(), 16);
    }

    #[test]
    fn test_sync_prefix_does_not_change_decoded_stream() {
        let body = {
            let mut b = frame(hcal_system_id(), 1, 1, &sample_payload());
            b.extend(frame(ecal_system_id(), 2, 2, &sample_payload()));
            b
        };
        let (clean, _) = collect(body.clone());

        for prefix in [vec![0xFFu8], vec![0xFF, 0xFF], vec![0xAB, 0xCD, 0xEF]] {
            let mut bytes = prefix;
            bytes.extend(body.clone());
            let (packets, _) = collect(bytes);
            assert_eq!(packets, clean);
        }
    }

    #[test]
    fn test_mid_stream_resync_recovers() {
        let mut bytes = frame(hcal_system_id(), 1, 1, &sample_payload());
        bytes.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]); // corrupted stretch
        bytes.extend(frame(ecal_system_id(), 2, 2, &sample_payload()));
        let (packets, stats) = collect(bytes);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1].pulse_id, 2);
        assert!(stats.resyncs > 0);
    }

    #[test]
    fn test_oversized_size_word_triggers_resync() {
        // 10_001 passes the sync mask but fails the in-stream bound.
        let mut bytes = frame(hcal_system_id(), 1, 1, &sample_payload());
        bytes.extend_from_slice(&10_001u32.to_le_bytes());
        bytes.extend(frame(ecal_system_id(), 2, 2, &sample_payload()));
        let (packets, stats) = collect(bytes);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1].pulse_id, 2);
        assert!(stats.resyncs > 0);
    }

    #[test]
    fn test_all_junk_yields_nothing() {
        let (packets, stats) = collect(vec![0xFF; 64]);
        assert!(packets.is_empty());
        assert_eq!(stats, CaptureStats::default());
    }

    #[test]
    fn test_truncated_final_frame_is_dropped() {
        let mut bytes = frame(hcal_system_id(), 1, 1, &sample_payload());
        let second = frame(ecal_system_id(), 2, 2, &sample_payload());
        bytes.extend(&second[..second.len() - 4]);
        let (packets, _) = collect(bytes);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].pulse_id, 1);
    }

    // ---------------------------------------------------------------
    // CSV output
    // ---------------------------------------------------------------

    #[test]
    fn test_csv_lines() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&100u16.to_le_bytes());
        payload.extend_from_slice(&200u16.to_le_bytes());
        payload.extend_from_slice(&300u16.to_le_bytes());
        payload.extend_from_slice(&400u16.to_le_bytes());

        let mut decoder =
            CaptureDecoder::new(Cursor::new(frame(hcal_system_id(), 777, 3, &payload)));
        let mut out = Vec::new();
        let stats = decoder.decode_to_csv(&mut out).expect("csv");
        assert_eq!(stats.forwarded, 1);

        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "777,0,0,3,20,140000,20,0,100,200,-1,0");
        assert_eq!(lines[2], "777,0,0,3,20,140000,20,1,300,400,-1,0");
    }

    #[test]
    fn test_csv_sample_count_matches_payload() {
        // 4 ADC samples -> 4 lines after the header.
        let mut decoder = CaptureDecoder::new(Cursor::new(frame(
            ecal_system_id(),
            1,
            1,
            &sample_payload(),
        )));
        let mut out = Vec::new();
        decoder.decode_to_csv(&mut out).expect("csv");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn test_csv_empty_capture_writes_header_only() {
        let mut decoder = CaptureDecoder::new(Cursor::new(Vec::new()));
        let mut out = Vec::new();
        decoder.decode_to_csv(&mut out).expect("csv");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text.lines().collect::<Vec<_>>(), vec![CSV_HEADER]);
    }
}
