//! TCP Wire Codec
//!
//! This module implements the framed message format used to move one
//! fragment over one TCP connection.
//!
//! ## Layout
//!
//! ```text
//! [ timestamp        : i64 LE ]
//! [ logical_event_id : u32 LE ]
//! [ contributor      : u64 LE ]
//! [ payload_size     : u64 LE ]
//! [ payload          : payload_size bytes ]
//! [ checksum         : u32 LE ]   // CRC-32 over payload bytes
//! ```
//!
//! Every field is encoded in explicit little-endian, which is byte-identical
//! to the host order of the producing readout hosts but also well-defined
//! for heterogeneous senders.
//!
//! ## Integrity
//!
//! The trailer carries a CRC-32 (reflected IEEE polynomial `0xEDB88320`,
//! initial and final XOR `0xFFFFFFFF` - the `crc32fast` default) over the
//! payload bytes. On mismatch the receiver discards the whole message and
//! drops the connection; no partial state is retained.
//!
//! ## Streaming reads
//!
//! The ingest server reads the fixed [`HEADER_LEN`] bytes first, then
//! exactly `payload_size` bytes, then the [`TRAILER_LEN`]-byte trailer.
//! [`MessageHeader::decode`] parses the fixed prefix so the server can size
//! its payload read before the rest of the message has arrived.

use bytes::{BufMut, Bytes, BytesMut};

use crate::contributor::Contributor;
use crate::error::{Error, Result};
use crate::fragment::Fragment;

/// Size of the fixed message header in bytes.
pub const HEADER_LEN: usize = 8 + 4 + 8 + 8;

/// Size of the message trailer in bytes.
pub const TRAILER_LEN: usize = 4;

/// Default cap on the declared payload size, enforced before allocation.
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 64 * 1024 * 1024;

/// The fixed-size prefix of a wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub timestamp: i64,
    pub logical_event_id: u32,
    pub contributor_tag: u64,
    pub payload_size: u64,
}

impl MessageHeader {
    /// Parse the fixed header from exactly [`HEADER_LEN`] bytes.
    pub fn decode(raw: &[u8; HEADER_LEN]) -> Self {
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&raw[0..8]);
        let mut id = [0u8; 4];
        id.copy_from_slice(&raw[8..12]);
        let mut tag = [0u8; 8];
        tag.copy_from_slice(&raw[12..20]);
        let mut size = [0u8; 8];
        size.copy_from_slice(&raw[20..28]);

        Self {
            timestamp: i64::from_le_bytes(ts),
            logical_event_id: u32::from_le_bytes(id),
            contributor_tag: u64::from_le_bytes(tag),
            payload_size: u64::from_le_bytes(size),
        }
    }

    /// Resolve the wire tag to a [`Contributor`].
    pub fn contributor(&self) -> Result<Contributor> {
        Contributor::try_from(self.contributor_tag)
    }
}

/// Encode one fragment into a complete wire message.
pub fn encode_message(fragment: &Fragment) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + fragment.payload.len() + TRAILER_LEN);

    buf.put_i64_le(fragment.timestamp);
    buf.put_u32_le(fragment.logical_event_id);
    buf.put_u64_le(fragment.contributor.as_u64());
    buf.put_u64_le(fragment.payload.len() as u64);
    buf.put_slice(&fragment.payload);
    buf.put_u32_le(fragment.checksum);

    buf.freeze()
}

/// Decode a complete wire message, verifying its checksum.
///
/// Fails with [`Error::BufferUnderrun`] if `buf` is shorter than the
/// declared message, [`Error::UnknownContributor`] for a tag outside the
/// closed set, and [`Error::ChecksumMismatch`] if the trailer CRC does not
/// match the payload.
pub fn decode_message(buf: &[u8]) -> Result<Fragment> {
    if buf.len() < HEADER_LEN {
        return Err(Error::BufferUnderrun {
            needed: HEADER_LEN,
            remaining: buf.len(),
        });
    }

    let mut raw_header = [0u8; HEADER_LEN];
    raw_header.copy_from_slice(&buf[..HEADER_LEN]);
    let header = MessageHeader::decode(&raw_header);
    let contributor = header.contributor()?;

    let payload_size = header.payload_size as usize;
    let needed = HEADER_LEN + payload_size + TRAILER_LEN;
    if buf.len() < needed {
        return Err(Error::BufferUnderrun {
            needed,
            remaining: buf.len(),
        });
    }

    let payload = Bytes::copy_from_slice(&buf[HEADER_LEN..HEADER_LEN + payload_size]);

    let mut raw_crc = [0u8; TRAILER_LEN];
    raw_crc.copy_from_slice(&buf[HEADER_LEN + payload_size..needed]);
    let checksum = u32::from_le_bytes(raw_crc);

    let computed = crc32fast::hash(&payload);
    if computed != checksum {
        return Err(Error::ChecksumMismatch {
            expected: checksum,
            computed,
        });
    }

    Ok(Fragment::with_checksum(
        header.timestamp,
        header.logical_event_id,
        contributor,
        payload,
        checksum,
    ))
}
