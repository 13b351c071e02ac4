//! Payload Frame Codec
//!
//! This module implements the little-endian, length-prefixed container that
//! every subsystem uses for its fragment payload bytes.
//!
//! ## Layout
//!
//! ```text
//! [ timestamp  : i64 LE ]
//! [ num_frames : u32 LE ]
//!   for each frame:
//!     [ num_words : u32 LE ]
//!     [ words     : num_words x u32 LE ]
//! ```
//!
//! ## Underrun Safety
//!
//! [`FrameReader`] checks the remaining byte count before every read, and a
//! frame's word count is validated against the remaining bytes *before* the
//! word vector is allocated. A hostile `num_words` therefore cannot trigger
//! an oversized allocation; it fails with [`Error::BufferUnderrun`] instead.
//!
//! ## Usage
//!
//! ```ignore
//! let bytes = encode_payload(&payload);
//! let decoded = decode_payload(&bytes)?;
//! assert_eq!(decoded, payload);
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// One readout frame: a sequence of 32-bit words. The word content is opaque
/// at this layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub words: Vec<u32>,
}

impl Frame {
    pub fn new(words: Vec<u32>) -> Self {
        Self { words }
    }
}

/// The decoded content of one fragment payload: a producer timestamp and an
/// ordered sequence of frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubsystemPayload {
    /// Producer timestamp carried inside the payload.
    pub timestamp: i64,

    /// Readout frames, in producer order.
    pub frames: Vec<Frame>,
}

impl SubsystemPayload {
    pub fn new(timestamp: i64, frames: Vec<Frame>) -> Self {
        Self { timestamp, frames }
    }

    /// Move every frame of `other` onto the end of this payload.
    pub fn append_frames(&mut self, other: SubsystemPayload) {
        self.frames.extend(other.frames);
    }

    /// Total number of 32-bit words across all frames.
    pub fn total_words(&self) -> usize {
        self.frames.iter().map(|f| f.words.len()).sum()
    }
}

/// Little-endian cursor over a byte buffer with explicit underrun checks.
pub struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(Error::BufferUnderrun {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.buf[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(i64::from_le_bytes(raw))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(u32::from_le_bytes(raw))
    }

    /// Read `count` little-endian words, validating the byte span first so
    /// the allocation is bounded by the actual input size.
    pub fn read_words(&mut self, count: usize) -> Result<Vec<u32>> {
        let needed = count
            .checked_mul(4)
            .ok_or(Error::BufferUnderrun {
                needed: usize::MAX,
                remaining: self.remaining(),
            })?;
        self.ensure(needed)?;
        let mut words = Vec::with_capacity(count);
        for _ in 0..count {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
            self.pos += 4;
            words.push(u32::from_le_bytes(raw));
        }
        Ok(words)
    }
}

/// Decode one subsystem payload from its fragment payload bytes.
pub fn decode_payload(buf: &[u8]) -> Result<SubsystemPayload> {
    let mut reader = FrameReader::new(buf);

    let timestamp = reader.read_i64()?;
    let num_frames = reader.read_u32()?;

    let mut frames = Vec::new();
    for _ in 0..num_frames {
        let num_words = reader.read_u32()? as usize;
        let words = reader.read_words(num_words)?;
        frames.push(Frame::new(words));
    }

    Ok(SubsystemPayload { timestamp, frames })
}

/// Encode a subsystem payload into fragment payload bytes.
pub fn encode_payload(payload: &SubsystemPayload) -> Bytes {
    let words: usize = payload.total_words();
    let mut buf = BytesMut::with_capacity(12 + payload.frames.len() * 4 + words * 4);

    buf.put_i64_le(payload.timestamp);
    buf.put_u32_le(payload.frames.len() as u32);
    for frame in &payload.frames {
        buf.put_u32_le(frame.words.len() as u32);
        for word in &frame.words {
            buf.put_u32_le(*word);
        }
    }

    buf.freeze()
}
