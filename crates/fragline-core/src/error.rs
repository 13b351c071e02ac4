//! Error Types for Fragline Core
//!
//! This module defines all error types that can occur in the codec and
//! data-model layer.
//!
//! ## Error Categories
//!
//! ### I/O Errors
//! - Socket reads in the ingest path
//! - File reads in the capture decoder
//!
//! ### Data Integrity Errors
//! - `ChecksumMismatch`: fragment payload corruption detected via CRC-32
//! - `BufferUnderrun`: a decode would read past the end of its input
//!
//! ### Protocol Errors
//! - `UnknownContributor`: a wire tag outside the closed subsystem set
//! - `PayloadTooLarge`: a declared payload size above the configured cap
//!
//! ## Usage
//! All fallible functions in this crate return `Result<T>` which is aliased
//! to `Result<T, Error>`, allowing `?` propagation up to the pipeline stages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    #[error("buffer underrun: needed {needed} bytes, {remaining} remaining")]
    BufferUnderrun { needed: usize, remaining: usize },

    #[error("unknown contributor tag: {0}")]
    UnknownContributor(u64),

    #[error("payload too large: {size} bytes (cap {max})")]
    PayloadTooLarge { size: u64, max: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
