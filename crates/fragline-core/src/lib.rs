//! Core types and codecs for the fragline event builder.
//!
//! This crate defines the data model shared by every stage of the pipeline:
//!
//! - [`Contributor`]: the closed set of detector subsystems
//! - [`Fragment`]: one subsystem's contribution for one trigger instant
//! - [`SubsystemPayload`]: the decoded frame content of a fragment payload
//! - [`CombinedEvent`]: the multi-subsystem record produced by assembly
//!
//! and the two codecs that move fragments across process boundaries:
//!
//! - [`wire`]: the length-prefixed, CRC-trailed TCP message format
//! - [`frame`]: the little-endian frame container inside a fragment payload
//!
//! All functions return [`Result`], aliased to `Result<T, Error>`, so `?`
//! propagation works throughout the pipeline crates.

pub mod contributor;
pub mod error;
pub mod event;
pub mod fragment;
pub mod frame;
pub mod wire;

pub use contributor::Contributor;
pub use error::{Error, Result};
pub use event::CombinedEvent;
pub use fragment::Fragment;
pub use frame::{decode_payload, encode_payload, Frame, FrameReader, SubsystemPayload};
