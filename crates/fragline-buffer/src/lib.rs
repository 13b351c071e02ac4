//! Fragment buffering and event assembly for the fragline event builder.
//!
//! Three stages live here, in pipeline order:
//!
//! - [`FragmentBuffer`]: the time-indexed multimap that absorbs fragments
//!   from the ingest side and answers coherence-window queries from the
//!   builder loop
//! - [`assemble`]: merges a drained fragment set into one
//!   [`CombinedEvent`](fragline_core::CombinedEvent)
//! - [`EventMerger`]: the optional downstream stage consolidating partial
//!   events that share a logical event id
//!
//! The buffer and the merger are the only two pieces of shared mutable state
//! in the pipeline; each guards itself with a single mutex and never holds
//! it across anything that blocks.

pub mod assembler;
pub mod buffer;
pub mod error;
pub mod merger;

pub use assembler::assemble;
pub use buffer::FragmentBuffer;
pub use error::{AssemblyError, Result};
pub use merger::EventMerger;
