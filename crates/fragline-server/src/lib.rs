//! Ingest server and builder loop for the fragline event builder.
//!
//! The pieces assembled by the server binary:
//!
//! - [`IngestServer`]: accepts one-fragment-per-connection TCP producers,
//!   validates integrity and feeds the shared
//!   [`FragmentBuffer`](fragline_buffer::FragmentBuffer)
//! - [`BuilderLoop`]: polls the buffer against the wall clock, draining
//!   complete coherence windows eagerly and expired ones forcibly
//! - [`EventSink`]: consumes assembled events, reports them and optionally
//!   folds partials into an [`EventMerger`](fragline_buffer::EventMerger)
//!
//! All workers poll one shared `Arc<AtomicBool>` shutdown flag at every loop
//! turn and exit cooperatively.

pub mod builder;
pub mod config;
pub mod error;
pub mod ingest;
pub mod sink;

pub use builder::{now_ns, BuilderLoop};
pub use config::{BuilderConfig, ServerConfig};
pub use error::{Result, ServerError};
pub use ingest::IngestServer;
pub use sink::EventSink;
