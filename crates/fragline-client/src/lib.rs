//! Producer-side client for the fragline event builder.
//!
//! - [`FragmentSender`]: delivers one fragment per TCP connection, the way
//!   the ingest server expects them
//! - [`Simulator`]: drives the pipeline with randomized multi-subsystem
//!   traffic for load and soak testing

pub mod error;
pub mod sender;
pub mod simulator;

pub use error::{ClientError, Result};
pub use sender::FragmentSender;
pub use simulator::{SimulationReport, Simulator, SimulatorConfig};
