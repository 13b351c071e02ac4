//! Server-side errors.
//!
//! Bind and listen failures are fatal to the ingest server; everything else
//! is contained to the connection or drain it happened on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] fragline_core::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
