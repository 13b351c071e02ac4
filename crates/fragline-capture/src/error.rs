//! Errors raised while decoding a raw capture.
//!
//! Sync loss and mis-sized frames are not errors at this level - the
//! decoder slides its window and continues. Only real I/O failures and
//! sink failures surface.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("packet sink failed: {0}")]
    Sink(#[from] fragline_core::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
