//! Errors raised while assembling drained fragment sets.

use fragline_core::Contributor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssemblyError {
    /// The assembler was handed an empty fragment set. The buffer never
    /// drains one, so this indicates a caller bug rather than bad data.
    #[error("empty fragment set")]
    EmptyDrain,

    /// A fragment payload failed to decode. The drain it belonged to is
    /// reported and discarded; the pipeline continues.
    #[error("assembly failed for {contributor} fragment at t={timestamp}: {source}")]
    AssemblyFailed {
        contributor: Contributor,
        timestamp: i64,
        #[source]
        source: fragline_core::Error,
    },
}

pub type Result<T> = std::result::Result<T, AssemblyError>;
