//! Error types for framepool.

use crate::pool::BufferId;
use thiserror::Error;

/// Result type alias using framepool's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pool operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Memory allocation failed.
    #[error("memory allocation failed: {0}")]
    AllocationFailed(String),

    /// The buffer id was retired by eviction or never allocated.
    ///
    /// Retired ids are permanently invalid; they are never rebound to a
    /// different memory segment.
    #[error("unknown buffer id: {0}")]
    UnknownBuffer(BufferId),

    /// The segment's backing memory has no cross-process handle.
    #[error("segment cannot be shared across processes")]
    NotShareable,

    /// System call error (via rustix).
    #[error("system error: {0}")]
    System(#[from] rustix::io::Errno),
}
