//! Error types for `likeindex`.
//!
//! Pattern parsing never fails and lookup misses are reported as empty
//! results, so the variants below only cover capacity, bookkeeping and
//! configuration failures. Error codes follow the pattern `LIKEIDX-XXX`.

use thiserror::Error;

/// Result type alias for `likeindex` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in index operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Capacity growth failed (LIKEIDX-001).
    ///
    /// The allocation backing the record store could not be grown. The index
    /// is left exactly as it was before the failing call.
    #[error("[LIKEIDX-001] Allocation failed: {0}")]
    Allocation(#[from] std::collections::TryReserveError),

    /// Record index space exhausted (LIKEIDX-002).
    #[error("[LIKEIDX-002] Record capacity exceeded: {0} slots, limit is u32::MAX")]
    CapacityExceeded(usize),

    /// Internal bookkeeping is inconsistent (LIKEIDX-003).
    ///
    /// Indicates a bug in mutation bookkeeping. Please report if encountered.
    #[error("[LIKEIDX-003] Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration error (LIKEIDX-004).
    #[error("[LIKEIDX-004] Configuration error: {0}")]
    Config(String),

    /// Unknown or dropped index handle (LIKEIDX-005).
    #[error("[LIKEIDX-005] Index handle {0} not found")]
    HandleNotFound(u64),

    /// Rebuild source yielded different records on its two passes (LIKEIDX-006).
    #[error("[LIKEIDX-006] Record source changed during rebuild: {0}")]
    SourceChanged(String),
}

impl Error {
    /// Returns the error code (e.g., "LIKEIDX-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Allocation(_) => "LIKEIDX-001",
            Self::CapacityExceeded(_) => "LIKEIDX-002",
            Self::InvariantViolation(_) => "LIKEIDX-003",
            Self::Config(_) => "LIKEIDX-004",
            Self::HandleNotFound(_) => "LIKEIDX-005",
            Self::SourceChanged(_) => "LIKEIDX-006",
        }
    }

    /// Returns true if the index can still be used after this error.
    ///
    /// An invariant violation means the bitmaps can no longer be trusted and
    /// the index should be rebuilt from its source.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvariantViolation(_))
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
