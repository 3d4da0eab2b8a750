//! Dispatch-level errors: a synthesised kernel's resource requirements
//! exceed a configured device's limits.

use thiserror::Error;

/// Result type alias for kernelforge-dispatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while turning a synthesised kernel into a dispatch
/// record. Raised synchronously; the dispatch is never issued.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The kernel's threadgroup-memory allocation exceeds the device's
    /// limit.
    #[error("threadgroup memory allocation {requested} exceeds device limit {limit}")]
    ThreadgroupMemoryExceedsLimit {
        /// Bytes the kernel requires.
        requested: u32,
        /// Bytes the device profile allows.
        limit: u32,
    },

    /// The kernel's threadgroup thread count exceeds the device's limit.
    #[error("threadgroup size {requested} exceeds device limit {limit}")]
    ThreadgroupSizeExceedsLimit {
        /// Threads the kernel requires per threadgroup.
        requested: u32,
        /// Threads the device profile allows per threadgroup.
        limit: u32,
    },

    /// Synthesising one of the two follow-up GEMMs (`dK`, `dQ`) in an
    /// attention dispatch plan failed. This indicates the attention
    /// descriptor's own `R`/`C`/`D` produced a follow-up GEMM shape the
    /// tile-selection table cannot resolve, not a problem with the
    /// follow-up GEMM descriptor construction itself.
    #[error("follow-up GEMM synthesis failed: {0}")]
    FollowUpGemmSynthesis(#[from] kernelforge_gemm::Error),
}

impl Error {
    /// Whether this error is a resource-limit violation (currently
    /// always true; kept for symmetry with sibling crates' error enums
    /// and to absorb future non-limit variants without breaking
    /// callers that match on it).
    pub fn is_resource_limit_error(&self) -> bool {
        matches!(
            self,
            Error::ThreadgroupMemoryExceedsLimit { .. } | Error::ThreadgroupSizeExceedsLimit { .. }
        )
    }
}
