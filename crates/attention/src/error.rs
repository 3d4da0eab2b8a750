//! Attention-level result/error aliases.
//!
//! As with `kernelforge-gemm`, every descriptor error the attention
//! synthesiser can raise (illegal precision pairs, a `BF16` accumulator,
//! a zero dimension) is already covered by [`kernelforge_core::Error`].

pub use kernelforge_core::error::{Error, Result};
