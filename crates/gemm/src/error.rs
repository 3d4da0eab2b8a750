//! GEMM-level result/error aliases.
//!
//! Every descriptor error the GEMM synthesiser can raise is already
//! covered by [`kernelforge_core::Error`] (illegal precision pairs, a
//! `BF16` accumulator, an undersized leading-dimension override, or a
//! misaligned split); this crate simply re-exports that boundary type
//! rather than wrapping it in an otherwise-empty variant of its own.

pub use kernelforge_core::error::{Error, Result};
