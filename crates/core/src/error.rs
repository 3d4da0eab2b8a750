//! Shared descriptor-level errors.
//!
//! Both synthesisers raise these synchronously at kernel construction;
//! they are always fatal for that one call, never retried by the core
//! itself.

use crate::{Operand, Precision};
use thiserror::Error;

/// Result type alias for kernelforge-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Descriptor-level errors shared by the GEMM and attention synthesisers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A (memory, register) precision pairing is illegal.
    ///
    /// Legal iff `register = memory ∨ register = FP32`.
    #[error("illegal precision pairing for operand {operand}: memory={memory}, register={register}")]
    IllegalPrecisionPair {
        /// Which operand the illegal pairing was requested for.
        operand: Operand,
        /// The operand's memory (storage) precision.
        memory: Precision,
        /// The operand's requested register (compute) precision.
        register: Precision,
    },

    /// The accumulator operand's register precision was `BF16`.
    ///
    /// `BF16`'s 8-bit mantissa corrupts reductions; accumulators require
    /// `FP32` or a precision equal to their own memory precision (and
    /// never `BF16`).
    #[error("accumulator operand {operand} may not use BF16 register precision")]
    Bf16Accumulator {
        /// The accumulator operand (GEMM's C, attention's running sum).
        operand: Operand,
    },

    /// A caller-supplied leading block dimension override was smaller
    /// than the expected extent for that operand's transpose state.
    #[error(
        "leading block dimension override for operand {operand} is {actual}, \
         but must be >= {expected}"
    )]
    UndersizedLeadingDimension {
        /// Operand whose override was rejected.
        operand: Operand,
        /// The minimum acceptable leading block dimension.
        expected: u16,
        /// The value the caller supplied.
        actual: u16,
    },

    /// Block dimensions and splits failed the tile-alignment invariant:
    /// `Mb mod (8*Ms) = 0` and `Nb mod (8*Ns) = 0`.
    #[error(
        "block dimension {block_dim} is not a multiple of 8 * split ({split}) along axis {axis}"
    )]
    MisalignedSplit {
        /// Which axis failed alignment (`"M"`, `"N"`, `"R"`, or `"C"`).
        axis: &'static str,
        /// The block dimension along that axis.
        block_dim: u16,
        /// The split factor along that axis.
        split: u16,
    },

    /// A matrix dimension (M, N, K, R, C, or D) was zero.
    #[error("matrix dimension {name} must be nonzero")]
    ZeroDimension {
        /// Name of the zero dimension (`"M"`, `"N"`, `"K"`, `"R"`, `"C"`, `"D"`).
        name: &'static str,
    },
}

impl Error {
    /// Whether this error originates from a precision mismatch (as
    /// opposed to a tiling/shape mismatch). Useful for callers that want
    /// to distinguish "caller picked an impossible dtype combination"
    /// from "caller picked an impossible tile size".
    pub fn is_precision_error(&self) -> bool {
        matches!(
            self,
            Error::IllegalPrecisionPair { .. } | Error::Bf16Accumulator { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_precision_pair_message_names_operand() {
        let err = Error::IllegalPrecisionPair {
            operand: Operand::A,
            memory: Precision::FP16,
            register: Precision::BF16,
        };
        let msg = err.to_string();
        assert!(msg.contains('A'));
        assert!(msg.contains("FP16") || msg.contains("half"));
    }

    #[test]
    fn is_precision_error_classification() {
        let precision_err = Error::Bf16Accumulator { operand: Operand::C };
        let shape_err = Error::ZeroDimension { name: "M" };
        assert!(precision_err.is_precision_error());
        assert!(!shape_err.is_precision_error());
    }
}
