//! Shared foundations for the kernelforge kernel synthesisers.
//!
//! This crate defines the types every synthesiser (GEMM, attention) and
//! every downstream consumer (pipeline cache, dispatch planner) needs:
//!
//! - [`Precision`]: the three operand precisions and their legal pairings.
//! - [`Operand`]: a tagged variant replacing stringly-typed operand selection.
//! - [`DeviceProfile`]: the explicit, caller-constructed stand-in for
//!   "device properties" that tile-selection rules read from.
//! - [`Error`]: descriptor-level errors shared by both synthesisers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device_profile;
pub mod error;
pub mod operand;
pub mod precision;

pub use device_profile::{DeviceClass, DeviceProfile};
pub use error::{Error, Result};
pub use operand::Operand;
pub use precision::Precision;

/// Width of one SIMD group's square register tile, in elements per side.
///
/// Fixed across the whole system: every accumulator is built from
/// `8x8` register tiles, never a different size. See the glossary entry
/// "Register tile".
pub const REGISTER_TILE_DIM: u16 = 8;

/// Number of SIMD lanes in a threadgroup's SIMD group.
pub const SIMD_WIDTH: u16 = 32;

/// Smallest integer `m >= value` that is a multiple of `multiple`.
///
/// `multiple` must be nonzero. Used throughout the synthesisers for
/// padding scratch-buffer strides and edge-block bookkeeping.
pub fn ceil_to_multiple(value: u32, multiple: u32) -> u32 {
    debug_assert!(multiple > 0, "ceil_to_multiple: multiple must be nonzero");
    value.div_ceil(multiple) * multiple
}

/// Ceiling division: the smallest integer `q` such that `q * divisor >= dividend`.
///
/// `divisor` must be nonzero.
pub fn ceil_div(dividend: u32, divisor: u32) -> u32 {
    debug_assert!(divisor > 0, "ceil_div: divisor must be nonzero");
    dividend.div_ceil(divisor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_to_multiple_exact() {
        assert_eq!(ceil_to_multiple(32, 8), 32);
    }

    #[test]
    fn ceil_to_multiple_rounds_up() {
        assert_eq!(ceil_to_multiple(33, 8), 40);
        assert_eq!(ceil_to_multiple(1, 32), 32);
    }

    #[test]
    fn ceil_div_matches_ceil_to_multiple_over_divisor() {
        for dividend in [1u32, 7, 8, 9, 31, 32, 151] {
            for divisor in [1u32, 8, 32] {
                assert_eq!(
                    ceil_div(dividend, divisor),
                    ceil_to_multiple(dividend, divisor) / divisor
                );
            }
        }
    }
}
