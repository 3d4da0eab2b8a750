//! The static tile-selection table: default block dimensions and
//! default SIMD-group splits for a descriptor that left them unset.

use crate::descriptor::{BlockDimensions, PrecisionTriple, Splits};
use kernelforge_core::{DeviceClass, DeviceProfile, Precision};

/// Default block dimensions for a given memory-precision triple and
/// device class.
///
/// All-FP32 operands get the narrow `32x32x8` tile (FP32 is bandwidth-
/// bound by element size alone, so a shallow K block is enough to hide
/// latency). Any mixed or reduced-precision combination gets a deeper
/// `Kb=32` tile, widened to `48x48` on discrete GPUs that can amortize
/// the larger threadgroup-memory footprint.
pub fn default_block_dimensions(
    memory_precisions: PrecisionTriple,
    device_profile: DeviceProfile,
) -> BlockDimensions {
    let all_fp32 = memory_precisions.a == Precision::FP32
        && memory_precisions.b == Precision::FP32
        && memory_precisions.c == Precision::FP32;

    if all_fp32 {
        BlockDimensions { m: 32, n: 32, k: 8 }
    } else {
        match device_profile.class() {
            DeviceClass::Discrete => BlockDimensions {
                m: 48,
                n: 48,
                k: 32,
            },
            DeviceClass::Integrated => BlockDimensions {
                m: 32,
                n: 32,
                k: 32,
            },
        }
    }
}

/// Default SIMD-group splits for a given (already resolved) block.
///
/// Tries the most parallel split first (`Ms*Ns = 4`, a 128-thread
/// threadgroup), falling back to smaller splits when the block isn't
/// evenly divisible, per the tile-alignment invariant
/// `Mb mod (8*Ms) = 0`, `Nb mod (8*Ns) = 0`.
pub fn default_splits(block_dimensions: BlockDimensions) -> Splits {
    const CANDIDATES: [(u16, u16); 4] = [(2, 2), (2, 1), (1, 2), (1, 1)];

    for (m, n) in CANDIDATES {
        if block_dimensions.m % (8 * m) == 0 && block_dimensions.n % (8 * n) == 0 {
            return Splits { m, n };
        }
    }
    // (1, 1) always divides any block dimension that is itself a
    // multiple of 8, which every table entry above is by construction.
    Splits { m: 1, n: 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fp32_gets_narrow_k_block() {
        let block = default_block_dimensions(
            PrecisionTriple::uniform(Precision::FP32),
            DeviceProfile::integrated(),
        );
        assert_eq!(block, BlockDimensions { m: 32, n: 32, k: 8 });
    }

    #[test]
    fn mixed_precision_widens_on_discrete() {
        let mixed = PrecisionTriple {
            a: Precision::FP16,
            b: Precision::FP16,
            c: Precision::FP32,
        };
        let block = default_block_dimensions(mixed, DeviceProfile::discrete());
        assert_eq!(
            block,
            BlockDimensions {
                m: 48,
                n: 48,
                k: 32
            }
        );
    }

    #[test]
    fn mixed_precision_narrower_on_integrated() {
        let mixed = PrecisionTriple {
            a: Precision::BF16,
            b: Precision::BF16,
            c: Precision::FP32,
        };
        let block = default_block_dimensions(mixed, DeviceProfile::integrated());
        assert_eq!(
            block,
            BlockDimensions {
                m: 32,
                n: 32,
                k: 32
            }
        );
    }

    #[test]
    fn default_splits_satisfy_alignment_invariant() {
        for block in [
            BlockDimensions { m: 32, n: 32, k: 8 },
            BlockDimensions {
                m: 48,
                n: 48,
                k: 32,
            },
            BlockDimensions {
                m: 32,
                n: 32,
                k: 32,
            },
        ] {
            let splits = default_splits(block);
            assert_eq!(block.m % (8 * splits.m), 0);
            assert_eq!(block.n % (8 * splits.n), 0);
            assert!(splits.m * splits.n <= 4);
        }
    }
}
