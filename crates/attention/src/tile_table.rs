//! Default row/column block size and threadgroup size for attention
//! kernels, keyed on head dimension (larger `D` needs a narrower block
//! to keep the per-thread register footprint of the streamed operand
//! tile bounded).

/// Default block size along the blocked axis (`Rb` for forward /
/// backward-query, `Cb` for backward-key-value).
///
/// Always a multiple of 8 (the register-tile width) so the streaming
/// inner loop can unroll over whole register tiles without a remainder.
pub fn default_block_size(d: u16) -> u16 {
    if d <= 32 {
        64
    } else if d <= 64 {
        32
    } else {
        16
    }
}

/// Default threadgroup size for a given blocked-axis block size.
///
/// One SIMD group (32 threads) per 32 rows/columns of the block, capped
/// at 4 SIMD groups (128 threads) the same way the GEMM synthesiser caps
/// `Ms * Ns` at 4.
pub fn default_threadgroup_size(block_size: u16) -> u32 {
    let simd_groups = (block_size as u32 / 32).clamp(1, 4);
    32 * simd_groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smaller_d_gets_wider_block() {
        assert!(default_block_size(16) >= default_block_size(64));
        assert!(default_block_size(64) >= default_block_size(128));
    }

    #[test]
    fn block_size_always_multiple_of_eight() {
        for d in [1u16, 2, 3, 32, 64, 77, 80, 128] {
            assert_eq!(default_block_size(d) % 8, 0);
        }
    }

    #[test]
    fn threadgroup_size_is_multiple_of_simd_width() {
        for block in [16u16, 32, 64] {
            assert_eq!(default_threadgroup_size(block) % 32, 0);
        }
    }
}
