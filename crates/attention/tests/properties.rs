//! Property tests for the attention synthesiser's structural invariants
//! (tile alignment, leading-dimension legality, determinism) — no GPU
//! required. Numerical agreement with a reference softmax implementation
//! lives in the workspace-level `conformance-tests` crate, which has a
//! CPU reference model to compare against; this crate only checks the
//! synthesiser's own structural invariants.

use kernelforge_attention::{AttentionDescriptor, AttentionKernel, AttentionPrecisions, KernelType};
use kernelforge_core::Precision;
use proptest::prelude::*;

fn any_precision() -> impl Strategy<Value = Precision> {
    prop_oneof![
        Just(Precision::FP32),
        Just(Precision::FP16),
        Just(Precision::BF16),
    ]
}

fn any_kernel_type() -> impl Strategy<Value = KernelType> {
    prop_oneof![
        Just(KernelType::Forward { store_logsumexp: true }),
        Just(KernelType::Forward { store_logsumexp: false }),
        Just(KernelType::BackwardQuery { store_derivative_st: true }),
        Just(KernelType::BackwardKeyValue { store_derivative_st: true }),
        Just(KernelType::BackwardKeyValue { store_derivative_st: false }),
    ]
}

proptest! {
    /// Block size is always a multiple of 8 and threadgroup size always
    /// a multiple of the SIMD width, regardless of shape or precision.
    #[test]
    fn tile_alignment_invariant(
        r in 1u32..2000, c in 1u32..2000, d in 1u16..200,
        q in any_precision(), k in any_precision(), v in any_precision(), o in any_precision(),
        kernel_type in any_kernel_type(),
    ) {
        let descriptor = AttentionDescriptor::new(
            r, c, d,
            AttentionPrecisions { q, k, v, o },
            kernel_type,
        );
        let kernel = AttentionKernel::synthesize(&descriptor).unwrap();

        prop_assert_eq!(kernel.block_size() % 8, 0);
        prop_assert_eq!(kernel.threadgroup_size() % 32, 0);
    }

    /// The `dS^T` scratch stride is always a ceiling-rounding of `C` to
    /// a multiple of the block size, and never smaller than `C` itself.
    #[test]
    fn leading_dimension_derivative_st_invariant(
        r in 1u32..2000, c in 1u32..2000, d in 1u16..200,
    ) {
        let descriptor = AttentionDescriptor::new(
            r, c, d,
            AttentionPrecisions::uniform(Precision::FP16),
            KernelType::BackwardKeyValue { store_derivative_st: true },
        );
        let kernel = AttentionKernel::synthesize(&descriptor).unwrap();
        let block = kernel.block_size() as u32;

        prop_assert_eq!(kernel.leading_dimension_derivative_st() % block, 0);
        prop_assert!(kernel.leading_dimension_derivative_st() >= c);
    }

    /// Determinism: two identical descriptors produce byte-identical
    /// shader source.
    #[test]
    fn determinism(
        r in 1u32..500, c in 1u32..500, d in 1u16..128,
        kernel_type in any_kernel_type(),
    ) {
        let descriptor = AttentionDescriptor::new(
            r, c, d,
            AttentionPrecisions::uniform(Precision::FP16),
            kernel_type,
        );
        let k1 = AttentionKernel::synthesize(&descriptor).unwrap();
        let k2 = AttentionKernel::synthesize(&descriptor).unwrap();
        prop_assert_eq!(k1.shader_source(), k2.shader_source());
    }
}

#[test]
fn zero_any_dimension_is_rejected() {
    let mem = AttentionPrecisions::uniform(Precision::FP16);
    let kernel_type = KernelType::Forward { store_logsumexp: true };
    assert!(AttentionKernel::synthesize(&AttentionDescriptor::new(0, 64, 32, mem, kernel_type)).is_err());
    assert!(AttentionKernel::synthesize(&AttentionDescriptor::new(64, 0, 32, mem, kernel_type)).is_err());
    assert!(AttentionKernel::synthesize(&AttentionDescriptor::new(64, 64, 0, mem, kernel_type)).is_err());
}

#[test]
fn forward_and_backward_query_share_block_size_for_same_d() {
    // Rb and Cb are the same function of D, so
    // the three cooperating kernels for one attention op always agree on
    // block size even though they block different axes.
    let mem = AttentionPrecisions::uniform(Precision::BF16);
    let forward = AttentionKernel::synthesize(&AttentionDescriptor::new(
        300, 300, 64, mem, KernelType::Forward { store_logsumexp: true },
    ))
    .unwrap();
    let backward_query = AttentionKernel::synthesize(&AttentionDescriptor::new(
        300, 300, 64, mem, KernelType::BackwardQuery { store_derivative_st: true },
    ))
    .unwrap();
    let backward_kv = AttentionKernel::synthesize(&AttentionDescriptor::new(
        300, 300, 64, mem, KernelType::BackwardKeyValue { store_derivative_st: true },
    ))
    .unwrap();

    assert_eq!(forward.block_size(), backward_query.block_size());
    assert_eq!(forward.block_size(), backward_kv.block_size());
}
