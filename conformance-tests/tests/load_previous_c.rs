//! Load-previous-C idempotence.
//!
//! Without a GPU driver there is no executed buffer to compare; instead
//! this checks the one thing the synthesiser controls: a kernel
//! synthesised with `loadPreviousC=true` differs from its
//! `loadPreviousC=false` twin only in the accumulator-seeding preamble,
//! never in tiling metadata (so the accumulate path can never silently
//! pick a different block/register layout than the zero-init path).

use kernelforge_core::{DeviceProfile, Precision};
use kernelforge_gemm::{GemmDescriptor, GemmKernel, PrecisionTriple};

#[test]
fn load_previous_c_leaves_tiling_metadata_unchanged() {
    for &(m, n, k) in &[(64u32, 64u32, 64u32), (127, 65, 33), (512, 512, 512)] {
        let base = GemmDescriptor::new(m, n, k, PrecisionTriple::uniform(Precision::FP32));
        let accumulate = base.clone().with_load_previous_c(true);

        let zero_init = GemmKernel::synthesize(&base, DeviceProfile::default()).unwrap();
        let accumulate = GemmKernel::synthesize(&accumulate, DeviceProfile::default()).unwrap();

        assert_eq!(zero_init.block_dimensions(), accumulate.block_dimensions());
        assert_eq!(zero_init.splits(), accumulate.splits());
        assert_eq!(zero_init.threadgroup_size(), accumulate.threadgroup_size());
        assert_eq!(
            zero_init.threadgroup_memory_allocation(),
            accumulate.threadgroup_memory_allocation()
        );
        assert_eq!(zero_init.edge_shift(), accumulate.edge_shift());
        assert_ne!(zero_init.shader_source(), accumulate.shader_source());
    }
}
