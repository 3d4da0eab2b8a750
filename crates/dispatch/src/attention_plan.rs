//! Dispatch-sequence planning for one attention forward/backward pass:
//! three attention kernels plus the two follow-up GEMMs that consume
//! `dS^T`.

use kernelforge_attention::{AttentionDescriptor, AttentionKernel, KernelType};
use kernelforge_cache::device::GridSize;
use kernelforge_core::{ceil_div, DeviceProfile, Precision};
use kernelforge_gemm::{
    tile_table, GemmDescriptor, GemmKernel, LeadingBlockDimensionOverrides, PrecisionTriple,
    TransposeState,
};

use crate::error::{Error, Result};

/// Fixed buffer binding indices for the attention forward/backward
/// kernels.
pub mod binding {
    /// Query operand.
    pub const Q: u32 = 0;
    /// Key operand.
    pub const K: u32 = 1;
    /// Value operand.
    pub const V: u32 = 2;
    /// Output operand.
    pub const O: u32 = 3;
    /// Logsumexp row statistic.
    pub const L: u32 = 4;
    /// Output gradient.
    pub const D_OUT: u32 = 5;
    /// Row-sum-of-(dO ⊙ O) statistic.
    pub const D_STAT: u32 = 6;
    /// Value gradient.
    pub const DV: u32 = 7;
    /// Transposed score-derivative scratch buffer.
    pub const DS_TRANSPOSE: u32 = 8;
}

/// One step of the five-step attention dispatch sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttentionStep {
    /// One of the three fused attention kernels (forward,
    /// backward-query, backward-key-value).
    Attention {
        /// Which of the three kernels this step dispatches.
        kernel_type: KernelType,
        /// Grid size for this step's dispatch.
        grid: GridSize,
        /// Threadgroup size for this step's dispatch.
        group: GridSize,
        /// Threadgroup-memory bytes this step's dispatch declares.
        threadgroup_memory_bytes: u32,
    },
    /// One of the two follow-up GEMMs that consume the `dS^T` scratch
    /// buffer (`dK = dS^T . Q` or `dQ += dS . K`).
    Gemm {
        /// Human-readable label (`"dK"` or `"dQ"`) for logging.
        label: &'static str,
        /// Grid size for this step's dispatch.
        grid: GridSize,
        /// Threadgroup size for this step's dispatch.
        group: GridSize,
        /// Threadgroup-memory bytes this step's dispatch declares.
        threadgroup_memory_bytes: u32,
    },
}

/// The full five-step plan for one attention op's forward and backward
/// pass: forward, backward-query, backward-key-value, `dK` GEMM,
/// `dQ` GEMM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttentionDispatchPlan {
    /// The five dispatch steps, in the order they must be submitted to
    /// a single serial command-buffer stream.
    pub steps: Vec<AttentionStep>,
}

/// Plan the full five-step sequence for one `(R, C, D)` attention op.
///
/// The two follow-up GEMMs always read `dS^T`'s scratch buffer in BF16
/// with B/C in FP32: `dK` uses transpose `(false, false)` and inner
/// dimension `C`; `dQ` uses transpose `(true, false)` reading the same
/// buffer.
pub fn plan_attention_dispatch(
    forward: &AttentionKernel,
    backward_query: &AttentionKernel,
    backward_key_value: &AttentionKernel,
    device_profile: DeviceProfile,
) -> Result<AttentionDispatchPlan> {
    let r = forward.descriptor().r;
    let c = forward.descriptor().c;
    let d = forward.descriptor().d;

    let forward_step = attention_step(forward, r, device_profile)?;
    let backward_query_step = attention_step(backward_query, r, device_profile)?;
    let backward_key_value_step = attention_step(backward_key_value, c, device_profile)?;

    // `leading_dimension_derivative_st` is the device-memory stride of the
    // `dS^T` scratch buffer, rounded to the attention kernel's own block
    // size; it has nothing to do with the leading *block* dimension the
    // follow-up GEMMs resolve for themselves, which can legitimately come
    // out larger (the two kernels tile the same buffer differently, and
    // `dK`/`dQ` read A with opposite transpose states, so they don't even
    // expect the same block axis). The override given to each GEMM must
    // never undercut its own resolved block extent, so widen it to
    // whichever of the two is larger.
    let leading_dimension_derivative_st = backward_key_value.leading_dimension_derivative_st();
    let derivative_st_precisions = PrecisionTriple {
        a: Precision::BF16,
        b: Precision::FP32,
        c: Precision::FP32,
    };
    let resolved_block = tile_table::default_block_dimensions(derivative_st_precisions, device_profile);
    // dK reads A untransposed: its leading dimension is the K-axis block.
    let dk_leading_a = std::cmp::max(leading_dimension_derivative_st, resolved_block.k as u32) as u16;
    // dQ reads the same buffer as A transposed: its leading dimension is
    // the M-axis block instead.
    let dq_leading_a = std::cmp::max(leading_dimension_derivative_st, resolved_block.m as u32) as u16;

    let dk_descriptor = GemmDescriptor::new(r, d as u32, c, derivative_st_precisions)
        .with_transpose(TransposeState::NN)
        .with_leading_block_dimensions(LeadingBlockDimensionOverrides {
            a: Some(dk_leading_a),
            ..Default::default()
        });
    let dk_kernel = GemmKernel::synthesize(&dk_descriptor, device_profile)?;
    let dk_step = gemm_step("dK", &dk_kernel, device_profile)?;

    let dq_descriptor = GemmDescriptor::new(r, d as u32, c, derivative_st_precisions)
        .with_transpose(TransposeState::TN)
        .with_leading_block_dimensions(LeadingBlockDimensionOverrides {
            a: Some(dq_leading_a),
            ..Default::default()
        });
    let dq_kernel = GemmKernel::synthesize(&dq_descriptor, device_profile)?;
    let dq_step = gemm_step("dQ", &dq_kernel, device_profile)?;

    tracing::debug!(r, c, d, "planned attention dispatch sequence");

    Ok(AttentionDispatchPlan {
        steps: vec![
            forward_step,
            backward_query_step,
            backward_key_value_step,
            dk_step,
            dq_step,
        ],
    })
}

fn attention_step(
    kernel: &AttentionKernel,
    blocked_extent: u32,
    device_profile: DeviceProfile,
) -> Result<AttentionStep> {
    if kernel.threadgroup_memory_allocation() > device_profile.max_threadgroup_memory_bytes {
        return Err(Error::ThreadgroupMemoryExceedsLimit {
            requested: kernel.threadgroup_memory_allocation(),
            limit: device_profile.max_threadgroup_memory_bytes,
        });
    }
    if kernel.threadgroup_size() > device_profile.max_threadgroup_threads {
        return Err(Error::ThreadgroupSizeExceedsLimit {
            requested: kernel.threadgroup_size(),
            limit: device_profile.max_threadgroup_threads,
        });
    }

    let grid = GridSize::new(ceil_div(blocked_extent, kernel.block_size() as u32), 1, 1);
    let group = GridSize::new(kernel.threadgroup_size(), 1, 1);

    Ok(AttentionStep::Attention {
        kernel_type: kernel.descriptor().kernel_type,
        grid,
        group,
        threadgroup_memory_bytes: kernel.threadgroup_memory_allocation(),
    })
}

fn gemm_step(label: &'static str, kernel: &GemmKernel, device_profile: DeviceProfile) -> Result<AttentionStep> {
    if kernel.threadgroup_memory_allocation() > device_profile.max_threadgroup_memory_bytes {
        return Err(Error::ThreadgroupMemoryExceedsLimit {
            requested: kernel.threadgroup_memory_allocation(),
            limit: device_profile.max_threadgroup_memory_bytes,
        });
    }
    if kernel.threadgroup_size() > device_profile.max_threadgroup_threads {
        return Err(Error::ThreadgroupSizeExceedsLimit {
            requested: kernel.threadgroup_size(),
            limit: device_profile.max_threadgroup_threads,
        });
    }

    let block = kernel.block_dimensions();
    let descriptor = kernel.descriptor();
    let grid = GridSize::new(
        ceil_div(descriptor.n, block.n as u32),
        ceil_div(descriptor.m, block.m as u32),
        1,
    );
    let group = GridSize::new(kernel.threadgroup_size(), 1, 1);

    Ok(AttentionStep::Gemm {
        label,
        grid,
        group,
        threadgroup_memory_bytes: kernel.threadgroup_memory_allocation(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernelforge_attention::AttentionPrecisions;

    fn synth(r: u32, c: u32, d: u16, kernel_type: KernelType) -> AttentionKernel {
        let descriptor = AttentionDescriptor::new(
            r, c, d,
            AttentionPrecisions::uniform(Precision::FP16),
            kernel_type,
        );
        AttentionKernel::synthesize(&descriptor).unwrap()
    }

    #[test]
    fn plan_has_five_steps_in_order() {
        let forward = synth(128, 128, 64, KernelType::Forward { store_logsumexp: true });
        let backward_query = synth(128, 128, 64, KernelType::BackwardQuery { store_derivative_st: true });
        let backward_kv = synth(128, 128, 64, KernelType::BackwardKeyValue { store_derivative_st: true });

        let plan = plan_attention_dispatch(&forward, &backward_query, &backward_kv, DeviceProfile::default())
            .unwrap();

        assert_eq!(plan.steps.len(), 5);
        assert!(matches!(plan.steps[0], AttentionStep::Attention { kernel_type: KernelType::Forward { .. }, .. }));
        assert!(matches!(plan.steps[1], AttentionStep::Attention { kernel_type: KernelType::BackwardQuery { .. }, .. }));
        assert!(matches!(plan.steps[2], AttentionStep::Attention { kernel_type: KernelType::BackwardKeyValue { .. }, .. }));
        assert!(matches!(plan.steps[3], AttentionStep::Gemm { label: "dK", .. }));
        assert!(matches!(plan.steps[4], AttentionStep::Gemm { label: "dQ", .. }));
    }

    #[test]
    fn forward_step_grid_matches_ceil_div_of_block_size() {
        let forward = synth(300, 300, 64, KernelType::Forward { store_logsumexp: true });
        let backward_query = synth(300, 300, 64, KernelType::BackwardQuery { store_derivative_st: true });
        let backward_kv = synth(300, 300, 64, KernelType::BackwardKeyValue { store_derivative_st: true });

        let plan = plan_attention_dispatch(&forward, &backward_query, &backward_kv, DeviceProfile::default())
            .unwrap();

        if let AttentionStep::Attention { grid, .. } = &plan.steps[0] {
            assert_eq!(grid.x, ceil_div(300, forward.block_size() as u32));
        } else {
            panic!("expected first step to be the forward attention dispatch");
        }
    }
}
