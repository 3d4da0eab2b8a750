//! Grid/threadgroup sizing for a single GEMM dispatch.

use kernelforge_cache::device::GridSize;
use kernelforge_core::{ceil_div, DeviceProfile};
use kernelforge_gemm::GemmKernel;

use crate::error::{Error, Result};

/// A single GEMM dispatch: grid size, threadgroup size, and the
/// threadgroup-memory allocation the kernel requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemmDispatch {
    /// `(ceilDiv(N, Nb), ceilDiv(M, Mb), 1)`.
    pub grid: GridSize,
    /// `(threadgroupSize, 1, 1)`.
    pub group: GridSize,
    /// Threadgroup-memory bytes to declare for this dispatch.
    pub threadgroup_memory_bytes: u32,
}

/// Compute the dispatch record for `kernel`, validating its resource
/// requirements against `device_profile`'s limits.
pub fn plan_gemm_dispatch(kernel: &GemmKernel, device_profile: DeviceProfile) -> Result<GemmDispatch> {
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

    tracing::debug!(
        grid_x = grid.x, grid_y = grid.y,
        group_x = group.x,
        threadgroup_memory_bytes = kernel.threadgroup_memory_allocation(),
        "planned GEMM dispatch"
    );

    Ok(GemmDispatch {
        grid,
        group,
        threadgroup_memory_bytes: kernel.threadgroup_memory_allocation(),
    })
}
