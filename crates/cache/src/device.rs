//! Abstract host/device capability traits.
//!
//! Nothing in this crate depends on a concrete GPU backend. `Device`
//! and `Pipeline` let the pipeline cache and dispatch planner be
//! exercised and tested without a real backend behind them.

/// A compiled, dispatchable kernel.
///
/// Thread safety: a `Pipeline` is shared across every caller that hits
/// the same fingerprint, so it must be safe to dispatch concurrently
/// from multiple threads.
pub trait Pipeline: Send + Sync {
    /// An opaque, backend-defined identifier useful for logging/tracing.
    fn debug_name(&self) -> &str;
}

/// An opaque device buffer handle. Buffers are externally owned; the
/// core neither allocates nor frees the memory behind them, only the
/// handle.
pub trait Buffer: Send + Sync {
    /// Size of the buffer in bytes.
    fn byte_len(&self) -> usize;
}

/// One binding in a dispatch: a buffer at a fixed index.
pub struct Binding<'a> {
    /// Buffer binding index the shader's entry point expects this
    /// buffer at.
    pub index: u32,
    /// The bound buffer.
    pub buffer: &'a dyn Buffer,
}

/// Three-dimensional grid or threadgroup size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize {
    /// Width.
    pub x: u32,
    /// Height.
    pub y: u32,
    /// Depth.
    pub z: u32,
}

impl GridSize {
    /// Construct a grid size.
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

/// A pair of GPU timestamps bracketing one dispatch, in nanoseconds
/// since an arbitrary epoch chosen by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuTimestamps {
    /// Timestamp sampled just before the dispatch began executing.
    pub gpu_start_ns: u64,
    /// Timestamp sampled just after the dispatch finished executing.
    pub gpu_end_ns: u64,
}

/// Abstract GPU device capability: compile shader source, allocate
/// buffers, and encode dispatches.
///
/// Object-safe and `Send + Sync` so callers can hold a `dyn Device`
/// without knowing the concrete backend.
pub trait Device: Send + Sync {
    /// Compile shader source text into a pipeline. Fails with the
    /// offending source text attached if compilation is rejected by the
    /// backend.
    fn compile(&self, source: &str) -> Result<std::sync::Arc<dyn Pipeline>, String>;

    /// Allocate a device buffer of `bytes` length.
    fn create_buffer(&self, bytes: usize) -> std::sync::Arc<dyn Buffer>;

    /// Encode and submit one dispatch.
    fn encode_dispatch(
        &self,
        pipeline: &dyn Pipeline,
        grid: GridSize,
        group: GridSize,
        threadgroup_memory_bytes: u32,
        bindings: &[Binding<'_>],
    ) -> GpuTimestamps;
}
