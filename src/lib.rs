//! # kernelforge
//!
//! A kernel code-generator and dispatch planner for tiled GEMM and
//! FlashAttention-style fused attention kernels, targeting
//! transformer-training workloads on SIMD-group-matrix GPUs.
//!
//! Every synthesiser in this crate is a pure function: `descriptor ->
//! shader source text + tiling metadata`. Nothing here touches a GPU
//! driver — the output is deterministic, cacheable shader source and
//! the grid/threadgroup sizes needed to dispatch it, suitable for a
//! caller to compile and run through whatever GPU backend it has.
//!
//! # Quick Start
//!
//! ```
//! use kernelforge::gemm::{GemmDescriptor, GemmKernel, PrecisionTriple};
//! use kernelforge::core::{DeviceProfile, Precision};
//!
//! let descriptor = GemmDescriptor::new(512, 512, 512, PrecisionTriple::uniform(Precision::FP16));
//! let kernel = GemmKernel::synthesize(&descriptor, DeviceProfile::default())?;
//! assert!(kernel.shader_source().contains("kernel void gemm"));
//! # Ok::<(), kernelforge::core::Error>(())
//! ```
//!
//! # Crate layout
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | [`core`] | Shared precision/operand types, device profile, descriptor-level errors |
//! | [`gemm`] | Tiled GEMM descriptor and kernel synthesiser |
//! | [`attention`] | FlashAttention-style fused attention descriptor and kernel synthesiser |
//! | [`cache`] | Fingerprint-keyed pipeline cache, abstract `Device`/`Pipeline` traits |
//! | [`dispatch`] | Grid/threadgroup sizing and the five-step attention dispatch plan |
//!
//! Only the re-exports below are part of this crate's stable surface;
//! the member crates may be depended on directly by callers that only
//! need one synthesiser.

/// Shared precision/operand types, device profile, descriptor-level errors.
pub use kernelforge_core as core;
/// Tiled GEMM descriptor and kernel synthesiser.
pub use kernelforge_gemm as gemm;
/// FlashAttention-style fused attention descriptor and kernel synthesiser.
pub use kernelforge_attention as attention;
/// Fingerprint-keyed pipeline cache and abstract `Device`/`Pipeline` traits.
pub use kernelforge_cache as cache;
/// Grid/threadgroup sizing and the five-step attention dispatch plan.
pub use kernelforge_dispatch as dispatch;
