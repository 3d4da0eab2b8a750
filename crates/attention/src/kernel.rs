//! The synthesised attention kernel: resolved blocking metadata plus
//! emitted shader source text.

use crate::descriptor::{AttentionDescriptor, KernelType};
use crate::error::{Error, Result};
use crate::{shader, tile_table};
use kernelforge_core::ceil_to_multiple;

/// A fully synthesised attention kernel (one of forward, backward-query,
/// backward-key-value).
///
/// As with [`kernelforge_gemm::GemmKernel`], synthesis is a pure
/// function of the descriptor: two equal descriptors always produce
/// byte-identical `shader_source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttentionKernel {
    descriptor: AttentionDescriptor,
    block_size: u16,
    threadgroup_size: u32,
    threadgroup_memory_allocation: u32,
    leading_dimension_derivative_st: u32,
    shader_source: String,
}

impl AttentionKernel {
    /// Synthesise a kernel from a descriptor.
    pub fn synthesize(descriptor: &AttentionDescriptor) -> Result<Self> {
        validate_dimensions(descriptor)?;

        let block_size = tile_table::default_block_size(descriptor.d);
        let threadgroup_size = tile_table::default_threadgroup_size(block_size);
        let leading_dimension_derivative_st =
            ceil_to_multiple(descriptor.c, block_size as u32);
        let threadgroup_memory_allocation =
            compute_threadgroup_memory(descriptor, block_size);

        let shader_source = shader::emit_attention_source(&shader::AttentionShaderParams {
            descriptor,
            block_size,
            threadgroup_size,
            leading_dimension_derivative_st,
        });

        tracing::debug!(
            r = descriptor.r,
            c = descriptor.c,
            d = descriptor.d,
            kernel_type = ?descriptor.kernel_type,
            block_size,
            threadgroup_size,
            leading_dimension_derivative_st,
            "synthesised attention kernel"
        );

        Ok(Self {
            descriptor: *descriptor,
            block_size,
            threadgroup_size,
            threadgroup_memory_allocation,
            leading_dimension_derivative_st,
            shader_source,
        })
    }

    /// The descriptor this kernel was synthesised from.
    pub fn descriptor(&self) -> &AttentionDescriptor {
        &self.descriptor
    }

    /// `Rb` for forward/backward-query, `Cb` for backward-key-value.
    /// Both are the same function of `D`, so this single field serves
    /// both roles.
    pub fn block_size(&self) -> u16 {
        self.block_size
    }

    /// Threadgroup size for this kernel's dispatch.
    pub fn threadgroup_size(&self) -> u32 {
        self.threadgroup_size
    }

    /// Threadgroup-memory bytes needed to stage one chunk of the
    /// streamed operand(s).
    pub fn threadgroup_memory_allocation(&self) -> u32 {
        self.threadgroup_memory_allocation
    }

    /// `ceilToMultiple(C, Cb)`: the padded stride of the `dS^T` scratch
    /// buffer.
    pub fn leading_dimension_derivative_st(&self) -> u32 {
        self.leading_dimension_derivative_st
    }

    /// The emitted Metal-flavored shader source, containing one entry
    /// point named `attention`.
    pub fn shader_source(&self) -> &str {
        &self.shader_source
    }
}

fn validate_dimensions(descriptor: &AttentionDescriptor) -> Result<()> {
    if descriptor.r == 0 {
        return Err(Error::ZeroDimension { name: "R" });
    }
    if descriptor.c == 0 {
        return Err(Error::ZeroDimension { name: "C" });
    }
    if descriptor.d == 0 {
        return Err(Error::ZeroDimension { name: "D" });
    }
    Ok(())
}

/// Streamed operands per kernel type, and the threadgroup-memory bytes
/// needed to double-stage one `block_size x D` chunk of each.
fn compute_threadgroup_memory(descriptor: &AttentionDescriptor, block_size: u16) -> u32 {
    let mem = descriptor.memory_precisions;
    let (p1, p2) = match descriptor.kernel_type {
        KernelType::Forward { .. } | KernelType::BackwardQuery { .. } => (mem.k, mem.v),
        // dO is not modeled as a separate precision field; it shares O's
        // memory precision, as the two always round-trip through the
        // same buffer layout.
        KernelType::BackwardKeyValue { .. } => (mem.q, mem.o),
    };
    block_size as u32 * descriptor.d as u32 * (p1.byte_size() + p2.byte_size())
}
