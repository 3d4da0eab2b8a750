//! Metal-flavored shader source emission for attention kernels.
//!
//! All three kernel types share one streaming-softmax skeleton: a block
//! of the blocked operand lives in registers for the kernel's whole
//! lifetime, while the streamed operand(s) are paged through
//! threadgroup memory one `block_size`-row chunk at a time. What differs
//! per kernel type is which operands are blocked/streamed and what gets
//! written back at the end.

use std::fmt::Write as _;

use crate::descriptor::{AttentionDescriptor, KernelType};

pub(crate) struct AttentionShaderParams<'a> {
    pub descriptor: &'a AttentionDescriptor,
    pub block_size: u16,
    pub threadgroup_size: u32,
    pub leading_dimension_derivative_st: u32,
}

pub(crate) fn emit_attention_source(p: &AttentionShaderParams<'_>) -> String {
    let mut src = String::new();
    emit_header(&mut src, p);
    emit_function_constants(&mut src);
    emit_helper_functions(&mut src);
    match p.descriptor.kernel_type {
        KernelType::Forward { store_logsumexp } => emit_forward(&mut src, p, store_logsumexp),
        KernelType::BackwardQuery { .. } => emit_backward_query(&mut src, p),
        KernelType::BackwardKeyValue { store_derivative_st } => {
            emit_backward_key_value(&mut src, p, store_derivative_st)
        }
    }
    src
}

fn emit_header(src: &mut String, p: &AttentionShaderParams<'_>) {
    let d = p.descriptor;
    let _ = writeln!(src, "#include <metal_stdlib>");
    let _ = writeln!(src, "using namespace metal;");
    let _ = writeln!(src);
    let _ = writeln!(
        src,
        "// R={} C={} D={} kernel_type={:?} block_size={} threadgroup_size={}",
        d.r, d.c, d.d, d.kernel_type, p.block_size, p.threadgroup_size
    );
    let _ = writeln!(src, "constant uint R [[function_constant(0)]];");
    let _ = writeln!(src, "constant uint C [[function_constant(1)]];");
    let _ = writeln!(src, "constant ushort D [[function_constant(2)]];");
}

fn emit_function_constants(src: &mut String) {
    let _ = writeln!(src, "constant bool Q_TRANSPOSED [[function_constant(10)]];");
    let _ = writeln!(src, "constant bool K_TRANSPOSED [[function_constant(11)]];");
    let _ = writeln!(src, "constant bool V_TRANSPOSED [[function_constant(12)]];");
    let _ = writeln!(src, "constant bool O_TRANSPOSED [[function_constant(13)]];");
}

/// Shared free functions the three entry points below call: one
/// block-row async load, and one SIMD-cooperative row reduction used to
/// fold a partial dot product computed across lanes.
fn emit_helper_functions(src: &mut String) {
    let _ = writeln!(src);
    let _ = writeln!(src, "template<typename T>");
    let _ = writeln!(
        src,
        "void async_copy_block(threadgroup T *dst, device const T *src, uint row_origin, uint row_width) {{"
    );
    let _ = writeln!(
        src,
        "  simdgroup_event ev = simdgroup_async_copy(dst, row_width, src + row_origin * row_width, row_width);"
    );
    let _ = writeln!(src, "  simdgroup_event::wait(1, &ev);");
    let _ = writeln!(src, "}}");

    let _ = writeln!(src);
    let _ = writeln!(src, "template<typename T>");
    let _ = writeln!(
        src,
        "float dot_row(device const T *a, uint a_row, threadgroup const T *b, uint b_row, uint width) {{"
    );
    let _ = writeln!(src, "  float acc = 0.0;");
    let _ = writeln!(src, "  for (uint k = 0; k < width; k++) {{");
    let _ = writeln!(
        src,
        "    acc += (float)a[a_row * width + k] * (float)b[b_row * width + k];"
    );
    let _ = writeln!(src, "  }}");
    let _ = writeln!(src, "  return acc;");
    let _ = writeln!(src, "}}");
}

/// Declares the per-row streaming-softmax state shared by every kernel
/// type: `running_max`/`running_sum` over the `blocked_extent` rows held
/// in registers, plus an accumulator of width `D` rescaled alongside
/// them every time a new score block arrives.
fn emit_softmax_state(src: &mut String, p: &AttentionShaderParams<'_>) {
    let blocked = p.block_size as u32;
    let d = p.descriptor.d as u32;
    let _ = writeln!(src, "  float running_max[{}];", blocked);
    let _ = writeln!(src, "  float running_sum[{}];", blocked);
    let _ = writeln!(src, "  float accumulator[{}][{}];", blocked, d);
    let _ = writeln!(src, "  for (uint i = 0; i < {}; i++) {{", blocked);
    let _ = writeln!(src, "    running_max[i] = -INFINITY;");
    let _ = writeln!(src, "    running_sum[i] = 0.0;");
    let _ = writeln!(src, "    for (uint k = 0; k < {}; k++) accumulator[i][k] = 0.0;", d);
    let _ = writeln!(src, "  }}");
}

fn softmax_scale(d: u16) -> f64 {
    1.0 / (d as f64).sqrt()
}

fn emit_forward(src: &mut String, p: &AttentionShaderParams<'_>, store_logsumexp: bool) {
    let mem = p.descriptor.memory_precisions;
    let block = p.block_size as u32;
    let d = p.descriptor.d as u32;
    let scale = softmax_scale(p.descriptor.d);

    let _ = writeln!(src, "kernel void attention(");
    let _ = writeln!(src, "    device const {}* Q [[buffer(0)]],", mem.q.shader_name());
    let _ = writeln!(src, "    device const {}* K [[buffer(1)]],", mem.k.shader_name());
    let _ = writeln!(src, "    device const {}* V [[buffer(2)]],", mem.v.shader_name());
    let _ = writeln!(src, "    device {}* O [[buffer(3)]],", mem.o.shader_name());
    if store_logsumexp {
        let _ = writeln!(src, "    device float *L [[buffer(4)]],");
    }
    let _ = writeln!(src, "    uint3 tgid [[threadgroup_position_in_grid]],");
    let _ = writeln!(src, "    ushort sidx [[simdgroup_index_in_threadgroup]],");
    let _ = writeln!(src, "    ushort lane [[thread_index_in_simdgroup]]");
    let _ = writeln!(src, ") {{");
    let _ = writeln!(src, "  // Block Rb rows of Q into registers, stream K/V across C.");
    let _ = writeln!(src, "  const uint block_origin = tgid.x * {};", block);
    let _ = writeln!(src, "  const float SCALE = {:.10};", scale);
    let _ = writeln!(
        src,
        "  threadgroup {} streamed_k[{}];",
        mem.k.shader_name(),
        block * d
    );
    let _ = writeln!(
        src,
        "  threadgroup {} streamed_v[{}];",
        mem.v.shader_name(),
        block * d
    );
    emit_softmax_state(src, p);
    let _ = writeln!(src, "  for (uint c0 = 0; c0 < C; c0 += {}) {{", block);
    let _ = writeln!(src, "    async_copy_block(streamed_k, K, c0, {});", d);
    let _ = writeln!(src, "    async_copy_block(streamed_v, V, c0, {});", d);
    let _ = writeln!(src, "    threadgroup_barrier(mem_flags::mem_threadgroup);");
    let _ = writeln!(src, "    for (uint i = 0; i < {}; i++) {{", block);
    let _ = writeln!(src, "      for (uint col = 0; col < {}; col++) {{", block);
    let _ = writeln!(
        src,
        "        float score = dot_row(Q, block_origin + i, streamed_k, col, {}) * SCALE;",
        d
    );
    let _ = writeln!(src, "        float new_max = max(running_max[i], score);");
    let _ = writeln!(src, "        float correction = exp(running_max[i] - new_max);");
    let _ = writeln!(src, "        float p = exp(score - new_max);");
    let _ = writeln!(src, "        running_sum[i] = running_sum[i] * correction + p;");
    let _ = writeln!(src, "        for (uint k = 0; k < {}; k++) {{", d);
    let _ = writeln!(
        src,
        "          accumulator[i][k] = accumulator[i][k] * correction + p * (float)streamed_v[col * {} + k];",
        d
    );
    let _ = writeln!(src, "        }}");
    let _ = writeln!(src, "        running_max[i] = new_max;");
    let _ = writeln!(src, "      }}");
    let _ = writeln!(src, "    }}");
    let _ = writeln!(src, "    threadgroup_barrier(mem_flags::mem_threadgroup);");
    let _ = writeln!(src, "  }}");
    let _ = writeln!(src, "  for (uint i = 0; i < {}; i++) {{", block);
    let _ = writeln!(src, "    for (uint k = 0; k < {}; k++) {{", d);
    let _ = writeln!(
        src,
        "      O[(block_origin + i) * {} + k] = ({})(accumulator[i][k] / running_sum[i]);",
        d,
        mem.o.shader_name()
    );
    let _ = writeln!(src, "    }}");
    if store_logsumexp {
        let _ = writeln!(src, "    L[block_origin + i] = running_max[i] + log(running_sum[i]);");
    }
    let _ = writeln!(src, "  }}");
    let _ = writeln!(src, "}}");
}

fn emit_backward_query(src: &mut String, p: &AttentionShaderParams<'_>) {
    let mem = p.descriptor.memory_precisions;
    let block = p.block_size as u32;
    let d = p.descriptor.d as u32;
    let scale = softmax_scale(p.descriptor.d);

    let _ = writeln!(src, "kernel void attention(");
    let _ = writeln!(src, "    device const {}* Q [[buffer(0)]],", mem.q.shader_name());
    let _ = writeln!(src, "    device const {}* K [[buffer(1)]],", mem.k.shader_name());
    let _ = writeln!(src, "    device const {}* V [[buffer(2)]],", mem.v.shader_name());
    let _ = writeln!(src, "    device const {}* O [[buffer(3)]],", mem.o.shader_name());
    let _ = writeln!(src, "    device const {}* dO [[buffer(4)]],", mem.o.shader_name());
    let _ = writeln!(src, "    device const float *L [[buffer(5)]],");
    let _ = writeln!(src, "    device {}* dQ [[buffer(6)]],", mem.q.shader_name());
    let _ = writeln!(src, "    device float *D_stat [[buffer(7)]],");
    let _ = writeln!(src, "    uint3 tgid [[threadgroup_position_in_grid]],");
    let _ = writeln!(src, "    ushort sidx [[simdgroup_index_in_threadgroup]],");
    let _ = writeln!(src, "    ushort lane [[thread_index_in_simdgroup]]");
    let _ = writeln!(src, ") {{");
    let _ = writeln!(src, "  // Block Rb rows of Q/O/dO into registers, stream K/V across C.");
    let _ = writeln!(src, "  const uint block_origin = tgid.x * {};", block);
    let _ = writeln!(src, "  const float SCALE = {:.10};", scale);
    let _ = writeln!(
        src,
        "  threadgroup {} streamed_k[{}];",
        mem.k.shader_name(),
        block * d
    );
    let _ = writeln!(
        src,
        "  threadgroup {} streamed_v[{}];",
        mem.v.shader_name(),
        block * d
    );
    let _ = writeln!(src, "  float row_d_stat[{}];", block);
    let _ = writeln!(src, "  for (uint i = 0; i < {}; i++) {{", block);
    // dO and O both live in device memory, so this row reduction runs
    // directly against device pointers rather than the dot_row helper,
    // which expects one device and one threadgroup operand.
    let _ = writeln!(src, "    float acc = 0.0;");
    let _ = writeln!(src, "    for (uint k = 0; k < {}; k++) {{", d);
    let _ = writeln!(
        src,
        "      acc += (float)dO[(block_origin + i) * {0} + k] * (float)O[(block_origin + i) * {0} + k];",
        d
    );
    let _ = writeln!(src, "    }}");
    let _ = writeln!(src, "    row_d_stat[i] = acc;");
    let _ = writeln!(src, "    D_stat[block_origin + i] = acc;");
    let _ = writeln!(src, "  }}");
    let _ = writeln!(src, "  float accumulator[{}][{}];", block, d);
    let _ = writeln!(src, "  for (uint i = 0; i < {}; i++)", block);
    let _ = writeln!(
        src,
        "    for (uint k = 0; k < {}; k++) accumulator[i][k] = 0.0;",
        d
    );
    let _ = writeln!(src, "  for (uint c0 = 0; c0 < C; c0 += {}) {{", block);
    let _ = writeln!(src, "    async_copy_block(streamed_k, K, c0, {});", d);
    let _ = writeln!(src, "    async_copy_block(streamed_v, V, c0, {});", d);
    let _ = writeln!(src, "    threadgroup_barrier(mem_flags::mem_threadgroup);");
    let _ = writeln!(src, "    for (uint i = 0; i < {}; i++) {{", block);
    let _ = writeln!(src, "      for (uint col = 0; col < {}; col++) {{", block);
    let _ = writeln!(
        src,
        "        float score = dot_row(Q, block_origin + i, streamed_k, col, {}) * SCALE;",
        d
    );
    let _ = writeln!(src, "        float p = exp(score - L[block_origin + i]);");
    let _ = writeln!(src, "        float dp = 0.0;");
    let _ = writeln!(src, "        for (uint k = 0; k < {}; k++) {{", d);
    let _ = writeln!(
        src,
        "          dp += (float)dO[(block_origin + i) * {} + k] * (float)streamed_v[col * {} + k];",
        d, d
    );
    let _ = writeln!(src, "        }}");
    let _ = writeln!(src, "        float ds = p * (dp - row_d_stat[i]) * SCALE;");
    let _ = writeln!(src, "        for (uint k = 0; k < {}; k++) {{", d);
    let _ = writeln!(
        src,
        "          accumulator[i][k] += ds * (float)streamed_k[col * {} + k];",
        d
    );
    let _ = writeln!(src, "        }}");
    let _ = writeln!(src, "      }}");
    let _ = writeln!(src, "    }}");
    let _ = writeln!(src, "    threadgroup_barrier(mem_flags::mem_threadgroup);");
    let _ = writeln!(src, "  }}");
    let _ = writeln!(src, "  for (uint i = 0; i < {}; i++) {{", block);
    let _ = writeln!(src, "    for (uint k = 0; k < {}; k++) {{", d);
    let _ = writeln!(
        src,
        "      dQ[(block_origin + i) * {} + k] = ({})accumulator[i][k];",
        d,
        mem.q.shader_name()
    );
    let _ = writeln!(src, "    }}");
    let _ = writeln!(src, "  }}");
    let _ = writeln!(src, "}}");
}

fn emit_backward_key_value(
    src: &mut String,
    p: &AttentionShaderParams<'_>,
    store_derivative_st: bool,
) {
    let mem = p.descriptor.memory_precisions;
    let block = p.block_size as u32;
    let d = p.descriptor.d as u32;
    let scale = softmax_scale(p.descriptor.d);

    let _ = writeln!(src, "kernel void attention(");
    let _ = writeln!(src, "    device const {}* Q [[buffer(0)]],", mem.q.shader_name());
    let _ = writeln!(src, "    device const {}* K [[buffer(1)]],", mem.k.shader_name());
    let _ = writeln!(src, "    device const {}* V [[buffer(2)]],", mem.v.shader_name());
    let _ = writeln!(src, "    device const {}* O [[buffer(3)]],", mem.o.shader_name());
    let _ = writeln!(src, "    device const {}* dO [[buffer(4)]],", mem.o.shader_name());
    let _ = writeln!(src, "    device const float *L [[buffer(5)]],");
    let _ = writeln!(src, "    device const float *D_stat [[buffer(6)]],");
    let _ = writeln!(src, "    device {}* dV [[buffer(7)]],", mem.v.shader_name());
    if store_derivative_st {
        let _ = writeln!(
            src,
            "    device float *dS_transpose [[buffer(8)]], // leading dimension {}",
            p.leading_dimension_derivative_st
        );
    }
    let _ = writeln!(src, "    uint3 tgid [[threadgroup_position_in_grid]],");
    let _ = writeln!(src, "    ushort sidx [[simdgroup_index_in_threadgroup]],");
    let _ = writeln!(src, "    ushort lane [[thread_index_in_simdgroup]]");
    let _ = writeln!(src, ") {{");
    let _ = writeln!(src, "  // Block Cb rows of K/V into registers, stream Q/dO across R.");
    let _ = writeln!(src, "  const uint block_origin = tgid.x * {};", block);
    let _ = writeln!(src, "  const float SCALE = {:.10};", scale);
    let _ = writeln!(
        src,
        "  threadgroup {} streamed_q[{}];",
        mem.q.shader_name(),
        block * d
    );
    let _ = writeln!(
        src,
        "  threadgroup {} streamed_do[{}];",
        mem.o.shader_name(),
        block * d
    );
    let _ = writeln!(src, "  float accumulator[{}][{}];", block, d);
    let _ = writeln!(src, "  for (uint i = 0; i < {}; i++)", block);
    let _ = writeln!(
        src,
        "    for (uint k = 0; k < {}; k++) accumulator[i][k] = 0.0;",
        d
    );
    let _ = writeln!(src, "  for (uint r0 = 0; r0 < R; r0 += {}) {{", block);
    let _ = writeln!(src, "    async_copy_block(streamed_q, Q, r0, {});", d);
    let _ = writeln!(src, "    async_copy_block(streamed_do, dO, r0, {});", d);
    let _ = writeln!(src, "    threadgroup_barrier(mem_flags::mem_threadgroup);");
    let _ = writeln!(src, "    for (uint i = 0; i < {}; i++) {{", block);
    let _ = writeln!(src, "      for (uint row = 0; row < {}; row++) {{", block);
    let _ = writeln!(
        src,
        "        float score = dot_row(K, block_origin + i, streamed_q, row, {}) * SCALE;",
        d
    );
    let _ = writeln!(src, "        float p = exp(score - L[r0 + row]);");
    let _ = writeln!(src, "        float dp = 0.0;");
    let _ = writeln!(src, "        for (uint k = 0; k < {}; k++) {{", d);
    let _ = writeln!(
        src,
        "          dp += (float)V[(block_origin + i) * {} + k] * (float)streamed_do[row * {} + k];",
        d, d
    );
    let _ = writeln!(src, "        }}");
    let _ = writeln!(src, "        float ds = p * (dp - D_stat[r0 + row]) * SCALE;");
    let _ = writeln!(src, "        for (uint k = 0; k < {}; k++) {{", d);
    let _ = writeln!(
        src,
        "          accumulator[i][k] += p * (float)streamed_do[row * {} + k];",
        d
    );
    let _ = writeln!(src, "        }}");
    if store_derivative_st {
        let _ = writeln!(
            src,
            "        dS_transpose[(block_origin + i) * {} + (r0 + row)] = ds;",
            p.leading_dimension_derivative_st
        );
    }
    let _ = writeln!(src, "      }}");
    let _ = writeln!(src, "    }}");
    let _ = writeln!(src, "    threadgroup_barrier(mem_flags::mem_threadgroup);");
    let _ = writeln!(src, "  }}");
    let _ = writeln!(src, "  for (uint i = 0; i < {}; i++) {{", block);
    let _ = writeln!(src, "    for (uint k = 0; k < {}; k++) {{", d);
    let _ = writeln!(
        src,
        "      dV[(block_origin + i) * {} + k] = ({})accumulator[i][k];",
        d,
        mem.v.shader_name()
    );
    let _ = writeln!(src, "    }}");
    let _ = writeln!(src, "  }}");
    let _ = writeln!(src, "}}");
}
