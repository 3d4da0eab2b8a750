//! Pure `descriptor -> source text` emission.
//!
//! Kept deliberately simple string interpolation rather than a
//! syntax-tree builder: there is no downstream consumer of the shader's
//! AST, only its text, and staying a pure function of the descriptor is
//! what lets the pipeline cache key on the descriptor alone.

use crate::descriptor::{BlockDimensions, GemmDescriptor, PrecisionTriple, Splits};
use std::fmt::Write as _;

pub(crate) struct GemmShaderParams<'a> {
    pub descriptor: &'a GemmDescriptor,
    pub register_precisions: PrecisionTriple,
    pub block_dimensions: BlockDimensions,
    pub splits: Splits,
    pub leading_block_dimensions: [u16; 3],
    pub register_m: u16,
    pub register_n: u16,
    pub threadgroup_size: u32,
    pub direct_access: bool,
    pub edge_shift: (u32, u32),
}

pub(crate) fn emit_gemm_source(p: &GemmShaderParams) -> String {
    let mut src = String::with_capacity(2048);

    emit_header(&mut src, p);
    emit_helper_functions(&mut src, p);
    emit_threadgroup_memory_decl(&mut src, p);
    emit_entry_point_open(&mut src, p);
    emit_accumulator_init(&mut src, p);
    emit_inner_loop(&mut src, p);
    emit_store_c(&mut src, p);
    src.push_str("}\n");

    src
}

fn emit_header(src: &mut String, p: &GemmShaderParams) {
    let d = p.descriptor;
    writeln!(src, "// Generated by kernelforge-gemm. Do not hand-edit.").unwrap();
    writeln!(
        src,
        "// M={} N={} K={} transpose=({}, {}) loadPreviousC={}",
        d.m, d.n, d.k, d.transpose_state.a, d.transpose_state.b, d.load_previous_c
    )
    .unwrap();
    writeln!(src, "#include <metal_stdlib>").unwrap();
    writeln!(src, "using namespace metal;").unwrap();
    writeln!(src).unwrap();
    writeln!(src, "constant uint M [[function_constant(0)]];").unwrap();
    writeln!(src, "constant uint N [[function_constant(1)]];").unwrap();
    writeln!(src, "constant uint K [[function_constant(2)]];").unwrap();
    writeln!(src).unwrap();

    let mem = d.memory_precisions;
    writeln!(
        src,
        "// memory precisions: A={} B={} C={}",
        mem.a.shader_name(),
        mem.b.shader_name(),
        mem.c.shader_name()
    )
    .unwrap();
    writeln!(
        src,
        "// register precisions: A={} B={} C={}",
        p.register_precisions.a.shader_name(),
        p.register_precisions.b.shader_name(),
        p.register_precisions.c.shader_name()
    )
    .unwrap();
    writeln!(
        src,
        "// block: Mb={} Nb={} Kb={} splits=({}, {}) threadgroupSize={}",
        p.block_dimensions.m,
        p.block_dimensions.n,
        p.block_dimensions.k,
        p.splits.m,
        p.splits.n,
        p.threadgroup_size
    )
    .unwrap();
    writeln!(
        src,
        "// leading block dimensions: A={} B={} C={}",
        p.leading_block_dimensions[0], p.leading_block_dimensions[1], p.leading_block_dimensions[2]
    )
    .unwrap();
}

/// Standalone helper functions the entry point below calls. Kept as
/// plain templated free functions (rather than inlined into the entry
/// point) so the same tile-load/store logic is shared verbatim between
/// the direct-access and threadgroup-staged paths.
fn emit_helper_functions(src: &mut String, _p: &GemmShaderParams) {
    writeln!(src).unwrap();
    writeln!(src, "template<typename T>").unwrap();
    writeln!(
        src,
        "simdgroup_matrix<T, 8, 8> make_filled_simdgroup_matrix(T value) {{"
    )
    .unwrap();
    writeln!(src, "  return simdgroup_matrix<T, 8, 8>(value);").unwrap();
    writeln!(src, "}}").unwrap();

    writeln!(src).unwrap();
    writeln!(src, "template<typename T>").unwrap();
    writeln!(
        src,
        "void async_copy_block(threadgroup T *dst, device const T *src, uint row_origin, uint col_origin, uint leading_dim) {{"
    )
    .unwrap();
    writeln!(
        src,
        "  simdgroup_event ev = simdgroup_async_copy(dst, leading_dim, src + row_origin * leading_dim + col_origin, leading_dim);"
    )
    .unwrap();
    writeln!(src, "  simdgroup_event::wait(1, &ev);").unwrap();
    writeln!(src, "}}").unwrap();

    writeln!(src).unwrap();
    writeln!(src, "template<typename T>").unwrap();
    writeln!(
        src,
        "simdgroup_matrix<T, 8, 8> load_a_tile(device const T *A, threadgroup T *tg_a, uint i, uint k_block, uint block_origin_m, uint leading_dim, bool transposed, bool direct) {{"
    )
    .unwrap();
    writeln!(src, "  simdgroup_matrix<T, 8, 8> tile;").unwrap();
    writeln!(src, "  if (direct) {{").unwrap();
    writeln!(
        src,
        "    simdgroup_load(tile, A, leading_dim, ulong2(k_block, block_origin_m + i * 8), transposed);"
    )
    .unwrap();
    writeln!(src, "  }} else {{").unwrap();
    writeln!(
        src,
        "    simdgroup_load(tile, tg_a, leading_dim, ulong2(0, i * 8), transposed);"
    )
    .unwrap();
    writeln!(src, "  }}").unwrap();
    writeln!(src, "  return tile;").unwrap();
    writeln!(src, "}}").unwrap();

    writeln!(src).unwrap();
    writeln!(src, "template<typename T>").unwrap();
    writeln!(
        src,
        "simdgroup_matrix<T, 8, 8> load_b_tile(device const T *B, threadgroup T *tg_b, uint k_block, uint j, uint block_origin_n, uint leading_dim, bool transposed, bool direct) {{"
    )
    .unwrap();
    writeln!(src, "  simdgroup_matrix<T, 8, 8> tile;").unwrap();
    writeln!(src, "  if (direct) {{").unwrap();
    writeln!(
        src,
        "    simdgroup_load(tile, B, leading_dim, ulong2(block_origin_n + j * 8, k_block), transposed);"
    )
    .unwrap();
    writeln!(src, "  }} else {{").unwrap();
    writeln!(
        src,
        "    simdgroup_load(tile, tg_b, leading_dim, ulong2(j * 8, 0), transposed);"
    )
    .unwrap();
    writeln!(src, "  }}").unwrap();
    writeln!(src, "  return tile;").unwrap();
    writeln!(src, "}}").unwrap();

    writeln!(src).unwrap();
    writeln!(src, "template<typename T, uint TM, uint TN>").unwrap();
    writeln!(
        src,
        "void load_c_tiles(thread simdgroup_matrix<T, 8, 8> (&acc)[TM][TN], device const T *C, uint origin_m, uint origin_n, uint ldc) {{"
    )
    .unwrap();
    writeln!(src, "  for (uint i = 0; i < TM; i++) {{").unwrap();
    writeln!(src, "    for (uint j = 0; j < TN; j++) {{").unwrap();
    writeln!(
        src,
        "      simdgroup_load(acc[i][j], C, ldc, ulong2(origin_n + j * 8, origin_m + i * 8));"
    )
    .unwrap();
    writeln!(src, "    }}").unwrap();
    writeln!(src, "  }}").unwrap();
    writeln!(src, "}}").unwrap();

    writeln!(src).unwrap();
    writeln!(src, "template<typename T, uint TM, uint TN>").unwrap();
    writeln!(
        src,
        "void store_c_tiles_direct(thread simdgroup_matrix<T, 8, 8> (&acc)[TM][TN], device T *C, uint origin_m, uint origin_n, uint ldc) {{"
    )
    .unwrap();
    writeln!(src, "  for (uint i = 0; i < TM; i++) {{").unwrap();
    writeln!(src, "    for (uint j = 0; j < TN; j++) {{").unwrap();
    writeln!(
        src,
        "      simdgroup_store(acc[i][j], C, ldc, ulong2(origin_n + j * 8, origin_m + i * 8));"
    )
    .unwrap();
    writeln!(src, "    }}").unwrap();
    writeln!(src, "  }}").unwrap();
    writeln!(src, "}}").unwrap();

    writeln!(src).unwrap();
    writeln!(src, "template<typename T, uint TM, uint TN>").unwrap();
    writeln!(
        src,
        "void store_c_tiles_async(thread simdgroup_matrix<T, 8, 8> (&acc)[TM][TN], device T *C, uint origin_m, uint origin_n, uint ldc, uint shift_m, uint shift_n) {{"
    )
    .unwrap();
    writeln!(src, "  for (uint i = 0; i < TM; i++) {{").unwrap();
    writeln!(src, "    for (uint j = 0; j < TN; j++) {{").unwrap();
    writeln!(
        src,
        "      simdgroup_store(acc[i][j], C, ldc, ulong2(origin_n + j * 8 - shift_n, origin_m + i * 8 - shift_m));"
    )
    .unwrap();
    writeln!(src, "    }}").unwrap();
    writeln!(src, "  }}").unwrap();
    writeln!(src, "}}").unwrap();
}

fn emit_threadgroup_memory_decl(src: &mut String, p: &GemmShaderParams) {
    if p.direct_access {
        writeln!(src, "// direct-access path: no threadgroup staging buffer").unwrap();
        return;
    }
    let mem = p.descriptor.memory_precisions;
    writeln!(
        src,
        "threadgroup {} tg_a[{}];",
        mem.a.shader_name(),
        p.leading_block_dimensions[0] as u32
            * if p.descriptor.transpose_state.a {
                p.block_dimensions.k
            } else {
                p.block_dimensions.m
            } as u32
    )
    .unwrap();
    writeln!(
        src,
        "threadgroup {} tg_b[{}];",
        mem.b.shader_name(),
        p.leading_block_dimensions[1] as u32
            * if p.descriptor.transpose_state.b {
                p.block_dimensions.n
            } else {
                p.block_dimensions.k
            } as u32
    )
    .unwrap();
}

fn emit_entry_point_open(src: &mut String, p: &GemmShaderParams) {
    let mem = p.descriptor.memory_precisions;
    writeln!(src).unwrap();
    writeln!(src, "kernel void gemm(").unwrap();
    writeln!(src, "    device const {}* A [[buffer(0)]],", mem.a.shader_name()).unwrap();
    writeln!(src, "    device const {}* B [[buffer(1)]],", mem.b.shader_name()).unwrap();
    writeln!(src, "    device {}* C [[buffer(2)]],", mem.c.shader_name()).unwrap();
    writeln!(src, "    uint3 tid [[thread_position_in_threadgroup]],").unwrap();
    writeln!(src, "    uint3 gid [[threadgroup_position_in_grid]]) {{").unwrap();
    writeln!(
        src,
        "  const uint block_origin_m = gid.y * {};",
        p.block_dimensions.m
    )
    .unwrap();
    writeln!(
        src,
        "  const uint block_origin_n = gid.x * {};",
        p.block_dimensions.n
    )
    .unwrap();
}

fn emit_accumulator_init(src: &mut String, p: &GemmShaderParams) {
    let tiles_m = p.register_m / 8;
    let tiles_n = p.register_n / 8;
    writeln!(
        src,
        "  simdgroup_matrix<{}, 8, 8> acc[{}][{}];",
        p.register_precisions.c.shader_name(),
        tiles_m.max(1),
        tiles_n.max(1)
    )
    .unwrap();
    if p.descriptor.load_previous_c {
        writeln!(src, "  // loadPreviousC: seed accumulator from device C (beta = 1)").unwrap();
        writeln!(src, "  load_c_tiles(acc, C, block_origin_m, block_origin_n, N);").unwrap();
    } else {
        writeln!(src, "  #pragma clang loop unroll(full)").unwrap();
        writeln!(src, "  for (uint i = 0; i < {}; i++)", tiles_m.max(1)).unwrap();
        writeln!(src, "    #pragma clang loop unroll(full)").unwrap();
        writeln!(src, "    for (uint j = 0; j < {}; j++)", tiles_n.max(1)).unwrap();
        writeln!(
            src,
            "      acc[i][j] = make_filled_simdgroup_matrix(({0})0);",
            p.register_precisions.c.shader_name()
        )
        .unwrap();
    }
}

fn emit_inner_loop(src: &mut String, p: &GemmShaderParams) {
    let mem = p.descriptor.memory_precisions;
    writeln!(src).unwrap();
    writeln!(
        src,
        "  for (uint k_block = 0; k_block < K; k_block += {}) {{",
        p.block_dimensions.k
    )
    .unwrap();
    let tg_a = if p.direct_access { "nullptr" } else { "tg_a" };
    let tg_b = if p.direct_access { "nullptr" } else { "tg_b" };
    if p.direct_access {
        writeln!(
            src,
            "    // direct-access: read A/B tiles straight from device memory"
        )
        .unwrap();
    } else {
        writeln!(
            src,
            "    async_copy_block(tg_a, A, block_origin_m, k_block, {});",
            p.leading_block_dimensions[0]
        )
        .unwrap();
        writeln!(
            src,
            "    async_copy_block(tg_b, B, k_block, block_origin_n, {});",
            p.leading_block_dimensions[1]
        )
        .unwrap();
        writeln!(src, "    threadgroup_barrier(mem_flags::mem_threadgroup);").unwrap();
    }
    let tiles_m = p.register_m / 8;
    let tiles_n = p.register_n / 8;
    writeln!(src, "    #pragma clang loop unroll(full)").unwrap();
    writeln!(src, "    for (uint i = 0; i < {}; i++)", tiles_m.max(1)).unwrap();
    writeln!(src, "      #pragma clang loop unroll(full)").unwrap();
    writeln!(src, "      for (uint j = 0; j < {}; j++) {{", tiles_n.max(1)).unwrap();
    writeln!(
        src,
        "        simdgroup_matrix<{}, 8, 8> a_tile = load_a_tile(A, {}, i, k_block, block_origin_m, {}u, {}, {});",
        mem.a.shader_name(),
        tg_a,
        p.leading_block_dimensions[0],
        p.descriptor.transpose_state.a,
        p.direct_access
    )
    .unwrap();
    writeln!(
        src,
        "        simdgroup_matrix<{}, 8, 8> b_tile = load_b_tile(B, {}, k_block, j, block_origin_n, {}u, {}, {});",
        mem.b.shader_name(),
        tg_b,
        p.leading_block_dimensions[1],
        p.descriptor.transpose_state.b,
        p.direct_access
    )
    .unwrap();
    writeln!(src, "        simdgroup_multiply_accumulate(acc[i][j], a_tile, b_tile, acc[i][j]);").unwrap();
    writeln!(src, "      }}").unwrap();
    if !p.direct_access {
        writeln!(src, "    threadgroup_barrier(mem_flags::mem_threadgroup);").unwrap();
    }
    writeln!(src, "  }}").unwrap();
}

fn emit_store_c(src: &mut String, p: &GemmShaderParams) {
    writeln!(src).unwrap();
    if p.direct_access {
        writeln!(src, "  store_c_tiles_direct(acc, C, block_origin_m, block_origin_n, N);").unwrap();
        return;
    }
    let (shift_m, shift_n) = p.edge_shift;
    writeln!(
        src,
        "  // edge-block shift: garbage lands top-left, origin shifted by ({}, {})",
        shift_m, shift_n
    )
    .unwrap();
    writeln!(
        src,
        "  store_c_tiles_async(acc, C, block_origin_m, block_origin_n, N, {}u, {}u);",
        shift_m, shift_n
    )
    .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{GemmDescriptor, PrecisionTriple};
    use kernelforge_core::Precision;

    #[test]
    fn emission_embeds_shape_comment() {
        let descriptor = GemmDescriptor::new(32, 32, 32, PrecisionTriple::uniform(Precision::FP32));
        let params = GemmShaderParams {
            descriptor: &descriptor,
            register_precisions: PrecisionTriple::uniform(Precision::FP32),
            block_dimensions: BlockDimensions { m: 32, n: 32, k: 8 },
            splits: Splits { m: 2, n: 2 },
            leading_block_dimensions: [8, 32, 32],
            register_m: 16,
            register_n: 16,
            threadgroup_size: 128,
            direct_access: true,
            edge_shift: (0, 0),
        };
        let source = emit_gemm_source(&params);
        assert!(source.contains("M=32 N=32 K=32"));
        assert!(source.contains("kernel void gemm("));
    }

    #[test]
    fn emitted_source_defines_every_helper_it_calls() {
        // Every helper the entry point can reach gets a body emitted
        // alongside it, regardless of which path (direct-access vs.
        // threadgroup-staged, zero-init vs. loadPreviousC) this
        // particular descriptor takes.
        let descriptor = GemmDescriptor::new(65, 64, 64, PrecisionTriple::uniform(Precision::FP32));
        let params = GemmShaderParams {
            descriptor: &descriptor,
            register_precisions: PrecisionTriple::uniform(Precision::FP32),
            block_dimensions: BlockDimensions { m: 32, n: 32, k: 8 },
            splits: Splits { m: 2, n: 2 },
            leading_block_dimensions: [8, 32, 32],
            register_m: 16,
            register_n: 16,
            threadgroup_size: 128,
            direct_access: false,
            edge_shift: (0, 0),
        };
        let source = emit_gemm_source(&params);
        for helper in [
            "make_filled_simdgroup_matrix",
            "async_copy_block",
            "load_a_tile",
            "load_b_tile",
            "load_c_tiles",
            "store_c_tiles_direct",
            "store_c_tiles_async",
        ] {
            let definition = format!("{}(", helper);
            assert!(
                source.matches(&definition).count() >= 1,
                "expected a definition of {helper}"
            );
        }
        // This descriptor's own path (threadgroup-staged, zero-init)
        // actually calls these, so they show up a second time.
        for called_helper in [
            "make_filled_simdgroup_matrix",
            "async_copy_block",
            "load_a_tile",
            "load_b_tile",
            "store_c_tiles_async",
        ] {
            let definition = format!("{}(", called_helper);
            assert!(
                source.matches(&definition).count() >= 2,
                "expected both a call and a definition of {called_helper}"
            );
        }
    }
}
