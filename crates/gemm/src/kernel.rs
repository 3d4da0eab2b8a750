//! The synthesised GEMM kernel: resolved tiling metadata plus emitted
//! shader source text.

use crate::descriptor::{BlockDimensions, GemmDescriptor, PrecisionTriple, Splits};
use crate::error::{Error, Result};
use crate::{shader, tile_table};
use kernelforge_core::{ceil_to_multiple, DeviceProfile, Operand, Precision};

/// Resolved leading (and trailing) block dimension per operand, plus the
/// byte footprint that dimension implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResolvedOperandLayout {
    leading: u16,
    trailing: u16,
    block_bytes: u32,
}

/// A fully synthesised GEMM kernel: every descriptor field resolved
/// (defaults applied), derived register/threadgroup metadata, and the
/// emitted shader source.
///
/// Two descriptors that compare equal always produce a `GemmKernel` with
/// byte-identical `shader_source` and identical metadata — synthesis is
/// a pure function of the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GemmKernel {
    descriptor: GemmDescriptor,
    register_precisions: PrecisionTriple,
    block_dimensions: BlockDimensions,
    splits: Splits,
    leading_block_dimensions: [u16; 3],
    register_m: u16,
    register_n: u16,
    threadgroup_size: u32,
    threadgroup_memory_allocation: u32,
    direct_access: bool,
    edge_shift: (u32, u32),
    shader_source: String,
}

impl GemmKernel {
    /// Synthesise a kernel from a descriptor, resolving every `None`
    /// field against the default tile table / split policy and
    /// validating every dimension, precision, and alignment invariant.
    ///
    /// Errors synchronously (never partially) on any descriptor error;
    /// see `kernelforge_core::Error`.
    pub fn synthesize(descriptor: &GemmDescriptor, device_profile: DeviceProfile) -> Result<Self> {
        validate_dimensions(descriptor)?;

        let register_precisions = resolve_register_precisions(descriptor)?;
        validate_precision_pairs(descriptor, register_precisions)?;

        let block_dimensions = descriptor.block_dimensions.unwrap_or_else(|| {
            tile_table::default_block_dimensions(descriptor.memory_precisions, device_profile)
        });
        let splits = descriptor
            .splits
            .unwrap_or_else(|| tile_table::default_splits(block_dimensions));
        validate_split_alignment(block_dimensions, splits)?;

        let layouts = resolve_operand_layouts(descriptor, block_dimensions)?;
        let leading_block_dimensions = [
            layouts[0].leading,
            layouts[1].leading,
            layouts[2].leading,
        ];

        let register_m = block_dimensions.m / splits.m;
        let register_n = block_dimensions.n / splits.n;
        let threadgroup_size = 32 * splits.m as u32 * splits.n as u32;
        let threadgroup_memory_allocation = std::cmp::max(
            layouts[0].block_bytes + layouts[1].block_bytes,
            layouts[2].block_bytes,
        );

        let has_edge_tile =
            descriptor.m % block_dimensions.m as u32 != 0 || descriptor.n % block_dimensions.n as u32 != 0;
        let direct_access = !descriptor.prefer_async_store && !has_edge_tile;
        let edge_shift = (
            (block_dimensions.m as u32 - descriptor.m % block_dimensions.m as u32)
                % block_dimensions.m as u32,
            (block_dimensions.n as u32 - descriptor.n % block_dimensions.n as u32)
                % block_dimensions.n as u32,
        );

        let shader_source = shader::emit_gemm_source(&shader::GemmShaderParams {
            descriptor,
            register_precisions,
            block_dimensions,
            splits,
            leading_block_dimensions,
            register_m,
            register_n,
            threadgroup_size,
            direct_access,
            edge_shift,
        });

        tracing::debug!(
            m = descriptor.m,
            n = descriptor.n,
            k = descriptor.k,
            block_m = block_dimensions.m,
            block_n = block_dimensions.n,
            block_k = block_dimensions.k,
            threadgroup_size,
            direct_access,
            "synthesised GEMM kernel"
        );

        Ok(Self {
            descriptor: descriptor.clone(),
            register_precisions,
            block_dimensions,
            splits,
            leading_block_dimensions,
            register_m,
            register_n,
            threadgroup_size,
            threadgroup_memory_allocation,
            direct_access,
            edge_shift,
            shader_source,
        })
    }

    /// The descriptor this kernel was synthesised from.
    pub fn descriptor(&self) -> &GemmDescriptor {
        &self.descriptor
    }

    /// Resolved register (compute) precisions.
    pub fn register_precisions(&self) -> PrecisionTriple {
        self.register_precisions
    }

    /// Resolved block dimensions `(Mb, Nb, Kb)`.
    pub fn block_dimensions(&self) -> BlockDimensions {
        self.block_dimensions
    }

    /// Resolved SIMD-group splits `(Ms, Ns)`.
    pub fn splits(&self) -> Splits {
        self.splits
    }

    /// Resolved leading block dimensions, in `[A, B, C]` order.
    pub fn leading_block_dimensions(&self) -> [u16; 3] {
        self.leading_block_dimensions
    }

    /// `Mb / Ms`: per-thread register tiles along M, in units of 8.
    pub fn register_m(&self) -> u16 {
        self.register_m
    }

    /// `Nb / Ns`: per-thread register tiles along N, in units of 8.
    pub fn register_n(&self) -> u16 {
        self.register_n
    }

    /// `32 * Ms * Ns`.
    pub fn threadgroup_size(&self) -> u32 {
        self.threadgroup_size
    }

    /// `max(blockBytes(A) + blockBytes(B), blockBytes(C))`.
    pub fn threadgroup_memory_allocation(&self) -> u32 {
        self.threadgroup_memory_allocation
    }

    /// Whether this kernel uses the fast direct-access path (no
    /// threadgroup-memory round trip) rather than the async-copy path.
    pub fn direct_access(&self) -> bool {
        self.direct_access
    }

    /// `(M_shift, N_shift)`: the edge-block origin shift used by the
    /// slow store-C path when the matrix isn't an exact multiple of the
    /// tile size.
    pub fn edge_shift(&self) -> (u32, u32) {
        self.edge_shift
    }

    /// The emitted Metal-flavored shader source, containing one entry
    /// point named `gemm`.
    pub fn shader_source(&self) -> &str {
        &self.shader_source
    }
}

fn validate_dimensions(descriptor: &GemmDescriptor) -> Result<()> {
    if descriptor.m == 0 {
        return Err(Error::ZeroDimension { name: "M" });
    }
    if descriptor.n == 0 {
        return Err(Error::ZeroDimension { name: "N" });
    }
    if descriptor.k == 0 {
        return Err(Error::ZeroDimension { name: "K" });
    }
    Ok(())
}

/// Resolve `None` register precisions to a default: equal to memory
/// precision, except C, which defaults to `FP32` whenever its memory
/// precision is `BF16` (since `BF16` is never a legal accumulator).
fn resolve_register_precisions(descriptor: &GemmDescriptor) -> Result<PrecisionTriple> {
    if let Some(explicit) = descriptor.register_precisions {
        return Ok(explicit);
    }
    let mem = descriptor.memory_precisions;
    let c_register = if mem.c.is_legal_accumulator() {
        mem.c
    } else {
        Precision::FP32
    };
    Ok(PrecisionTriple {
        a: mem.a,
        b: mem.b,
        c: c_register,
    })
}

fn validate_precision_pairs(
    descriptor: &GemmDescriptor,
    register_precisions: PrecisionTriple,
) -> Result<()> {
    let mem = descriptor.memory_precisions;
    for (operand, memory, register) in [
        (Operand::A, mem.a, register_precisions.a),
        (Operand::B, mem.b, register_precisions.b),
        (Operand::C, mem.c, register_precisions.c),
    ] {
        if !Precision::legal_pair(memory, register) {
            return Err(Error::IllegalPrecisionPair {
                operand,
                memory,
                register,
            });
        }
    }
    if !register_precisions.c.is_legal_accumulator() {
        return Err(Error::Bf16Accumulator { operand: Operand::C });
    }
    Ok(())
}

fn validate_split_alignment(block_dimensions: BlockDimensions, splits: Splits) -> Result<()> {
    if block_dimensions.m % (8 * splits.m) != 0 {
        return Err(Error::MisalignedSplit {
            axis: "M",
            block_dim: block_dimensions.m,
            split: splits.m,
        });
    }
    if block_dimensions.n % (8 * splits.n) != 0 {
        return Err(Error::MisalignedSplit {
            axis: "N",
            block_dim: block_dimensions.n,
            split: splits.n,
        });
    }
    Ok(())
}

/// Per-operand expected leading block dimension, derived from the
/// resolved block dimensions and each operand's transpose state.
fn expected_leading_dimension(descriptor: &GemmDescriptor, block_dimensions: BlockDimensions) -> [u16; 3] {
    let a = if descriptor.transpose_state.a {
        block_dimensions.m
    } else {
        block_dimensions.k
    };
    let b = if descriptor.transpose_state.b {
        block_dimensions.k
    } else {
        block_dimensions.n
    };
    let c = block_dimensions.n;
    [a, b, c]
}

fn resolve_operand_layouts(
    descriptor: &GemmDescriptor,
    block_dimensions: BlockDimensions,
) -> Result<[ResolvedOperandLayout; 3]> {
    let expected = expected_leading_dimension(descriptor, block_dimensions);
    let overrides = [
        descriptor.leading_block_dimensions.a,
        descriptor.leading_block_dimensions.b,
        descriptor.leading_block_dimensions.c,
    ];
    let operands = [Operand::A, Operand::B, Operand::C];

    // Trailing extent is "the other" dimension of the block: for A/B it
    // flips with the transpose flag, for C it's always Mb (C is never
    // transposed, its leading dimension is always Nb).
    let trailing = [
        if descriptor.transpose_state.a {
            block_dimensions.k
        } else {
            block_dimensions.m
        },
        if descriptor.transpose_state.b {
            block_dimensions.n
        } else {
            block_dimensions.k
        },
        block_dimensions.m,
    ];
    let memory_precisions = [
        descriptor.memory_precisions.a,
        descriptor.memory_precisions.b,
        descriptor.memory_precisions.c,
    ];

    let mut out = [ResolvedOperandLayout {
        leading: 0,
        trailing: 0,
        block_bytes: 0,
    }; 3];

    for i in 0..3 {
        let leading = match overrides[i] {
            Some(explicit) => {
                if explicit < expected[i] {
                    return Err(Error::UndersizedLeadingDimension {
                        operand: operands[i],
                        expected: expected[i],
                        actual: explicit,
                    });
                }
                explicit
            }
            None => expected[i],
        };
        let block_bytes =
            leading as u32 * trailing[i] as u32 * memory_precisions[i].byte_size();
        out[i] = ResolvedOperandLayout {
            leading,
            trailing: trailing[i],
            block_bytes,
        };
    }
    Ok(out)
}

/// Smallest stride `>= extent` aligned to `block`. Exposed for callers
/// that need to size a scratch buffer the same way the kernel sizes its
/// own leading dimensions (e.g. `kernelforge-attention`'s `dS^T` scratch).
pub fn align_leading_dimension(extent: u32, block: u32) -> u32 {
    ceil_to_multiple(extent, block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TransposeState;

    fn uniform_fp32(m: u32, n: u32, k: u32) -> GemmDescriptor {
        GemmDescriptor::new(m, n, k, PrecisionTriple::uniform(Precision::FP32))
    }

    #[test]
    fn rejects_zero_dimension() {
        let d = uniform_fp32(0, 8, 8);
        let err = GemmKernel::synthesize(&d, DeviceProfile::default()).unwrap_err();
        assert_eq!(err, Error::ZeroDimension { name: "M" });
    }

    #[test]
    fn rejects_bf16_register_c_even_if_memory_is_fp32() {
        let d = uniform_fp32(32, 32, 32).with_register_precisions(PrecisionTriple {
            a: Precision::FP32,
            b: Precision::FP32,
            c: Precision::BF16,
        });
        let err = GemmKernel::synthesize(&d, DeviceProfile::default()).unwrap_err();
        assert!(matches!(err, Error::IllegalPrecisionPair { operand: Operand::C, .. }));
    }

    #[test]
    fn bf16_memory_c_defaults_register_to_fp32() {
        let mem = PrecisionTriple {
            a: Precision::BF16,
            b: Precision::BF16,
            c: Precision::BF16,
        };
        let d = GemmDescriptor::new(32, 32, 32, mem);
        let kernel = GemmKernel::synthesize(&d, DeviceProfile::default()).unwrap();
        assert_eq!(kernel.register_precisions().c, Precision::FP32);
    }

    #[test]
    fn threadgroup_size_matches_splits() {
        let d = uniform_fp32(64, 64, 64);
        let kernel = GemmKernel::synthesize(&d, DeviceProfile::default()).unwrap();
        let splits = kernel.splits();
        assert_eq!(
            kernel.threadgroup_size(),
            32 * splits.m as u32 * splits.n as u32
        );
    }

    #[test]
    fn tile_alignment_invariant_holds() {
        for (m, n, k) in [(7u32, 8, 9), (32, 32, 32), (151, 152, 153), (512, 512, 512)] {
            let d = uniform_fp32(m, n, k);
            let kernel = GemmKernel::synthesize(&d, DeviceProfile::default()).unwrap();
            let block = kernel.block_dimensions();
            let splits = kernel.splits();
            assert_eq!(block.m % (8 * splits.m), 0, "m={m} n={n} k={k}");
            assert_eq!(block.n % (8 * splits.n), 0, "m={m} n={n} k={k}");
        }
    }

    #[test]
    fn leading_dimension_invariant_holds() {
        for transpose in [
            TransposeState::NN,
            TransposeState::NT,
            TransposeState::TN,
            TransposeState::TT,
        ] {
            let d = uniform_fp32(64, 64, 64).with_transpose(transpose);
            let kernel = GemmKernel::synthesize(&d, DeviceProfile::default()).unwrap();
            let expected = expected_leading_dimension(&d, kernel.block_dimensions());
            let actual = kernel.leading_block_dimensions();
            for i in 0..3 {
                assert!(actual[i] >= expected[i]);
            }
        }
    }

    #[test]
    fn undersized_leading_dimension_override_is_rejected() {
        let d = uniform_fp32(64, 64, 64).with_leading_block_dimensions(
            crate::descriptor::LeadingBlockDimensionOverrides {
                a: Some(1),
                ..Default::default()
            },
        );
        let err = GemmKernel::synthesize(&d, DeviceProfile::default()).unwrap_err();
        assert!(matches!(err, Error::UndersizedLeadingDimension { operand: Operand::A, .. }));
    }

    #[test]
    fn oversized_leading_dimension_override_is_accepted() {
        let d = uniform_fp32(64, 64, 64).with_leading_block_dimensions(
            crate::descriptor::LeadingBlockDimensionOverrides {
                a: Some(1024),
                ..Default::default()
            },
        );
        let kernel = GemmKernel::synthesize(&d, DeviceProfile::default()).unwrap();
        assert_eq!(kernel.leading_block_dimensions()[0], 1024);
    }

    #[test]
    fn determinism_byte_identical_source_and_metadata() {
        let d = uniform_fp32(151, 152, 153).with_transpose(TransposeState::NT);
        let k1 = GemmKernel::synthesize(&d, DeviceProfile::default()).unwrap();
        let k2 = GemmKernel::synthesize(&d, DeviceProfile::default()).unwrap();
        assert_eq!(k1.shader_source(), k2.shader_source());
        assert_eq!(k1.block_dimensions(), k2.block_dimensions());
        assert_eq!(k1.splits(), k2.splits());
        assert_eq!(k1.threadgroup_memory_allocation(), k2.threadgroup_memory_allocation());
    }

    #[test]
    fn direct_access_only_when_no_edge_and_not_forced_async() {
        let exact = uniform_fp32(64, 64, 64);
        let kernel = GemmKernel::synthesize(&exact, DeviceProfile::default()).unwrap();
        assert!(kernel.direct_access());

        let edge = uniform_fp32(65, 64, 64);
        let kernel = GemmKernel::synthesize(&edge, DeviceProfile::default()).unwrap();
        assert!(!kernel.direct_access());

        let forced = exact.with_prefer_async_store(true);
        let kernel = GemmKernel::synthesize(&forced, DeviceProfile::default()).unwrap();
        assert!(!kernel.direct_access());
    }

    #[test]
    fn shader_source_mentions_entry_point_and_function_constants() {
        let d = uniform_fp32(32, 32, 32);
        let kernel = GemmKernel::synthesize(&d, DeviceProfile::default()).unwrap();
        let src = kernel.shader_source();
        assert!(src.contains("gemm"));
        assert!(src.contains("constant uint M"));
        assert!(src.contains("constant uint N"));
        assert!(src.contains("constant uint K"));
    }
}
