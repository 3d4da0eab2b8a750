//! The immutable, value-typed GEMM descriptor.
//!
//! A descriptor is its own pipeline-cache fingerprint: it derives
//! `Eq + Hash` over every field that can affect emitted source text, so
//! the cache can key directly on the descriptor value.

use kernelforge_core::Precision;

/// Per-operand precision triple, `(A, B, C)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrecisionTriple {
    /// Precision of operand A.
    pub a: Precision,
    /// Precision of operand B.
    pub b: Precision,
    /// Precision of operand C.
    pub c: Precision,
}

impl PrecisionTriple {
    /// A triple with all three operands at the same precision.
    pub const fn uniform(p: Precision) -> Self {
        Self { a: p, b: p, c: p }
    }
}

/// Per-operand transpose flags for A and B. C is never transposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransposeState {
    /// Whether A is supplied transposed (stored `K x M` instead of `M x K`).
    pub a: bool,
    /// Whether B is supplied transposed (stored `N x K` instead of `K x N`).
    pub b: bool,
}

impl TransposeState {
    /// Neither operand transposed.
    pub const NN: Self = Self { a: false, b: false };
    /// B transposed.
    pub const NT: Self = Self { a: false, b: true };
    /// A transposed.
    pub const TN: Self = Self { a: true, b: false };
    /// Both operands transposed.
    pub const TT: Self = Self { a: true, b: true };
}

/// Block dimensions `(Mb, Nb, Kb)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockDimensions {
    /// Block extent along M.
    pub m: u16,
    /// Block extent along N.
    pub n: u16,
    /// Block extent along K.
    pub k: u16,
}

/// Number of `8x8` register tiles per block, along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Splits {
    /// Splits along M.
    pub m: u16,
    /// Splits along N.
    pub n: u16,
}

/// Optional per-operand leading-block-dimension overrides.
///
/// Each present override must be `>=` the expected extent computed from
/// the resolved block dimensions, or the synthesiser rejects the
/// descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LeadingBlockDimensionOverrides {
    /// Override for operand A.
    pub a: Option<u16>,
    /// Override for operand B.
    pub b: Option<u16>,
    /// Override for operand C.
    pub c: Option<u16>,
}

/// An immutable value describing one GEMM kernel variant.
///
/// Construct with [`GemmDescriptor::new`], optionally refine with the
/// `with_*` builder methods, then resolve with
/// [`crate::kernel::GemmKernel::synthesize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GemmDescriptor {
    /// `(M, N, K)` in BLAS notation.
    pub m: u32,
    /// See [`GemmDescriptor::m`].
    pub n: u32,
    /// See [`GemmDescriptor::m`].
    pub k: u32,
    /// Memory (storage) precision per operand.
    pub memory_precisions: PrecisionTriple,
    /// Register (compute) precision per operand. `None` defers to the
    /// synthesiser's default (memory precision, or `FP32` if that would
    /// make C's accumulator illegal).
    pub register_precisions: Option<PrecisionTriple>,
    /// Transpose state of A and B.
    pub transpose_state: TransposeState,
    /// Block dimensions. `None` defers to the tile-selection table.
    pub block_dimensions: Option<BlockDimensions>,
    /// Leading-block-dimension overrides, if any.
    pub leading_block_dimensions: LeadingBlockDimensionOverrides,
    /// SIMD-group tile splits. `None` defers to the default split policy.
    pub splits: Option<Splits>,
    /// Prefer routing loads through threadgroup memory even when the
    /// direct-access fast path would be legal.
    pub prefer_async_load: bool,
    /// Prefer routing stores through threadgroup memory even when the
    /// direct-access fast path would be legal.
    pub prefer_async_store: bool,
    /// Whether the kernel should load C from device memory before
    /// accumulating (`beta = 1`) rather than starting from zero
    /// (`beta = 0`).
    pub load_previous_c: bool,
}

impl GemmDescriptor {
    /// Construct a descriptor with mandatory fields; all policy knobs
    /// default to their conservative values (no overrides, no
    /// accumulate, no forced async paths).
    pub fn new(m: u32, n: u32, k: u32, memory_precisions: PrecisionTriple) -> Self {
        Self {
            m,
            n,
            k,
            memory_precisions,
            register_precisions: None,
            transpose_state: TransposeState::default(),
            block_dimensions: None,
            leading_block_dimensions: LeadingBlockDimensionOverrides::default(),
            splits: None,
            prefer_async_load: false,
            prefer_async_store: false,
            load_previous_c: false,
        }
    }

    /// Set an explicit register-precision triple, overriding the
    /// synthesiser's default.
    pub fn with_register_precisions(mut self, register_precisions: PrecisionTriple) -> Self {
        self.register_precisions = Some(register_precisions);
        self
    }

    /// Set the transpose state of A and B.
    pub fn with_transpose(mut self, transpose_state: TransposeState) -> Self {
        self.transpose_state = transpose_state;
        self
    }

    /// Override the block dimensions the tile-selection table would
    /// otherwise choose.
    pub fn with_block_dimensions(mut self, block_dimensions: BlockDimensions) -> Self {
        self.block_dimensions = Some(block_dimensions);
        self
    }

    /// Override the SIMD-group splits the default split policy would
    /// otherwise choose.
    pub fn with_splits(mut self, splits: Splits) -> Self {
        self.splits = Some(splits);
        self
    }

    /// Override one or more operands' leading block dimensions.
    pub fn with_leading_block_dimensions(
        mut self,
        overrides: LeadingBlockDimensionOverrides,
    ) -> Self {
        self.leading_block_dimensions = overrides;
        self
    }

    /// Force the slow, threadgroup-memory-routed load path even when the
    /// direct-access fast path would be legal.
    pub fn with_prefer_async_load(mut self, prefer: bool) -> Self {
        self.prefer_async_load = prefer;
        self
    }

    /// Force the slow, threadgroup-memory-routed store path even when
    /// the direct-access fast path would be legal.
    pub fn with_prefer_async_store(mut self, prefer: bool) -> Self {
        self.prefer_async_store = prefer;
        self
    }

    /// Accumulate into a pre-existing C (`beta = 1`) instead of starting
    /// from zero (`beta = 0`).
    pub fn with_load_previous_c(mut self, load_previous_c: bool) -> Self {
        self.load_previous_c = load_previous_c;
        self
    }
}
