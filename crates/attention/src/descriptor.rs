//! The immutable, value-typed attention descriptor.

use kernelforge_core::Precision;

/// Per-operand memory precision for Q, K, V, O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttentionPrecisions {
    /// Precision of Q.
    pub q: Precision,
    /// Precision of K.
    pub k: Precision,
    /// Precision of V.
    pub v: Precision,
    /// Precision of O.
    pub o: Precision,
}

impl AttentionPrecisions {
    /// A precision set with all four operands at the same precision.
    pub const fn uniform(p: Precision) -> Self {
        Self { q: p, k: p, v: p, o: p }
    }
}

/// Per-operand transpose state for Q, K, V, O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttentionTransposeState {
    /// Whether Q is supplied transposed.
    pub q: bool,
    /// Whether K is supplied transposed.
    pub k: bool,
    /// Whether V is supplied transposed.
    pub v: bool,
    /// Whether O is supplied transposed.
    pub o: bool,
}

/// Which of the three cooperating kernels a descriptor synthesises.
///
/// The forward and backward-query kernels block along R and stream
/// across C; backward-key-value blocks along C and streams across R.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelType {
    /// Computes `O` and (optionally) the logsumexp row statistic `L`.
    Forward {
        /// Whether to write `L` to device memory for the backward pass
        /// to reuse.
        store_logsumexp: bool,
    },
    /// Computes `dQ` and the row statistic `D = sum(dO ⊙ O)`.
    BackwardQuery {
        /// Whether the backward-key-value kernel this pairs with writes
        /// `dS^T` to device memory (affects shared scratch sizing, not
        /// this kernel's own emission, but carried for fingerprint
        /// completeness since the two kernels are dispatched together).
        store_derivative_st: bool,
    },
    /// Computes `dV` and, if configured, materialises `dS^T`.
    BackwardKeyValue {
        /// Whether to write the transposed score derivative to a device
        /// scratch buffer for the two follow-up GEMMs to consume.
        store_derivative_st: bool,
    },
}

impl KernelType {
    /// Whether this kernel type blocks along R (forward, backward-query)
    /// or along C (backward-key-value).
    pub const fn blocks_along_r(self) -> bool {
        !matches!(self, KernelType::BackwardKeyValue { .. })
    }

    /// Whether this kernel type materialises `dS^T` to device memory.
    /// Always `false` for forward, which has no `dS` to materialise.
    pub const fn stores_derivative_st(self) -> bool {
        matches!(
            self,
            KernelType::BackwardKeyValue { store_derivative_st: true }
        )
    }
}

/// An immutable value describing one attention kernel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttentionDescriptor {
    /// Number of query rows.
    pub r: u32,
    /// Number of key/value rows (columns of the attention matrix).
    pub c: u32,
    /// Head dimension.
    pub d: u16,
    /// Memory precisions of Q, K, V, O.
    pub memory_precisions: AttentionPrecisions,
    /// Transpose state of Q, K, V, O.
    pub transpose_state: AttentionTransposeState,
    /// Which of the three cooperating kernels this descriptor resolves
    /// to.
    pub kernel_type: KernelType,
}

impl AttentionDescriptor {
    /// Construct a descriptor. Transpose state defaults to "none
    /// transposed".
    pub fn new(
        r: u32,
        c: u32,
        d: u16,
        memory_precisions: AttentionPrecisions,
        kernel_type: KernelType,
    ) -> Self {
        Self {
            r,
            c,
            d,
            memory_precisions,
            transpose_state: AttentionTransposeState::default(),
            kernel_type,
        }
    }

    /// Set the transpose state of Q, K, V, O.
    pub fn with_transpose(mut self, transpose_state: AttentionTransposeState) -> Self {
        self.transpose_state = transpose_state;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_and_backward_query_block_along_r() {
        assert!(KernelType::Forward { store_logsumexp: true }.blocks_along_r());
        assert!(KernelType::BackwardQuery { store_derivative_st: false }.blocks_along_r());
    }

    #[test]
    fn backward_key_value_blocks_along_c() {
        assert!(!KernelType::BackwardKeyValue { store_derivative_st: true }.blocks_along_r());
    }

    #[test]
    fn only_backward_key_value_with_flag_stores_derivative_st() {
        assert!(!KernelType::Forward { store_logsumexp: true }.stores_derivative_st());
        assert!(!KernelType::BackwardKeyValue { store_derivative_st: false }.stores_derivative_st());
        assert!(KernelType::BackwardKeyValue { store_derivative_st: true }.stores_derivative_st());
    }

    #[test]
    fn identical_descriptors_are_equal() {
        let mem = AttentionPrecisions::uniform(Precision::FP16);
        let a = AttentionDescriptor::new(64, 64, 32, mem, KernelType::Forward { store_logsumexp: true });
        let b = AttentionDescriptor::new(64, 64, 32, mem, KernelType::Forward { store_logsumexp: true });
        assert_eq!(a, b);
    }
}
