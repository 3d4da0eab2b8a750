//! Tagged operand selection.
//!
//! A closed, exhaustively-matched enum rather than a stringly-typed
//! operand name, so a typo can't produce a runtime "unrecognized
//! operand" path.

use std::fmt;

/// One of the three operands of a GEMM: `C <- op(A) * op(B) + C`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operand {
    /// Left-hand matrix operand.
    A,
    /// Right-hand matrix operand.
    B,
    /// Output / accumulator operand. Never transposed.
    C,
}

impl Operand {
    /// All three GEMM operands, in A, B, C order.
    pub const ALL: [Operand; 3] = [Operand::A, Operand::B, Operand::C];

    /// Single-letter spelling used in emitted shader identifiers
    /// (`a_block`, `b_block`, `c_block`, ...).
    pub const fn letter(self) -> &'static str {
        match self {
            Operand::A => "A",
            Operand::B => "B",
            Operand::C => "C",
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// One of the four operands of fused attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttentionOperand {
    /// Query matrix, `R x D`.
    Q,
    /// Key matrix, `C x D`.
    K,
    /// Value matrix, `C x D`.
    V,
    /// Output matrix, `R x D`.
    O,
}

impl AttentionOperand {
    /// All four attention operands, in Q, K, V, O order.
    pub const ALL: [AttentionOperand; 4] = [
        AttentionOperand::Q,
        AttentionOperand::K,
        AttentionOperand::V,
        AttentionOperand::O,
    ];

    /// Single-letter spelling used in emitted shader identifiers.
    pub const fn letter(self) -> &'static str {
        match self {
            AttentionOperand::Q => "Q",
            AttentionOperand::K => "K",
            AttentionOperand::V => "V",
            AttentionOperand::O => "O",
        }
    }
}

impl fmt::Display for AttentionOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}
