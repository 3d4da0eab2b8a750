//! Tiled GEMM descriptor and kernel synthesiser.
//!
//! `C <- op(A) * op(B) + C` (alpha fixed at 1, beta in `{0, 1}` via
//! [`GemmDescriptor::with_load_previous_c`]).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod descriptor;
pub mod error;
pub mod kernel;
mod shader;
pub mod tile_table;

pub use descriptor::{
    GemmDescriptor, LeadingBlockDimensionOverrides, PrecisionTriple, Splits, TransposeState,
};
pub use error::{Error, Result};
pub use kernel::GemmKernel;
