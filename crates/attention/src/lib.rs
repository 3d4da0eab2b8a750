//! FlashAttention-style fused attention descriptor and kernel
//! synthesiser: forward, backward-query, and backward-key-value, sharing
//! one streaming-softmax skeleton.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod descriptor;
pub mod error;
pub mod kernel;
mod shader;
mod tile_table;

pub use descriptor::{
    AttentionDescriptor, AttentionPrecisions, AttentionTransposeState, KernelType,
};
pub use error::{Error, Result};
pub use kernel::AttentionKernel;
