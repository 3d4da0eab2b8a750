//! Grid/threadgroup sizing for a synthesised kernel, and the five-step
//! dispatch-sequence plan for one attention forward/backward pass.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attention_plan;
pub mod error;
pub mod gemm_plan;

/// Re-export of the abstract `Device`/`Pipeline` capability traits, so
/// dispatch-planner callers don't need a direct dependency on
/// `kernelforge-cache` just to name `Device`.
pub use kernelforge_cache::device;

pub use attention_plan::{binding, plan_attention_dispatch, AttentionDispatchPlan, AttentionStep};
pub use error::{Error, Result};
pub use gemm_plan::{plan_gemm_dispatch, GemmDispatch};
