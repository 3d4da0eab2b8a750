//! Fingerprint-keyed pipeline cache and the abstract `Device`/`Pipeline`
//! capability traits the synthesised kernels dispatch through.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cache;
pub mod device;
pub mod error;

pub use cache::PipelineCache;
pub use error::{Error, Result};
