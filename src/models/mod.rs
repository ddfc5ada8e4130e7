//! Data models for the exam-candidate registry.
//!
//! Field names follow the camelCase JSON used by the browser client and the data file.

mod candidate;
mod log;
mod snapshot;
mod stats;

pub use candidate::*;
pub use log::*;
pub use snapshot::*;
pub use stats::*;
