//! Pipeline module - from raw abundance table to compared models

pub mod abundance;
pub mod benchmark;
pub mod importance;
pub mod loader;
pub mod metrics;
pub mod resampling;
pub mod search;
pub mod target;
pub mod task;

pub use abundance::*;
pub use benchmark::*;
pub use importance::*;
pub use loader::*;
pub use metrics::*;
pub use resampling::*;
pub use search::*;
pub use target::*;
pub use task::*;
