// core/src/pipeline/mod.rs

//! A small step pipeline: named steps, `before`/`on`/`after` handlers, early
//! stop, and optional steps. Checkout flows in `crate::flows` are built on it.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use definition::{Handler, Pipeline, SkipCondition, StepDef};
