//! Single-pass filter/map/reduce pipelines.
//!
//! Stages are composed right-to-left into one step function so that each
//! element flows through every stage in a single call chain, and the input
//! is traversed exactly once.

pub mod builder;
pub mod stage;
pub mod step;

pub use builder::{CompiledPipeline, ExecutionStats, Pipeline, TerminalKind};
pub use stage::{Stage, StageBuilder, StageKind};
pub use step::{collect_step, Accumulator, Combine, Predicate, Step, Transform};
