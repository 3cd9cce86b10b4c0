//! Single-pass filter/map/reduce pipelines.
//!
//! `foldline` composes independently defined stages into one step function
//! `(accumulator, element, index, sequence) -> accumulator` and runs it over
//! the input exactly once. No intermediate sequence is built between
//! stages: each element flows through every filter and map in a single call
//! chain, and a filter only drops that element's contribution.
//!
//! ```rust
//! use foldline::{Accumulator, Pipeline};
//!
//! let source = [1, 2, 3, 4, 5];
//!
//! let doubled_odds: Pipeline<i32> = Pipeline::new()
//!     .filter(|x: &i32, _, _| x % 2 == 1)
//!     .map(|x, _, _| x * 2);
//! assert_eq!(
//!     doubled_odds.compose_and_execute(&source[..]).unwrap(),
//!     Accumulator::Sequence(vec![2, 6, 10])
//! );
//!
//! let total = doubled_odds
//!     .clone()
//!     .push(foldline::Stage::reduce(|acc: i32, x: &i32, _, _| acc + x, 0));
//! assert_eq!(
//!     total.compose_and_execute(&source[..]).unwrap(),
//!     Accumulator::Value(18)
//! );
//! ```
//!
//! Pipelines can also be described as data and resolved against a
//! [`CallbackRegistry`] of named callbacks; see [`definition`].

pub mod definition;
pub mod errors;
pub mod pipeline;

// Re-export commonly used types
pub use crate::definition::{CallbackRegistry, PipelineDefinition, StageDefinition};
pub use crate::errors::{PipelineError, Result};
pub use crate::pipeline::{
    Accumulator, CompiledPipeline, ExecutionStats, Pipeline, Stage, StageBuilder, StageKind,
    TerminalKind,
};
