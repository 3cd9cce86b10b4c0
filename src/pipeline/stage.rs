//! Pipeline stage abstractions for single-pass composition.
//!
//! A `Stage` is one step of a pipeline: a filter, a map, or a terminal
//! reduce. Each stage knows how to wrap a downstream step function into a
//! combined step (its combinator) and which accumulator a pipeline ending
//! with it starts from.
//!
//! Stages can be constructed directly, where the callback can never be
//! absent, or through a [`StageBuilder`] when the parts arrive separately
//! (for example from a declarative definition). The builder validates
//! eagerly: a stage never exists without its callback, and a reduce stage
//! never exists without its seed.
//!
//! # Example
//!
//! ```rust
//! use foldline::{Stage, StageKind};
//!
//! let odd: Stage<i32, i64> = Stage::filter(|x: &i32, _, _| x % 2 == 1);
//! assert_eq!(odd.kind(), StageKind::Filter);
//!
//! let err = Stage::<i32, i64>::builder(StageKind::Reduce)
//!     .combine(|acc: i64, x: &i32, _, _| acc + i64::from(*x))
//!     .build()
//!     .unwrap_err();
//! assert_eq!(err.code(), "E002");
//! ```

use super::step::{collect_step, Accumulator, Combine, Predicate, Step, Transform};
use crate::errors::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which behavior a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Filter,
    Map,
    Reduce,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Map => "map",
            Self::Reduce => "reduce",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum StageOp<T, A> {
    Filter(Predicate<T>),
    Map(Transform<T>),
    Reduce { combine: Combine<T, A>, seed: A },
}

/// One step of a pipeline over elements `T`, with reduce accumulator `A`.
pub struct Stage<T, A> {
    name: Option<String>,
    op: StageOp<T, A>,
}

impl<T, A> Stage<T, A> {
    /// Create a filter stage that keeps elements for which `predicate` holds.
    pub fn filter<F>(predicate: F) -> Self
    where
        F: Fn(&T, usize, &[T]) -> bool + Send + Sync + 'static,
    {
        Self {
            name: None,
            op: StageOp::Filter(Arc::new(predicate)),
        }
    }

    /// Create a map stage that replaces each element with `transform`'s result.
    pub fn map<F>(transform: F) -> Self
    where
        F: Fn(&T, usize, &[T]) -> T + Send + Sync + 'static,
    {
        Self {
            name: None,
            op: StageOp::Map(Arc::new(transform)),
        }
    }

    /// Create a terminal reduce stage folding with `combine` from `seed`.
    pub fn reduce<F>(combine: F, seed: A) -> Self
    where
        F: Fn(A, &T, usize, &[T]) -> A + Send + Sync + 'static,
    {
        Self {
            name: None,
            op: StageOp::Reduce {
                combine: Arc::new(combine),
                seed,
            },
        }
    }

    /// Start building a stage whose parts are supplied separately.
    pub fn builder(kind: StageKind) -> StageBuilder<T, A> {
        StageBuilder::new(kind)
    }

    /// Attach a name used in diagnostics.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn kind(&self) -> StageKind {
        match self.op {
            StageOp::Filter(_) => StageKind::Filter,
            StageOp::Map(_) => StageKind::Map,
            StageOp::Reduce { .. } => StageKind::Reduce,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The stage name, falling back to its kind.
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.kind().as_str().to_string())
    }

    /// The combine callback of a reduce stage.
    pub fn combine(&self) -> Option<&Combine<T, A>> {
        match &self.op {
            StageOp::Reduce { combine, .. } => Some(combine),
            _ => None,
        }
    }

    /// The seed of a reduce stage, as supplied (not copied).
    pub fn seed(&self) -> Option<&A> {
        match &self.op {
            StageOp::Reduce { seed, .. } => Some(seed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.op, StageOp::Reduce { .. })
    }
}

impl<T, A> Stage<T, A>
where
    T: 'static,
    A: 'static,
{
    /// Wrap `downstream` into the step this stage contributes.
    ///
    /// A filter forwards the untouched arguments only when its predicate
    /// holds and otherwise returns the accumulator unchanged. A map forwards
    /// the transformed element at the same index against the same source
    /// sequence. A reduce stage is the end of the chain: its combinator
    /// accepts only its own [`terminal_step`](Self::terminal_step) and
    /// returns it unchanged. Any other downstream step means the reduce is
    /// not the last stage, and fails with [`PipelineError::ReduceNotLast`].
    pub fn combinator<Acc>(&self, downstream: Step<T, Acc>) -> Result<Step<T, Acc>>
    where
        Acc: 'static,
    {
        match &self.op {
            StageOp::Filter(predicate) => {
                let predicate = Arc::clone(predicate);
                Ok(Step::new(
                    move |acc: Acc, element: &T, index: usize, sequence: &[T]| {
                        if predicate(element, index, sequence) {
                            downstream.call(acc, element, index, sequence)
                        } else {
                            acc
                        }
                    },
                ))
            }
            StageOp::Map(transform) => {
                let transform = Arc::clone(transform);
                Ok(Step::new(
                    move |acc: Acc, element: &T, index: usize, sequence: &[T]| {
                        let mapped = transform(element, index, sequence);
                        downstream.call(acc, &mapped, index, sequence)
                    },
                ))
            }
            StageOp::Reduce { combine, .. } if downstream.is_combine(combine) => Ok(downstream),
            StageOp::Reduce { .. } => Err(PipelineError::ReduceNotLast {
                stage: self.label(),
            }),
        }
    }

    /// The step a pipeline ending with this reduce stage runs: its own
    /// combine callback. `None` for filter and map stages.
    pub fn terminal_step(&self) -> Option<Step<T, A>> {
        self.combine().map(Step::from_combine)
    }

    /// Terminal step of a reduce stage together with a fresh copy of its
    /// seed.
    pub(crate) fn reduce_terminal(&self) -> Option<(Step<T, A>, A)>
    where
        A: Clone,
    {
        let step = self.terminal_step()?;
        let seed = self.seed()?.clone();
        Some((step, seed))
    }

    /// Terminal step of a filter/map stage: its combinator over the
    /// built-in append step.
    pub(crate) fn collect_terminal(&self) -> Result<Step<T, Vec<T>>>
    where
        T: Clone,
    {
        self.combinator(collect_step())
    }
}

impl<T, A: Clone> Stage<T, A> {
    /// The accumulator a pipeline ending with this stage starts from.
    ///
    /// Filter and map stages start from a fresh empty sequence. A reduce
    /// stage starts from a copy of its seed, so mutation of one run's
    /// accumulator never leaks into the next.
    pub fn initial_accumulator(&self) -> Accumulator<T, A> {
        match &self.op {
            StageOp::Reduce { seed, .. } => Accumulator::Value(seed.clone()),
            _ => Accumulator::Sequence(Vec::new()),
        }
    }
}

impl<T, A: Clone> Clone for Stage<T, A> {
    fn clone(&self) -> Self {
        let op = match &self.op {
            StageOp::Filter(predicate) => StageOp::Filter(Arc::clone(predicate)),
            StageOp::Map(transform) => StageOp::Map(Arc::clone(transform)),
            StageOp::Reduce { combine, seed } => StageOp::Reduce {
                combine: Arc::clone(combine),
                seed: seed.clone(),
            },
        };
        Self {
            name: self.name.clone(),
            op,
        }
    }
}

impl<T, A> fmt::Debug for Stage<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("kind", &self.kind())
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Builder for stages whose callback and seed are supplied separately.
///
/// `build()` fails with [`PipelineError::MissingCallback`] when the
/// callback required by the kind is absent, and with
/// [`PipelineError::MissingSeed`] when a reduce stage has no seed. A
/// missing seed is never defaulted.
pub struct StageBuilder<T, A> {
    kind: StageKind,
    name: Option<String>,
    predicate: Option<Predicate<T>>,
    transform: Option<Transform<T>>,
    combine: Option<Combine<T, A>>,
    seed: Option<A>,
}

impl<T, A> StageBuilder<T, A> {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            name: None,
            predicate: None,
            transform: None,
            combine: None,
            seed: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn predicate<F>(self, predicate: F) -> Self
    where
        F: Fn(&T, usize, &[T]) -> bool + Send + Sync + 'static,
    {
        self.with_predicate(Some(Arc::new(predicate)))
    }

    pub fn transform<F>(self, transform: F) -> Self
    where
        F: Fn(&T, usize, &[T]) -> T + Send + Sync + 'static,
    {
        self.with_transform(Some(Arc::new(transform)))
    }

    pub fn combine<F>(self, combine: F) -> Self
    where
        F: Fn(A, &T, usize, &[T]) -> A + Send + Sync + 'static,
    {
        self.with_combine(Some(Arc::new(combine)))
    }

    pub fn seed(self, seed: A) -> Self {
        self.with_seed(Some(seed))
    }

    pub fn with_predicate(mut self, predicate: Option<Predicate<T>>) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn with_transform(mut self, transform: Option<Transform<T>>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_combine(mut self, combine: Option<Combine<T, A>>) -> Self {
        self.combine = combine;
        self
    }

    pub fn with_seed(mut self, seed: Option<A>) -> Self {
        self.seed = seed;
        self
    }

    /// Validate the collected parts and produce the stage.
    pub fn build(self) -> Result<Stage<T, A>> {
        let missing_callback = PipelineError::MissingCallback { kind: self.kind };
        let op = match self.kind {
            StageKind::Filter => StageOp::Filter(self.predicate.ok_or(missing_callback)?),
            StageKind::Map => StageOp::Map(self.transform.ok_or(missing_callback)?),
            StageKind::Reduce => {
                let combine = self.combine.ok_or(missing_callback)?;
                let seed = self.seed.ok_or_else(|| PipelineError::MissingSeed {
                    stage: self
                        .name
                        .clone()
                        .unwrap_or_else(|| StageKind::Reduce.as_str().to_string()),
                })?;
                StageOp::Reduce { combine, seed }
            }
        };

        Ok(Stage {
            name: self.name,
            op,
        })
    }
}
