//! Pipeline builder, composition and single-pass execution.
//!
//! A [`Pipeline`] collects stages in execution order. [`Pipeline::compose`]
//! folds them right-to-left into one combined step and returns a separate
//! [`CompiledPipeline`], so a compiled step can never go stale when the
//! builder changes afterwards. Execution drives the combined step over the
//! input exactly once, without building any intermediate sequence.
//!
//! # Example
//!
//! ```rust
//! use foldline::{Accumulator, Pipeline};
//!
//! let compiled = Pipeline::new()
//!     .filter(|x: &i32, _, _| x % 2 == 1)
//!     .map(|x, _, _| x * 2)
//!     .reduce(|acc: i64, x, _, _| acc + i64::from(*x), 0)
//!     .compose()
//!     .unwrap();
//!
//! let first = [1, 2, 3, 4, 5];
//! let second = [6, 7, 8, 9, 0];
//! assert_eq!(compiled.execute(&first[..]).unwrap(), Accumulator::Value(18));
//! assert_eq!(compiled.execute(&second[..]).unwrap(), Accumulator::Value(32));
//! ```

use super::stage::{Stage, StageKind};
use super::step::{Accumulator, Step};
use crate::errors::{PipelineError, Result};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, warn};

/// Ordered list of stages; insertion order is execution order.
///
/// `A` is the accumulator type of a terminal reduce stage. Pipelines
/// without a reduce stage collect into a sequence and never use it.
pub struct Pipeline<T, A = T> {
    stages: Vec<Stage<T, A>>,
}

impl<T, A> Pipeline<T, A> {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Create a pipeline from an explicit stage list.
    pub fn from_stages(stages: Vec<Stage<T, A>>) -> Self {
        Self { stages }
    }

    /// Append a stage.
    ///
    /// Stage order is not checked here; a reduce stage that ends up before
    /// another stage is reported by [`Pipeline::compose`].
    pub fn push(mut self, stage: Stage<T, A>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append a filter stage.
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&T, usize, &[T]) -> bool + Send + Sync + 'static,
    {
        self.push(Stage::filter(predicate))
    }

    /// Append a map stage.
    pub fn map<F>(self, transform: F) -> Self
    where
        F: Fn(&T, usize, &[T]) -> T + Send + Sync + 'static,
    {
        self.push(Stage::map(transform))
    }

    /// Append a reduce stage.
    pub fn reduce<F>(self, combine: F, seed: A) -> Self
    where
        F: Fn(A, &T, usize, &[T]) -> A + Send + Sync + 'static,
    {
        self.push(Stage::reduce(combine, seed))
    }

    /// Apply `f` to the builder only when `condition` holds.
    ///
    /// # Example
    ///
    /// ```rust
    /// use foldline::Pipeline;
    ///
    /// let only_odd = true;
    /// let pipeline: Pipeline<i32> = Pipeline::new()
    ///     .when(only_odd, |p| p.filter(|x: &i32, _, _| x % 2 == 1))
    ///     .map(|x, _, _| x * 2);
    /// assert_eq!(pipeline.len(), 2);
    /// ```
    pub fn when<F>(self, condition: bool, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        if condition {
            f(self)
        } else {
            self
        }
    }

    pub fn stages(&self) -> &[Stage<T, A>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<T, A> Pipeline<T, A>
where
    T: Clone + 'static,
    A: Clone + 'static,
{
    /// Fold the stages into one combined step.
    ///
    /// The last stage wraps the terminal step (its own combine callback for
    /// a reduce, the built-in append step otherwise) and supplies the
    /// initial accumulator; every earlier stage, from the second-to-last
    /// back to the first, wraps the step built so far. Composing again
    /// rebuilds an equivalent step with its own copy of the reduce seed.
    pub fn compose(&self) -> Result<CompiledPipeline<T, A>> {
        let _span = debug_span!("compose", stages = self.stages.len()).entered();

        let Some((terminal, upstream)) = self.stages.split_last() else {
            warn!("Refusing to compose an empty pipeline");
            return Err(PipelineError::EmptyPipeline);
        };

        let composed = match terminal.reduce_terminal() {
            Some((step, seed)) => Composed::Reduce {
                step: wrap_upstream(upstream, terminal.combinator(step)?)?,
                seed,
            },
            None => Composed::Collect(wrap_upstream(upstream, terminal.collect_terminal()?)?),
        };

        let kind = TerminalKind::from(terminal.kind());
        debug!(terminal = ?kind, "Composed pipeline");
        Ok(CompiledPipeline {
            composed,
            stage_count: self.stages.len(),
        })
    }

    /// Compose and immediately execute over `sequence`.
    pub fn compose_and_execute<'s>(
        &self,
        sequence: impl Into<Option<&'s [T]>>,
    ) -> Result<Accumulator<T, A>>
    where
        T: 's,
    {
        self.compose()?.execute(sequence)
    }
}

fn wrap_upstream<T, A, Acc>(
    upstream: &[Stage<T, A>],
    terminal: Step<T, Acc>,
) -> Result<Step<T, Acc>>
where
    T: 'static,
    A: 'static,
    Acc: 'static,
{
    upstream
        .iter()
        .rev()
        .try_fold(terminal, |step, stage| stage.combinator(step))
        .inspect_err(|e| warn!(error = %e, "Pipeline composition failed"))
}

impl<T, A> Default for Pipeline<T, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A> FromIterator<Stage<T, A>> for Pipeline<T, A> {
    fn from_iter<I: IntoIterator<Item = Stage<T, A>>>(iter: I) -> Self {
        Self::from_stages(iter.into_iter().collect())
    }
}

impl<T, A: Clone> Clone for Pipeline<T, A> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
        }
    }
}

impl<T, A> fmt::Debug for Pipeline<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .finish()
    }
}

enum Composed<T, A> {
    Collect(Step<T, Vec<T>>),
    Reduce { step: Step<T, A>, seed: A },
}

/// A composed pipeline ready for execution.
///
/// The pipeline can be executed any number of times over different inputs;
/// every run starts from its own copy of the initial accumulator.
pub struct CompiledPipeline<T, A> {
    composed: Composed<T, A>,
    stage_count: usize,
}

impl<T, A: Clone> CompiledPipeline<T, A> {
    /// Run the combined step over `sequence`, index 0 upwards.
    ///
    /// Fails with [`PipelineError::MissingSequence`] when no sequence is
    /// supplied. Filtering only drops an element's contribution; the
    /// traversal always visits every index.
    pub fn execute<'s>(&self, sequence: impl Into<Option<&'s [T]>>) -> Result<Accumulator<T, A>>
    where
        T: 's,
    {
        let sequence = sequence.into().ok_or(PipelineError::MissingSequence)?;
        let _span = debug_span!("execute", elements = sequence.len()).entered();

        Ok(match &self.composed {
            Composed::Collect(step) => Accumulator::Sequence(traverse(step, Vec::new(), sequence)),
            Composed::Reduce { step, seed } => {
                Accumulator::Value(traverse(step, seed.clone(), sequence))
            }
        })
    }

    /// Execute and collect timing information for the run.
    pub fn execute_with_stats<'s>(
        &self,
        sequence: impl Into<Option<&'s [T]>>,
    ) -> Result<(Accumulator<T, A>, ExecutionStats)>
    where
        T: 's,
    {
        let sequence = sequence.into().ok_or(PipelineError::MissingSequence)?;
        let start = Instant::now();
        let result = self.execute(sequence)?;

        let stats = ExecutionStats {
            stages: self.stage_count,
            elements: sequence.len(),
            duration: start.elapsed(),
        };
        debug!(
            stages = stats.stages,
            elements = stats.elements,
            "{}",
            stats.format()
        );
        Ok((result, stats))
    }

    /// A fresh copy of the accumulator every execution starts from.
    pub fn initial_accumulator(&self) -> Accumulator<T, A> {
        match &self.composed {
            Composed::Collect(_) => Accumulator::Sequence(Vec::new()),
            Composed::Reduce { seed, .. } => Accumulator::Value(seed.clone()),
        }
    }
}

impl<T, A> CompiledPipeline<T, A> {
    /// Get the number of stages this pipeline was composed from.
    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    /// Kind of result this pipeline produces: a sequence or a reduced value.
    pub fn terminal_kind(&self) -> TerminalKind {
        match self.composed {
            Composed::Collect(_) => TerminalKind::Collect,
            Composed::Reduce { .. } => TerminalKind::Reduce,
        }
    }
}

impl<T, A> fmt::Debug for CompiledPipeline<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPipeline")
            .field("stage_count", &self.stage_count)
            .field("terminal", &self.terminal_kind())
            .finish_non_exhaustive()
    }
}

fn traverse<T, Acc>(step: &Step<T, Acc>, init: Acc, sequence: &[T]) -> Acc {
    let mut acc = init;
    for (index, element) in sequence.iter().enumerate() {
        acc = step.call(acc, element, index, sequence);
    }
    acc
}

/// How a compiled pipeline terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    /// Filter/map pipeline appending surviving elements to a new sequence
    Collect,
    /// Pipeline ending with a reduce stage
    Reduce,
}

impl From<StageKind> for TerminalKind {
    fn from(kind: StageKind) -> Self {
        match kind {
            StageKind::Reduce => Self::Reduce,
            StageKind::Filter | StageKind::Map => Self::Collect,
        }
    }
}

/// Timing information for one execution.
#[derive(Debug, Clone)]
pub struct ExecutionStats {
    /// Number of stages in the compiled pipeline
    pub stages: usize,

    /// Number of input elements visited
    pub elements: usize,

    /// Time taken by the traversal
    pub duration: Duration,
}

impl ExecutionStats {
    /// Format the stats as a human-readable string.
    pub fn format(&self) -> String {
        format!(
            "{} stages over {} elements: {:.3}ms",
            self.stages,
            self.elements,
            self.duration.as_secs_f64() * 1000.0
        )
    }
}
