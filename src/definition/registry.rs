//! Named callbacks and resolution of definitions into pipelines.
//!
//! Definitions refer to callbacks by name. A [`CallbackRegistry`] maps those
//! names to predicates, transforms and combiners, and turns a
//! [`PipelineDefinition`] into a [`Pipeline`].
//!
//! Resolution uses stillwater's `Validation` so that every problem in a
//! definition is reported at once instead of stopping at the first one.

use super::{PipelineDefinition, StageDefinition};
use crate::errors::{PipelineError, Result};
use crate::pipeline::{
    Combine, CompiledPipeline, Pipeline, Predicate, Stage, StageKind, Transform,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use stillwater::{NonEmptyVec, Validation};
use tracing::{debug, warn};

/// Result of validating a definition: the pipeline, or every problem found.
pub type DefinitionValidation<T, A> = Validation<Pipeline<T, A>, NonEmptyVec<PipelineError>>;

/// Callbacks available to definitions, keyed by name.
pub struct CallbackRegistry<T, A> {
    predicates: HashMap<String, Predicate<T>>,
    transforms: HashMap<String, Transform<T>>,
    combiners: HashMap<String, Combine<T, A>>,
}

impl<T, A> CallbackRegistry<T, A> {
    pub fn new() -> Self {
        Self {
            predicates: HashMap::new(),
            transforms: HashMap::new(),
            combiners: HashMap::new(),
        }
    }

    /// Register a filter predicate under `name`.
    pub fn with_predicate<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T, usize, &[T]) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
        self
    }

    /// Register a map transform under `name`.
    pub fn with_transform<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&T, usize, &[T]) -> T + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Arc::new(transform));
        self
    }

    /// Register a reduce combiner under `name`.
    pub fn with_combine<F>(mut self, name: impl Into<String>, combine: F) -> Self
    where
        F: Fn(A, &T, usize, &[T]) -> A + Send + Sync + 'static,
    {
        self.combiners.insert(name.into(), Arc::new(combine));
        self
    }

    pub fn contains(&self, kind: StageKind, name: &str) -> bool {
        match kind {
            StageKind::Filter => self.predicates.contains_key(name),
            StageKind::Map => self.transforms.contains_key(name),
            StageKind::Reduce => self.combiners.contains_key(name),
        }
    }
}

impl<T, A> CallbackRegistry<T, A>
where
    A: DeserializeOwned,
{
    /// Resolve a definition, collecting every problem it contains.
    ///
    /// Reports an empty definition, reduce stages that are not last, stages
    /// without a callback, callbacks that are not registered, reduce stages
    /// without a seed and seeds that do not fit the accumulator type.
    pub fn validate(&self, definition: &PipelineDefinition) -> DefinitionValidation<T, A> {
        let mut errors = Vec::new();
        let mut stages = Vec::with_capacity(definition.stages.len());

        if definition.is_empty() {
            errors.push(PipelineError::EmptyPipeline);
        }

        let last = definition.stages.len().saturating_sub(1);
        for (position, stage) in definition.stages.iter().enumerate() {
            if stage.kind == StageKind::Reduce && position != last {
                errors.push(PipelineError::ReduceNotLast {
                    stage: stage.label(),
                });
            }

            match self.resolve_stage(stage) {
                Ok(resolved) => stages.push(resolved),
                Err(e) => errors.push(e),
            }
        }

        match NonEmptyVec::from_vec(errors) {
            Some(errors) => Validation::Failure(errors),
            None => {
                debug!(stages = stages.len(), "Resolved pipeline definition");
                Validation::Success(Pipeline::from_stages(stages))
            }
        }
    }

    /// Resolve a definition, failing with the first problem found.
    pub fn build(&self, definition: &PipelineDefinition) -> Result<Pipeline<T, A>> {
        match self.validate(definition) {
            Validation::Success(pipeline) => Ok(pipeline),
            Validation::Failure(errors) => {
                let mut errors = errors.into_vec();
                warn!(
                    problems = errors.len(),
                    "Pipeline definition has {} problem(s)",
                    errors.len()
                );
                Err(errors.remove(0))
            }
        }
    }

    fn resolve_stage(&self, definition: &StageDefinition) -> Result<Stage<T, A>> {
        let mut builder = Stage::builder(definition.kind).name(definition.label());

        if let Some(name) = &definition.callback {
            let unknown = || PipelineError::UnknownCallback {
                kind: definition.kind,
                name: name.clone(),
            };
            builder = match definition.kind {
                StageKind::Filter => {
                    let predicate = self.predicates.get(name).ok_or_else(unknown)?;
                    builder.with_predicate(Some(Arc::clone(predicate)))
                }
                StageKind::Map => {
                    let transform = self.transforms.get(name).ok_or_else(unknown)?;
                    builder.with_transform(Some(Arc::clone(transform)))
                }
                StageKind::Reduce => {
                    let combine = self.combiners.get(name).ok_or_else(unknown)?;
                    builder.with_combine(Some(Arc::clone(combine)))
                }
            };
        }

        match (definition.kind, &definition.seed) {
            (StageKind::Reduce, Some(seed)) => {
                let seed = serde_json::from_value::<A>(seed.clone()).map_err(|e| {
                    PipelineError::InvalidSeed {
                        stage: definition.label(),
                        message: e.to_string(),
                    }
                })?;
                builder = builder.seed(seed);
            }
            (kind, Some(_)) => {
                debug!(stage = %definition.label(), %kind, "Ignoring seed on non-reduce stage");
            }
            (_, None) => {}
        }

        builder.build()
    }
}

impl<T, A> CallbackRegistry<T, A>
where
    T: Clone + 'static,
    A: Clone + DeserializeOwned + 'static,
{
    /// Resolve and compose a definition in one call.
    pub fn compile(&self, definition: &PipelineDefinition) -> Result<CompiledPipeline<T, A>> {
        self.build(definition)?.compose()
    }
}

impl<T, A> Default for CallbackRegistry<T, A> {
    fn default() -> Self {
        Self::new()
    }
}
