//! Declarative pipeline definitions.
//!
//! A definition describes a pipeline as data: an ordered list of stages,
//! each naming its kind, the registered callback it uses and, for reduce
//! stages, a seed. Definitions are plain in-memory values resolved into a
//! [`Pipeline`](crate::Pipeline) through a [`CallbackRegistry`].
//!
//! ```rust
//! use foldline::{Accumulator, CallbackRegistry, PipelineDefinition, StageDefinition, StageKind};
//! use serde_json::json;
//!
//! let definition = PipelineDefinition::new(vec![
//!     StageDefinition::new(StageKind::Filter).with_callback("is_odd"),
//!     StageDefinition::new(StageKind::Reduce)
//!         .with_name("total")
//!         .with_callback("sum")
//!         .with_seed(json!(0)),
//! ]);
//!
//! let registry: CallbackRegistry<i32, i64> = CallbackRegistry::new()
//!     .with_predicate("is_odd", |x: &i32, _, _| x % 2 == 1)
//!     .with_combine("sum", |acc: i64, x: &i32, _, _| acc + i64::from(*x));
//!
//! let compiled = registry.compile(&definition).unwrap();
//! let source = [1, 2, 3];
//! assert_eq!(compiled.execute(&source[..]).unwrap(), Accumulator::Value(4));
//! ```

pub mod registry;

pub use registry::{CallbackRegistry, DefinitionValidation};

use crate::pipeline::StageKind;
use serde::{Deserialize, Serialize};

/// Root of a pipeline definition document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDefinition {
    /// Stages in execution order
    #[serde(default)]
    pub stages: Vec<StageDefinition>,
}

/// One stage of a pipeline definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageDefinition {
    pub kind: StageKind,

    /// Optional name used in diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Name of the registered callback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,

    /// Initial accumulator of a reduce stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<serde_json::Value>,
}

impl StageDefinition {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            name: None,
            callback: None,
            seed: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    pub fn with_seed(mut self, seed: serde_json::Value) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The stage name, falling back to the callback name and then the kind.
    pub fn label(&self) -> String {
        self.name
            .as_deref()
            .or(self.callback.as_deref())
            .unwrap_or(self.kind.as_str())
            .to_string()
    }
}

impl PipelineDefinition {
    pub fn new(stages: Vec<StageDefinition>) -> Self {
        Self { stages }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
