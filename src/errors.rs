//! Error types for pipeline construction, composition and execution.
//!
//! Every error is raised synchronously at the call that violates the
//! contract: stage construction, composition, execution, or resolution of
//! a declarative definition. Nothing is deferred into the traversal and no
//! partial result is ever returned alongside an error.
//!
//! # Error Codes
//!
//! Codes are assigned by category:
//! - E001-E009: pipeline contract violations
//! - E010-E019: definition resolution errors
//!
//! # Example
//!
//! ```rust
//! use foldline::{Pipeline, PipelineError};
//!
//! let pipeline: Pipeline<i32> = Pipeline::new();
//! let err = pipeline.compose().unwrap_err();
//! assert!(matches!(err, PipelineError::EmptyPipeline));
//! assert_eq!(err.code(), "E005");
//! ```

use crate::pipeline::StageKind;
use thiserror::Error;

/// Main error type for foldline operations
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage was built without its predicate, transform or combine callback
    #[error("{kind} stage is missing its callback")]
    MissingCallback { kind: StageKind },

    /// A reduce stage was built without a seed accumulator
    #[error("reduce stage '{stage}' is missing its seed")]
    MissingSeed { stage: String },

    /// Composition reached a reduce stage that is not the final stage
    #[error("reduce stage '{stage}' must be the last stage of the pipeline")]
    ReduceNotLast { stage: String },

    /// Execution was invoked without an input sequence
    #[error("no input sequence was supplied")]
    MissingSequence,

    /// Composition was invoked on a pipeline with no stages
    #[error("cannot compose an empty pipeline")]
    EmptyPipeline,

    /// A definition references a callback that is not registered
    #[error("no {kind} callback registered under '{name}'")]
    UnknownCallback { kind: StageKind, name: String },

    /// A definition seed could not be converted into the accumulator type
    #[error("invalid seed for reduce stage '{stage}': {message}")]
    InvalidSeed { stage: String, message: String },
}

impl PipelineError {

    /// Stable error code for documentation and programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCallback { .. } => "E001",
            Self::MissingSeed { .. } => "E002",
            Self::ReduceNotLast { .. } => "E003",
            Self::MissingSequence => "E004",
            Self::EmptyPipeline => "E005",
            Self::UnknownCallback { .. } => "E010",
            Self::InvalidSeed { .. } => "E011",
        }
    }

    /// Whether the error comes from a declarative definition rather than
    /// direct use of the builder API.
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownCallback { .. } | Self::InvalidSeed { .. }
        )
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            PipelineError::MissingCallback {
                kind: StageKind::Filter,
            },
            PipelineError::MissingSeed {
                stage: "sum".into(),
            },
            PipelineError::ReduceNotLast {
                stage: "sum".into(),
            },
            PipelineError::MissingSequence,
            PipelineError::EmptyPipeline,
            PipelineError::UnknownCallback {
                kind: StageKind::Map,
                name: "triple".into(),
            },
            PipelineError::InvalidSeed {
                stage: "sum".into(),
                message: "expected i64".into(),
            },
        ];

        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_error_messages_identify_contract() {
        let err = PipelineError::MissingCallback {
            kind: StageKind::Filter,
        };
        assert_eq!(err.to_string(), "filter stage is missing its callback");

        let err = PipelineError::ReduceNotLast {
            stage: "total".into(),
        };
        assert!(err.to_string().contains("'total'"));
        assert!(err.to_string().contains("last stage"));
    }

    #[test]
    fn test_definition_error_classification() {
        let err = PipelineError::UnknownCallback {
            kind: StageKind::Filter,
            name: "is_even".into(),
        };
        assert!(err.is_definition_error());
        assert!(!PipelineError::EmptyPipeline.is_definition_error());
        assert!(!PipelineError::MissingSequence.is_definition_error());
    }
}
