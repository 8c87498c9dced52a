//! Error types for step execution and expression evaluation.

use crate::step::StepName;
use thiserror::Error;

/// Errors raised by the connection-expression engine itself.
///
/// These are programmer errors in how a tree was built or bound. A step that
/// fails is *not* an error at this layer; it is an ordinary
/// [`Outcome`](crate::Outcome).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExpressionError {
    /// `result` was requested from an empty expression.
    #[error("empty expression has no result")]
    EmptyResult,

    /// A status predicate was requested from an empty expression.
    #[error("empty expression has no status")]
    EmptyStatus,

    /// Rebinding found no step at the position a scalar refers to.
    #[error("no step at index {index} ('{name}') in the target organizer")]
    StepNotBound {
        /// Position of the step in its original organizer.
        index: usize,
        /// Name of the step in its original organizer.
        name: StepName,
    },

    /// Reconstruction received an argument of the wrong shape.
    #[error("argument {position} of {kind} has the wrong shape")]
    ArgumentMismatch {
        /// Expression kind being rebuilt.
        kind: &'static str,
        /// Zero-based argument position.
        position: usize,
    },
}

/// Errors that can occur while defining or running a workflow.
///
/// ```
/// use musubi_core::{StepName, WorkflowError};
///
/// fn describe(error: &WorkflowError) -> String {
///     match error {
///         WorkflowError::StepError { step_name, details } => {
///             format!("{step_name} failed: {details}")
///         }
///         WorkflowError::Timeout { step_name } => format!("{step_name} timed out"),
///         other => other.to_string(),
///     }
/// }
///
/// let error = WorkflowError::Timeout { step_name: StepName::new("charge") };
/// assert_eq!(describe(&error), "charge timed out");
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WorkflowError {
    /// A step body raised a fault.
    #[error("Step failed: {step_name}, details: {details}")]
    StepError {
        /// The name of the step that failed.
        step_name: StepName,
        /// Details about the failure.
        details: String,
    },

    /// A step exceeded its timeout duration.
    #[error("Timeout occurred in step: {step_name}")]
    Timeout {
        /// The name of the step that timed out.
        step_name: StepName,
    },

    /// A referenced step was not found in the workflow.
    #[error("Step not found: {0}")]
    StepNotFound(StepName),

    /// The workflow configuration is invalid.
    #[error("Invalid workflow configuration: {0}")]
    Configuration(String),

    /// The connection expression could not be bound or evaluated.
    #[error(transparent)]
    Expression(#[from] ExpressionError),
}
