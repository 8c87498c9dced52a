//! Tri-state step outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload carried by a successful or failed outcome.
pub type Data = serde_json::Map<String, serde_json::Value>;

/// The status of an [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The step did what it was asked to do.
    Success,
    /// The step ran and decided against its goal. This is data, not a fault.
    Failure,
    /// The step could not run to completion.
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::Failure => write!(f, "failure"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// Result of running a step: success, failure or error, each with its own
/// payload.
///
/// # Examples
///
/// ```
/// use musubi_core::{Data, Outcome, Status};
///
/// let mut data = Data::new();
/// data.insert("order_id".into(), 42.into());
///
/// let outcome = Outcome::success(data.clone());
/// assert!(outcome.is_success());
///
/// let negated = outcome.negated();
/// assert_eq!(negated.status(), Status::Failure);
/// assert_eq!(negated.data(), Some(&data));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Successful outcome.
    Success {
        /// Values produced by the step.
        #[serde(default)]
        data: Data,
    },
    /// Failed outcome.
    Failure {
        /// Values produced by the step before it failed.
        #[serde(default)]
        data: Data,
        /// Optional human-readable reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Errored outcome.
    Error {
        /// Description of the fault.
        message: String,
    },
}

impl Outcome {
    /// Creates a successful outcome.
    pub fn success(data: Data) -> Self {
        Self::Success { data }
    }

    /// Creates a failed outcome without a reason.
    pub fn failure(data: Data) -> Self {
        Self::Failure { data, reason: None }
    }

    /// Creates a failed outcome with a reason.
    pub fn failure_with_reason(data: Data, reason: impl Into<String>) -> Self {
        Self::Failure {
            data,
            reason: Some(reason.into()),
        }
    }

    /// Creates an errored outcome.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Returns the status of this outcome.
    pub fn status(&self) -> Status {
        match self {
            Outcome::Success { .. } => Status::Success,
            Outcome::Failure { .. } => Status::Failure,
            Outcome::Error { .. } => Status::Error,
        }
    }

    /// Returns `true` for a successful outcome.
    pub fn is_success(&self) -> bool {
        self.status() == Status::Success
    }

    /// Returns `true` for a failed outcome.
    pub fn is_failure(&self) -> bool {
        self.status() == Status::Failure
    }

    /// Returns `true` for an errored outcome.
    pub fn is_error(&self) -> bool {
        self.status() == Status::Error
    }

    /// Returns the payload, if this outcome carries one.
    pub fn data(&self) -> Option<&Data> {
        match self {
            Outcome::Success { data } | Outcome::Failure { data, .. } => Some(data),
            Outcome::Error { .. } => None,
        }
    }

    /// Swaps success and failure, keeping the payload. Errors are returned
    /// unchanged.
    pub fn negated(&self) -> Self {
        match self {
            Outcome::Success { data } => Outcome::failure(data.clone()),
            Outcome::Failure { data, .. } => Outcome::success(data.clone()),
            Outcome::Error { .. } => self.clone(),
        }
    }
}
