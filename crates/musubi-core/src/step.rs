//! Step trait and related types.

use crate::context::Context;
use crate::error::WorkflowError;
use crate::outcome::Outcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::time::Duration;

/// Type-safe step name wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepName(String);

impl StepName {
    /// Creates a new StepName.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the step name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for StepName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for StepName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Execution settings for a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepConfig {
    /// Maximum time allowed for the step body. `None` means no timeout.
    pub timeout: Option<Duration>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl StepConfig {
    /// Config with the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    /// Config that lets the body run for as long as it needs.
    pub fn unbounded() -> Self {
        Self { timeout: None }
    }
}

/// One unit of work in a workflow.
///
/// The body reports success or failure through the returned [`Outcome`].
/// Returning `Err` signals a fault; the engine records it as an
/// [`Outcome::Error`].
///
/// # Examples
///
/// ```
/// use musubi_core::{Context, Data, Outcome, Step, WorkflowError};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct CheckStock;
///
/// #[async_trait]
/// impl Step for CheckStock {
///     async fn call(&self, ctx: &mut Context) -> Result<Outcome, WorkflowError> {
///         let available = ctx.get::<u32>("stock").copied().unwrap_or(0);
///         if available > 0 {
///             Ok(Outcome::success(Data::new()))
///         } else {
///             Ok(Outcome::failure_with_reason(Data::new(), "out of stock"))
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Runs the step body against the shared execution context.
    async fn call(&self, ctx: &mut Context) -> Result<Outcome, WorkflowError>;

    /// Returns the step configuration.
    fn config(&self) -> StepConfig {
        StepConfig::default()
    }
}
