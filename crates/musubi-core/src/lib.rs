//! Core types for the musubi step-connection engine.
//!
//! This crate carries no runtime. Step authors depend on it to implement
//! [`Step`]; the engine crate consumes the same types.
//!
//! # Core Types
//!
//! - [`Step`] - One unit of work, run at most once per workflow execution
//! - [`Outcome`] - Tri-state result of a step (success, failure, error)
//! - [`Context`] - Values shared between the steps of one execution
//! - [`WorkflowError`], [`ExpressionError`] - Error types

mod context;
mod error;
mod outcome;
mod step;

pub use context::{Context, JournalEntry};
pub use error::{ExpressionError, WorkflowError};
pub use outcome::{Data, Outcome, Status};
pub use step::{Step, StepConfig, StepName};
