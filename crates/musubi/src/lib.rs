//! Short-circuit step connections for async workflows.
//!
//! A [`Workflow`] declares steps and an [`Expression`] connecting them. Each
//! execution binds the expression to a fresh [`Organizer`] and evaluates it:
//! steps run lazily, at most once, and only when their outcome can still
//! change the decision.
//!
//! # Example
//!
//! ```
//! use musubi::prelude::*;
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! struct Lookup {
//!     hit: bool,
//! }
//!
//! #[async_trait]
//! impl Step for Lookup {
//!     async fn call(&self, ctx: &mut Context) -> Result<Outcome, WorkflowError> {
//!         ctx.insert("looked_up", true);
//!         if self.hit {
//!             Ok(Outcome::success(Data::new()))
//!         } else {
//!             Ok(Outcome::failure(Data::new()))
//!         }
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), WorkflowError> {
//!     let workflow = Workflow::builder()
//!         .add_step("cache", Lookup { hit: false })
//!         .add_step("database", Lookup { hit: true })
//!         .connect(|steps| Ok(Expression::or(steps.scalar("cache")?, steps.scalar("database")?)))
//!         .build()?;
//!
//!     let execution = workflow.execute(Context::new()).await?;
//!     assert!(execution.outcome().is_success());
//!     assert_eq!(execution.executed().await, vec![0, 1]);
//!     Ok(())
//! }
//! ```

pub mod expression;
mod organizer;
mod workflow;

// Re-export core types
pub use musubi_core::*;

pub use expression::{Argument, Comparison, Conditional, Expression, ExpressionKind, HasArguments};
pub use organizer::{Organizer, StepDefinition, StepHandle};
pub use workflow::{Execution, Workflow, WorkflowBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Argument, Comparison, Conditional, Context, Data, Execution, Expression,
        ExpressionError, HasArguments, Organizer, Outcome, Status, Step, StepConfig,
        StepDefinition, StepHandle, StepName, Workflow, WorkflowBuilder, WorkflowError,
    };
}
