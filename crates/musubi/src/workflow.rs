//! Workflow engine: declared steps plus the expression that connects them.

use crate::expression::Expression;
use crate::organizer::{Organizer, StepDefinition};
use musubi_core::{Context, Outcome, Step, StepConfig, StepName, WorkflowError};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

type Connector = Box<dyn FnOnce(&Organizer) -> Result<Expression, WorkflowError>>;

/// A set of steps and the connection deciding which of them run.
///
/// The connection is built once against a definition organizer. Every
/// [`Workflow::execute`] binds it to a fresh organizer, so steps run at most
/// once per execution and never share outcomes across executions.
pub struct Workflow {
    definitions: Vec<StepDefinition>,
    definition: Organizer,
    connection: Expression,
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("steps", &self.step_names().collect::<Vec<_>>())
            .field("connection", &self.connection.inspect())
            .finish()
    }
}

impl Workflow {
    /// Creates a new workflow builder.
    pub fn builder() -> WorkflowBuilder {
        WorkflowBuilder::new()
    }

    /// The connection as built against [`Workflow::definition`].
    pub fn connection(&self) -> &Expression {
        &self.connection
    }

    /// The organizer the connection was built against. Its steps are never run
    /// by [`Workflow::execute`].
    pub fn definition(&self) -> &Organizer {
        &self.definition
    }

    /// Returns the registered step names, in declaration order.
    pub fn step_names(&self) -> impl Iterator<Item = &StepName> {
        self.definitions.iter().map(StepDefinition::name)
    }

    /// Returns the number of registered steps.
    pub fn step_count(&self) -> usize {
        self.definitions.len()
    }

    /// Canonical text form of the connection.
    pub fn inspect(&self) -> String {
        self.connection.inspect()
    }

    /// Binds fresh, unevaluated steps to a new organizer over `ctx`.
    pub fn organizer(&self, ctx: Context) -> Organizer {
        Organizer::new(self.definitions.iter().cloned(), ctx)
    }

    /// Executes the workflow on a fresh organizer.
    ///
    /// Step failures and errors are part of the returned [`Outcome`]; only a
    /// connection that cannot be bound or evaluated is an `Err`.
    pub async fn execute(&self, ctx: Context) -> Result<Execution, WorkflowError> {
        let organizer = self.organizer(ctx);
        let connection = self.connection.with_organizer(&organizer)?;
        info!("Executing connection '{}'", connection);

        connection
            .each_evaluated_step(|step| {
                debug!("Connection reached step '{}' (index {})", step.name(), step.index());
            })
            .await?;

        let outcome = connection.result().await?;
        info!("Connection finished with {}", outcome.status());

        Ok(Execution {
            outcome,
            organizer,
            connection,
        })
    }
}

/// Result of one [`Workflow::execute`].
#[derive(Debug, Clone)]
pub struct Execution {
    outcome: Outcome,
    organizer: Organizer,
    connection: Expression,
}

impl Execution {
    /// Outcome of the connection.
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// The organizer the steps ran on.
    pub fn organizer(&self) -> &Organizer {
        &self.organizer
    }

    /// The connection bound to [`Execution::organizer`].
    pub fn connection(&self) -> &Expression {
        &self.connection
    }

    /// Steps that ran, in execution order.
    pub async fn executed(&self) -> Vec<usize> {
        self.organizer.context().await.executed()
    }

    /// Consumes the execution, returning its outcome.
    pub fn into_outcome(self) -> Outcome {
        self.outcome
    }
}

/// Builder for constructing [`Workflow`] instances.
#[derive(Default)]
pub struct WorkflowBuilder {
    definitions: Vec<StepDefinition>,
    connector: Option<Connector>,
}

impl fmt::Debug for WorkflowBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowBuilder")
            .field("definitions", &self.definitions)
            .field("connected", &self.connector.is_some())
            .finish()
    }
}

impl WorkflowBuilder {
    /// Creates a new empty workflow builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a step with an explicit name. Steps are indexed in the order they
    /// are added.
    pub fn add_step<S: Step + 'static>(mut self, name: impl Into<StepName>, step: S) -> Self {
        self.definitions.push(StepDefinition::new(name, step));
        self
    }

    /// Adds a step with a configuration overriding [`Step::config`].
    pub fn add_configured<S: Step + 'static>(
        mut self,
        name: impl Into<StepName>,
        step: S,
        config: StepConfig,
    ) -> Self {
        self.definitions
            .push(StepDefinition::with_config(name, step, config));
        self
    }

    /// Sets the connection. `connect` receives the definition organizer and
    /// builds the expression from its steps.
    ///
    /// Without a connection, steps run in order while they succeed.
    pub fn connect<F>(mut self, connect: F) -> Self
    where
        F: FnOnce(&Organizer) -> Result<Expression, WorkflowError> + 'static,
    {
        self.connector = Some(Box::new(connect));
        self
    }

    /// Builds the workflow.
    pub fn build(self) -> Result<Workflow, WorkflowError> {
        if self.definitions.is_empty() {
            return Err(WorkflowError::Configuration(
                "Workflow must contain at least one step".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for definition in &self.definitions {
            if !seen.insert(definition.name()) {
                return Err(WorkflowError::Configuration(format!(
                    "Duplicate step name: {}",
                    definition.name()
                )));
            }
        }

        let definition = Organizer::new(self.definitions.iter().cloned(), Context::new());
        let connection = match self.connector {
            Some(connect) => connect(&definition)?,
            None => Expression::sequence(definition.steps().iter().cloned()),
        };

        if let Some(foreign) = connection
            .steps()
            .into_iter()
            .find(|step| !definition.owns(step))
        {
            return Err(WorkflowError::StepNotFound(foreign.name().clone()));
        }

        debug!("Built workflow with connection '{}'", connection);
        Ok(Workflow {
            definitions: self.definitions,
            definition,
            connection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use musubi_core::Data;

    #[derive(Debug)]
    struct SuccessStep;

    #[async_trait]
    impl Step for SuccessStep {
        async fn call(&self, ctx: &mut Context) -> Result<Outcome, WorkflowError> {
            ctx.insert("success", true);
            Ok(Outcome::success(Data::new()))
        }
    }

    #[derive(Debug)]
    struct FailureStep;

    #[async_trait]
    impl Step for FailureStep {
        async fn call(&self, _ctx: &mut Context) -> Result<Outcome, WorkflowError> {
            Ok(Outcome::failure_with_reason(Data::new(), "Intentional failure"))
        }
    }

    #[tokio::test]
    async fn test_workflow_success() {
        let workflow = Workflow::builder()
            .add_step("success", SuccessStep)
            .build()
            .expect("valid workflow");

        let execution = workflow.execute(Context::new()).await.expect("executes");
        assert!(execution.outcome().is_success());
        assert_eq!(
            execution.organizer().context().await.get::<bool>("success"),
            Some(&true)
        );
    }

    #[tokio::test]
    async fn test_default_connection_stops_at_failure() {
        let workflow = Workflow::builder()
            .add_step("first", SuccessStep)
            .add_step("second", FailureStep)
            .add_step("third", SuccessStep)
            .build()
            .expect("valid workflow");

        assert_eq!(
            workflow.inspect(),
            "if steps[0] then if steps[1] then steps[2] end end"
        );

        let execution = workflow.execute(Context::new()).await.expect("executes");
        assert!(execution.outcome().is_failure());
        assert_eq!(execution.executed().await, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_large_default_connection() {
        let workflow = (0..2000)
            .fold(Workflow::builder(), |builder, i| {
                builder.add_step(format!("step{i}"), SuccessStep)
            })
            .build()
            .expect("valid workflow");

        let execution = workflow.execute(Context::new()).await.expect("executes");
        assert!(execution.outcome().is_success());
        let executed = execution.executed().await;
        assert_eq!(executed.len(), 2000);
        assert_eq!(executed.last(), Some(&1999));
    }

    #[tokio::test]
    async fn test_executions_are_independent() {
        let workflow = Workflow::builder()
            .add_step("success", SuccessStep)
            .build()
            .expect("valid workflow");

        let first = workflow.execute(Context::new()).await.expect("executes");
        let second = workflow.execute(Context::new()).await.expect("executes");

        assert!(!first.organizer().ptr_eq(second.organizer()));
        assert_eq!(first.connection(), second.connection());
        assert_eq!(second.executed().await, vec![0]);
        assert!(!workflow.definition().steps()[0].is_evaluated());
    }

    #[test]
    fn test_workflow_builder_validation() {
        let empty = Workflow::builder().build();
        assert!(matches!(empty, Err(WorkflowError::Configuration(_))));

        let duplicate = Workflow::builder()
            .add_step("step", SuccessStep)
            .add_step("step", FailureStep)
            .build();
        assert!(matches!(duplicate, Err(WorkflowError::Configuration(_))));

        let unknown = Workflow::builder()
            .add_step("step", SuccessStep)
            .connect(|definition| definition.scalar("missing"))
            .build();
        assert!(matches!(unknown, Err(WorkflowError::StepNotFound(_))));
    }

    #[test]
    fn test_foreign_steps_are_rejected() {
        let other = Organizer::new([StepDefinition::new("step", SuccessStep)], Context::new());
        let foreign = other.steps()[0].clone();

        let result = Workflow::builder()
            .add_step("step", SuccessStep)
            .connect(move |_| Ok(Expression::scalar(foreign)))
            .build();

        assert!(matches!(result, Err(WorkflowError::StepNotFound(name)) if name == "step"));
    }

    #[test]
    fn test_workflow_accessors() {
        let workflow = Workflow::builder()
            .add_step("a", SuccessStep)
            .add_configured("b", FailureStep, StepConfig::unbounded())
            .connect(|d| Ok(Expression::or(d.scalar("b")?, d.scalar("a")?)))
            .build()
            .expect("valid workflow");

        assert_eq!(workflow.step_count(), 2);
        let names: Vec<_> = workflow.step_names().map(StepName::as_str).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(workflow.inspect(), "steps[1] || steps[0]");
        assert_eq!(workflow.definition().steps()[1].name(), &"b");
        assert!(workflow.definition().owns(&workflow.connection().steps()[0]));
    }
}
