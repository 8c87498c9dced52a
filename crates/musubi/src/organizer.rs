//! Workflow instances and the steps bound to them.

use crate::expression::Expression;
use musubi_core::{Context, Data, Outcome, Step, StepConfig, StepName, WorkflowError};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// A step as declared in a workflow: name, body and configuration.
///
/// Definitions are shared by every organizer created from the same workflow.
#[derive(Clone)]
pub struct StepDefinition {
    name: StepName,
    body: Arc<dyn Step>,
    config: StepConfig,
}

impl StepDefinition {
    /// Creates a definition using the step's own configuration.
    pub fn new<S: Step + 'static>(name: impl Into<StepName>, step: S) -> Self {
        let config = step.config();
        Self::with_config(name, step, config)
    }

    /// Creates a definition with an explicit configuration.
    pub fn with_config<S: Step + 'static>(
        name: impl Into<StepName>,
        step: S,
        config: StepConfig,
    ) -> Self {
        Self {
            name: name.into(),
            body: Arc::new(step),
            config,
        }
    }

    /// Name the step is registered under.
    pub fn name(&self) -> &StepName {
        &self.name
    }

    /// Timeout settings for the step.
    pub fn config(&self) -> &StepConfig {
        &self.config
    }
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("name", &self.name)
            .field("body", &self.body)
            .field("config", &self.config)
            .finish()
    }
}

struct BoundStep {
    index: usize,
    definition: StepDefinition,
    context: Arc<Mutex<Context>>,
    outcome: OnceCell<Outcome>,
}

impl BoundStep {
    async fn run(&self) -> Outcome {
        let name = &self.definition.name;
        let mut ctx = self.context.lock().await;
        ctx.record_execution(self.index, name.clone());
        debug!("Running step '{}' (index {})", name, self.index);

        let call = self.definition.body.call(&mut ctx);
        let result = match self.definition.config.timeout {
            Some(limit) => match timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(WorkflowError::Timeout {
                    step_name: name.clone(),
                }),
            },
            None => call.await,
        };

        match result {
            Ok(outcome) => {
                info!("Step '{}' finished with {}", name, outcome.status());
                outcome
            }
            Err(e) => {
                warn!("Step '{}' raised an error: {}", name, e);
                Outcome::error(e.to_string())
            }
        }
    }
}

/// A step bound to one [`Organizer`].
///
/// The body runs on the first call to [`StepHandle::result`]; the outcome is
/// memoized, so every later query is a read.
///
/// Two handles compare equal when they stand for the same declared step
/// (same position and name), whichever organizer they are bound to. Use
/// [`StepHandle::ptr_eq`] to compare bindings.
#[derive(Clone)]
pub struct StepHandle {
    inner: Arc<BoundStep>,
}

impl StepHandle {
    /// Ordinal position of the step in its organizer.
    pub fn index(&self) -> usize {
        self.inner.index
    }

    /// Name of the underlying definition.
    pub fn name(&self) -> &StepName {
        &self.inner.definition.name
    }

    /// Returns the step outcome, running the body if it has not run yet.
    pub async fn result(&self) -> Outcome {
        self.inner
            .outcome
            .get_or_init(|| self.inner.run())
            .await
            .clone()
    }

    /// Runs the step if needed and reports success.
    pub async fn is_success(&self) -> bool {
        self.result().await.is_success()
    }

    /// Runs the step if needed and reports failure.
    pub async fn is_failure(&self) -> bool {
        self.result().await.is_failure()
    }

    /// Runs the step if needed and reports an error.
    pub async fn is_error(&self) -> bool {
        self.result().await.is_error()
    }

    /// The memoized outcome, without running anything.
    pub fn peek(&self) -> Option<&Outcome> {
        self.inner.outcome.get()
    }

    /// Returns `true` once the step has run.
    pub fn is_evaluated(&self) -> bool {
        self.inner.outcome.initialized()
    }

    /// Returns `true` if both handles share the same binding.
    pub fn ptr_eq(&self, other: &StepHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for StepHandle {
    fn eq(&self, other: &Self) -> bool {
        self.index() == other.index() && self.name() == other.name()
    }
}

impl Eq for StepHandle {}

impl fmt::Debug for StepHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepHandle")
            .field("index", &self.index())
            .field("name", self.name())
            .field("outcome", &self.peek())
            .finish()
    }
}

struct OrganizerInner {
    steps: Vec<StepHandle>,
    context: Arc<Mutex<Context>>,
}

/// One workflow instance: an ordered collection of bound steps sharing a
/// [`Context`].
///
/// Cloning is cheap and yields a handle to the same instance.
#[derive(Clone)]
pub struct Organizer {
    inner: Arc<OrganizerInner>,
}

impl Organizer {
    /// Binds fresh, not yet evaluated steps to a new instance.
    pub fn new(definitions: impl IntoIterator<Item = StepDefinition>, context: Context) -> Self {
        let context = Arc::new(Mutex::new(context));
        let steps = definitions
            .into_iter()
            .enumerate()
            .map(|(index, definition)| StepHandle {
                inner: Arc::new(BoundStep {
                    index,
                    definition,
                    context: Arc::clone(&context),
                    outcome: OnceCell::new(),
                }),
            })
            .collect();

        Self {
            inner: Arc::new(OrganizerInner { steps, context }),
        }
    }

    /// Bound steps in definition order.
    pub fn steps(&self) -> &[StepHandle] {
        &self.inner.steps
    }

    /// Step at `index`, if any.
    pub fn step(&self, index: usize) -> Option<&StepHandle> {
        self.inner.steps.get(index)
    }

    /// First step called `name`.
    pub fn find(&self, name: &str) -> Option<&StepHandle> {
        self.inner.steps.iter().find(|step| step.name() == &name)
    }

    /// Returns `true` if `step` is bound to this instance.
    pub fn owns(&self, step: &StepHandle) -> bool {
        self.step(step.index()).is_some_and(|own| own.ptr_eq(step))
    }

    /// Scalar expression over the step called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::StepNotFound`] if no step has that name.
    pub fn scalar(&self, name: &str) -> Result<Expression, WorkflowError> {
        self.find(name)
            .cloned()
            .map(Expression::scalar)
            .ok_or_else(|| WorkflowError::StepNotFound(StepName::new(name)))
    }

    /// The default successful outcome of this instance.
    pub fn success(&self, data: Data) -> Outcome {
        Outcome::success(data)
    }

    /// Locks the shared context.
    ///
    /// Do not hold the guard across an evaluation: step bodies need it.
    pub async fn context(&self) -> MutexGuard<'_, Context> {
        self.inner.context.lock().await
    }

    /// Returns `true` if both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Organizer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Organizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Organizer")
            .field(
                "steps",
                &self.steps().iter().map(StepHandle::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
