//! Step-connection expressions.
//!
//! An [`Expression`] is an immutable tree describing how the outcomes of a
//! workflow's steps combine into a single decision. Leaves reference
//! [`StepHandle`]s; inner nodes negate, disjoin, branch and group.
//!
//! A tree is built once against a definition [`Organizer`] and rebound with
//! [`Expression::with_organizer`] to each execution's organizer before it is
//! evaluated. Evaluation short-circuits: a step whose outcome cannot change
//! the decision never runs.
//!
//! # Examples
//!
//! ```
//! use musubi::prelude::*;
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! struct Fixed(Outcome);
//!
//! #[async_trait]
//! impl Step for Fixed {
//!     async fn call(&self, _ctx: &mut Context) -> Result<Outcome, WorkflowError> {
//!         Ok(self.0.clone())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), WorkflowError> {
//! let organizer = Organizer::new(
//!     [
//!         StepDefinition::new("cached", Fixed(Outcome::failure(Data::new()))),
//!         StepDefinition::new("fetch", Fixed(Outcome::success(Data::new()))),
//!     ],
//!     Context::new(),
//! );
//!
//! let lookup = Expression::or(organizer.scalar("cached")?, organizer.scalar("fetch")?);
//! assert_eq!(lookup.inspect(), "steps[0] || steps[1]");
//! assert!(lookup.is_success().await?);
//! # Ok(())
//! # }
//! ```

mod arguments;
mod eval;
mod inspect;
mod traverse;

pub use arguments::{Argument, HasArguments};
pub use inspect::Comparison;

use crate::organizer::{Organizer, StepHandle};
use std::fmt;
use std::sync::Arc;

/// Variant tag of an [`Expression`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    Empty,
    Scalar,
    Not,
    Or,
    If,
    ComplexIf,
    Group,
}

impl ExpressionKind {
    /// Returns the kind as a snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpressionKind::Empty => "empty",
            ExpressionKind::Scalar => "scalar",
            ExpressionKind::Not => "not",
            ExpressionKind::Or => "or",
            ExpressionKind::If => "if",
            ExpressionKind::ComplexIf => "complex_if",
            ExpressionKind::Group => "group",
        }
    }
}

impl fmt::Display for ExpressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leaf delegating to a step's outcome.
#[derive(Debug, Clone)]
pub struct Scalar {
    step: StepHandle,
}

impl Scalar {
    /// Returns the referenced step.
    pub fn step(&self) -> &StepHandle {
        &self.step
    }
}

/// Negation of a sub-expression.
#[derive(Debug, Clone)]
pub struct Not {
    expression: Arc<Expression>,
}

impl Not {
    /// Returns the negated sub-expression.
    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

/// Left-to-right disjunction.
#[derive(Debug, Clone)]
pub struct Or {
    left: Arc<Expression>,
    right: Arc<Expression>,
}

impl Or {
    /// Returns the left operand, evaluated first.
    pub fn left(&self) -> &Expression {
        &self.left
    }

    /// Returns the right operand.
    pub fn right(&self) -> &Expression {
        &self.right
    }
}

/// A single `if <condition> then <then>` branch.
#[derive(Debug, Clone)]
pub struct Conditional {
    condition: Arc<Expression>,
    then: Arc<Expression>,
}

impl Conditional {
    /// Creates a new branch.
    pub fn new(condition: Expression, then: Expression) -> Self {
        Self {
            condition: Arc::new(condition),
            then: Arc::new(then),
        }
    }

    /// Returns the condition.
    pub fn condition(&self) -> &Expression {
        &self.condition
    }

    /// Returns the expression taken when the condition succeeds.
    pub fn then(&self) -> &Expression {
        &self.then
    }
}

/// `if` / `elsif`* / `else`? chain.
///
/// The organizer is set by rebinding and supplies the outcome used when no
/// branch matches and there is no `else`.
#[derive(Debug, Clone)]
pub struct ComplexIf {
    if_branch: Conditional,
    elsif_branches: Vec<Conditional>,
    else_branch: Option<Arc<Expression>>,
    organizer: Option<Organizer>,
}

impl ComplexIf {
    /// Returns the leading `if` branch.
    pub fn if_branch(&self) -> &Conditional {
        &self.if_branch
    }

    /// Returns the `elsif` branches, in order.
    pub fn elsif_branches(&self) -> &[Conditional] {
        &self.elsif_branches
    }

    /// Returns the `else` expression, if any.
    pub fn else_branch(&self) -> Option<&Expression> {
        self.else_branch.as_deref()
    }

    /// Returns the organizer the chain was rebound to, if any.
    pub fn organizer(&self) -> Option<&Organizer> {
        self.organizer.as_ref()
    }

    /// The `if` branch followed by every `elsif`, in evaluation order.
    pub fn branches(&self) -> impl Iterator<Item = &Conditional> {
        std::iter::once(&self.if_branch).chain(self.elsif_branches.iter())
    }

    /// Branch at `index` in [`ComplexIf::branches`] order.
    fn branch(&self, index: usize) -> Option<&Conditional> {
        match index {
            0 => Some(&self.if_branch),
            _ => self.elsif_branches.get(index - 1),
        }
    }
}

/// Transparent wrapper kept for precedence and printing.
#[derive(Debug, Clone)]
pub struct Group {
    expression: Arc<Expression>,
}

impl Group {
    /// Returns the wrapped expression.
    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

/// A node of the step-connection tree.
///
/// Children are shared, so cloning a tree of any depth is cheap.
#[derive(Debug, Clone, Default)]
pub enum Expression {
    /// Placeholder with no steps and no status.
    #[default]
    Empty,
    Scalar(Scalar),
    Not(Not),
    Or(Or),
    If(Conditional),
    ComplexIf(ComplexIf),
    Group(Group),
}

impl Expression {
    /// Creates an empty expression.
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Creates a leaf mirroring `step`.
    pub fn scalar(step: StepHandle) -> Self {
        Self::Scalar(Scalar { step })
    }

    /// Creates a negation.
    pub fn not(expression: Expression) -> Self {
        Self::Not(Not {
            expression: Arc::new(expression),
        })
    }

    /// Creates a left-to-right disjunction.
    pub fn or(left: Expression, right: Expression) -> Self {
        Self::Or(Or {
            left: Arc::new(left),
            right: Arc::new(right),
        })
    }

    /// Creates a single-branch conditional.
    pub fn if_then(condition: Expression, then: Expression) -> Self {
        Self::If(Conditional::new(condition, then))
    }

    /// Multi-branch conditional. The chain is unbound until
    /// [`Expression::with_organizer`] is applied.
    pub fn complex_if(
        if_branch: Conditional,
        elsif_branches: Vec<Conditional>,
        else_branch: Option<Expression>,
    ) -> Self {
        Self::ComplexIf(ComplexIf {
            if_branch,
            elsif_branches,
            else_branch: else_branch.map(Arc::new),
            organizer: None,
        })
    }

    /// Creates a group around `expression`.
    pub fn group(expression: Expression) -> Self {
        Self::Group(Group {
            expression: Arc::new(expression),
        })
    }

    /// Runs each step only while the previous one succeeded:
    /// `if s0 then if s1 then s2 end end`. No steps give [`Expression::Empty`].
    pub fn sequence(steps: impl IntoIterator<Item = StepHandle>) -> Self {
        let steps: Vec<_> = steps.into_iter().collect();
        steps
            .into_iter()
            .rev()
            .map(Expression::scalar)
            .reduce(|then, condition| Expression::if_then(condition, then))
            .unwrap_or_default()
    }

    /// Returns the variant tag.
    pub fn kind(&self) -> ExpressionKind {
        match self {
            Expression::Empty => ExpressionKind::Empty,
            Expression::Scalar(_) => ExpressionKind::Scalar,
            Expression::Not(_) => ExpressionKind::Not,
            Expression::Or(_) => ExpressionKind::Or,
            Expression::If(_) => ExpressionKind::If,
            Expression::ComplexIf(_) => ExpressionKind::ComplexIf,
            Expression::Group(_) => ExpressionKind::Group,
        }
    }

    /// Returns `true` for [`Expression::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Expression::Empty)
    }

    /// Returns `true` for a scalar leaf.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Expression::Scalar(_))
    }

    /// Returns `true` for a negation.
    pub fn is_not(&self) -> bool {
        matches!(self, Expression::Not(_))
    }

    /// Returns `true` for a disjunction.
    pub fn is_or(&self) -> bool {
        matches!(self, Expression::Or(_))
    }

    /// Returns `true` for a single-branch conditional.
    pub fn is_if(&self) -> bool {
        matches!(self, Expression::If(_))
    }

    /// Returns `true` for an `if`/`elsif`/`else` chain.
    pub fn is_complex_if(&self) -> bool {
        matches!(self, Expression::ComplexIf(_))
    }

    /// Returns `true` for a group.
    pub fn is_group(&self) -> bool {
        matches!(self, Expression::Group(_))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::organizer::{Organizer, StepDefinition};
    use async_trait::async_trait;
    use musubi_core::{Context, Data, Outcome, Step, WorkflowError};

    #[derive(Debug)]
    pub(crate) struct Fixed(pub(crate) Outcome);

    #[async_trait]
    impl Step for Fixed {
        async fn call(&self, _ctx: &mut Context) -> Result<Outcome, WorkflowError> {
            Ok(self.0.clone())
        }
    }

    pub(crate) fn definitions(outcomes: &[Outcome]) -> Vec<StepDefinition> {
        outcomes
            .iter()
            .enumerate()
            .map(|(i, outcome)| StepDefinition::new(format!("s{i}"), Fixed(outcome.clone())))
            .collect()
    }

    pub(crate) fn organizer(outcomes: &[Outcome]) -> Organizer {
        Organizer::new(definitions(outcomes), Context::new())
    }

    pub(crate) fn success() -> Outcome {
        Outcome::success(Data::new())
    }

    pub(crate) fn failure() -> Outcome {
        Outcome::failure(Data::new())
    }

    pub(crate) fn error() -> Outcome {
        Outcome::error("boom")
    }
}
