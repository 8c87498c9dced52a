//! Short-circuit evaluation.
//!
//! One routine implements `result`, the status predicates and
//! `each_evaluated_step`, so the steps a traversal reports are exactly the
//! steps an evaluation runs.

use super::{ComplexIf, Expression};
use crate::organizer::StepHandle;
use musubi_core::{Data, ExpressionError, Outcome, Status};
use tracing::debug;

/// What the caller needs from a node.
///
/// An empty node reports the kind it was asked for: a node whose status
/// decides a branch is asked for its status, a node whose outcome is handed
/// back is asked for its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Query {
    Result,
    Status,
}

impl Query {
    fn empty_error(self) -> ExpressionError {
        match self {
            Query::Result => ExpressionError::EmptyResult,
            Query::Status => ExpressionError::EmptyStatus,
        }
    }
}

pub(crate) type Observer<'a> = dyn FnMut(&StepHandle) + Send + 'a;

/// Work left in an enclosing node once a child's outcome is known.
enum Pending<'a> {
    Negate,
    OrRight(&'a Expression, Query),
    IfThen(&'a Expression, Query),
    /// The condition of branch `index` is being evaluated.
    Branch(&'a ComplexIf, usize, Query),
}

/// What to do after resuming a pending node.
enum Resume<'a> {
    Done(Outcome),
    Visit(&'a Expression, Query),
}

impl<'a> Pending<'a> {
    fn resume(self, outcome: Outcome, stack: &mut Vec<Pending<'a>>) -> Resume<'a> {
        match self {
            Pending::Negate => Resume::Done(outcome.negated()),
            Pending::OrRight(right, query) => match outcome.status() {
                Status::Success | Status::Error => Resume::Done(outcome),
                Status::Failure => Resume::Visit(right, query),
            },
            Pending::IfThen(then, query) => {
                if outcome.is_success() {
                    Resume::Visit(then, query)
                } else {
                    Resume::Done(outcome)
                }
            }
            Pending::Branch(chain, index, query) => match outcome.status() {
                Status::Success => match chain.branch(index) {
                    Some(branch) => Resume::Visit(branch.then(), query),
                    None => Resume::Done(outcome),
                },
                Status::Error => Resume::Done(outcome),
                Status::Failure => {
                    if let Some(next) = chain.branch(index + 1) {
                        stack.push(Pending::Branch(chain, index + 1, query));
                        return Resume::Visit(next.condition(), Query::Status);
                    }
                    match chain.else_branch() {
                        Some(otherwise) => Resume::Visit(otherwise, query),
                        None => {
                            debug!("No branch matched and no else; defaulting to success");
                            Resume::Done(match chain.organizer() {
                                Some(organizer) => organizer.success(Data::new()),
                                None => Outcome::success(Data::new()),
                            })
                        }
                    }
                }
            },
        }
    }
}

impl Expression {
    /// Evaluates the tree, calling `observer` for every step reached, in
    /// evaluation order, before its outcome is read.
    ///
    /// Nodes are walked with an explicit stack, so depth is bounded by memory
    /// rather than by the call stack.
    pub(crate) async fn evaluate(
        &self,
        query: Query,
        observer: &mut Observer<'_>,
    ) -> Result<Outcome, ExpressionError> {
        let mut stack: Vec<Pending<'_>> = Vec::new();
        let mut node = self;
        let mut query = query;

        loop {
            let mut outcome = match node {
                Expression::Empty => return Err(query.empty_error()),
                Expression::Scalar(scalar) => {
                    observer(scalar.step());
                    scalar.step().result().await
                }
                Expression::Not(not) => {
                    stack.push(Pending::Negate);
                    node = not.expression();
                    continue;
                }
                Expression::Or(or) => {
                    stack.push(Pending::OrRight(or.right(), query));
                    node = or.left();
                    query = Query::Status;
                    continue;
                }
                Expression::If(branch) => {
                    stack.push(Pending::IfThen(branch.then(), query));
                    node = branch.condition();
                    query = Query::Status;
                    continue;
                }
                Expression::ComplexIf(chain) => {
                    stack.push(Pending::Branch(chain, 0, query));
                    node = chain.if_branch().condition();
                    query = Query::Status;
                    continue;
                }
                Expression::Group(group) => {
                    node = group.expression();
                    continue;
                }
            };

            loop {
                let Some(pending) = stack.pop() else {
                    return Ok(outcome);
                };
                match pending.resume(outcome, &mut stack) {
                    Resume::Done(next) => outcome = next,
                    Resume::Visit(next, next_query) => {
                        node = next;
                        query = next_query;
                        break;
                    }
                }
            }
        }
    }

    /// The authoritative outcome of the tree.
    ///
    /// Steps run on demand, left to right, and only when their outcome can
    /// still change the decision. Repeated calls reuse memoized step
    /// outcomes.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError::EmptyResult`] or
    /// [`ExpressionError::EmptyStatus`] when evaluation reaches an empty
    /// node.
    pub async fn result(&self) -> Result<Outcome, ExpressionError> {
        self.evaluate(Query::Result, &mut |_: &StepHandle| {}).await
    }

    /// Status of the tree's outcome.
    pub async fn status(&self) -> Result<Status, ExpressionError> {
        Ok(self
            .evaluate(Query::Status, &mut |_: &StepHandle| {})
            .await?
            .status())
    }

    /// Returns `true` if the tree's outcome is a success.
    pub async fn is_success(&self) -> Result<bool, ExpressionError> {
        Ok(self.status().await? == Status::Success)
    }

    /// Returns `true` if the tree's outcome is a failure.
    pub async fn is_failure(&self) -> Result<bool, ExpressionError> {
        Ok(self.status().await? == Status::Failure)
    }

    /// Returns `true` if the tree's outcome is an error.
    pub async fn is_error(&self) -> Result<bool, ExpressionError> {
        Ok(self.status().await? == Status::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::Conditional;
    use super::*;
    use serde_json::json;

    fn data(value: serde_json::Value) -> Data {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Data::new(),
        }
    }

    async fn executed(organizer: &crate::Organizer) -> Vec<usize> {
        organizer.context().await.executed()
    }

    #[tokio::test]
    async fn test_scalar_mirrors_step() {
        let organizer = organizer(&[failure()]);
        let scalar = Expression::scalar(organizer.steps()[0].clone());

        assert_eq!(scalar.result().await, Ok(failure()));
        assert_eq!(scalar.is_failure().await, Ok(true));
        assert_eq!(scalar.is_success().await, Ok(false));
        assert_eq!(scalar.is_error().await, Ok(false));
        assert_eq!(executed(&organizer).await, vec![0]);
    }

    #[tokio::test]
    async fn test_not_swaps_success_and_failure() {
        let organizer = organizer(&[failure(), error()]);
        let negated = Expression::not(Expression::scalar(organizer.steps()[0].clone()));

        assert_eq!(negated.is_success().await, Ok(true));
        assert_eq!(negated.is_failure().await, Ok(false));
        assert_eq!(negated.is_error().await, Ok(false));
        assert_eq!(negated.result().await, Ok(success()));

        let negated = Expression::not(Expression::scalar(organizer.steps()[1].clone()));
        assert_eq!(negated.is_error().await, Ok(true));
        assert_eq!(negated.result().await, Ok(error()));
    }

    #[tokio::test]
    async fn test_or_short_circuits_on_success() {
        let left = Outcome::success(data(json!({"a": 1})));
        let right = Outcome::success(data(json!({"a": 2})));
        let organizer = organizer(&[left.clone(), right]);
        let or = Expression::or(
            Expression::scalar(organizer.steps()[0].clone()),
            Expression::scalar(organizer.steps()[1].clone()),
        );

        assert_eq!(or.result().await, Ok(left));
        assert!(!organizer.steps()[1].is_evaluated());
        assert_eq!(executed(&organizer).await, vec![0]);
    }

    #[tokio::test]
    async fn test_or_falls_through_on_failure() {
        let right = Outcome::success(data(json!({"a": 2})));
        let organizer = organizer(&[failure(), right.clone()]);
        let or = Expression::or(
            Expression::scalar(organizer.steps()[0].clone()),
            Expression::scalar(organizer.steps()[1].clone()),
        );

        assert_eq!(or.result().await, Ok(right));
        assert_eq!(executed(&organizer).await, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_or_short_circuits_on_error() {
        let organizer = organizer(&[error(), success()]);
        let or = Expression::or(
            Expression::scalar(organizer.steps()[0].clone()),
            Expression::scalar(organizer.steps()[1].clone()),
        );

        assert_eq!(or.result().await, Ok(error()));
        assert_eq!(or.is_error().await, Ok(true));
        assert_eq!(executed(&organizer).await, vec![0]);
    }

    #[tokio::test]
    async fn test_if_skips_then_unless_condition_succeeds() {
        let organizer = organizer(&[failure(), success(), error()]);
        let s = |i: usize| Expression::scalar(organizer.steps()[i].clone());

        assert_eq!(Expression::if_then(s(0), s(1)).result().await, Ok(failure()));
        assert_eq!(Expression::if_then(s(2), s(1)).result().await, Ok(error()));
        assert_eq!(executed(&organizer).await, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_if_returns_then_on_success() {
        let then = Outcome::success(data(json!({"x": 1})));
        let organizer = organizer(&[success(), then.clone()]);
        let conditional = Expression::if_then(
            Expression::scalar(organizer.steps()[0].clone()),
            Expression::scalar(organizer.steps()[1].clone()),
        );

        assert_eq!(conditional.result().await, Ok(then));
    }

    #[tokio::test]
    async fn test_complex_if_stops_at_error_condition() {
        let organizer = organizer(&[failure(), success(), error(), success(), success(), success()]);
        let s = |i: usize| Expression::scalar(organizer.steps()[i].clone());

        let chain = Expression::complex_if(
            Conditional::new(s(0), s(1)),
            vec![Conditional::new(s(2), s(3)), Conditional::new(s(4), s(5))],
            None,
        );

        assert_eq!(chain.result().await, Ok(error()));
        assert_eq!(executed(&organizer).await, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_complex_if_takes_first_successful_branch() {
        let chosen = Outcome::success(data(json!({"branch": "elsif"})));
        let organizer = organizer(&[failure(), success(), success(), chosen.clone(), success()]);
        let s = |i: usize| Expression::scalar(organizer.steps()[i].clone());

        let chain = Expression::complex_if(
            Conditional::new(s(0), s(1)),
            vec![Conditional::new(s(2), s(3))],
            Some(s(4)),
        );

        assert_eq!(chain.result().await, Ok(chosen));
        assert_eq!(executed(&organizer).await, vec![0, 2, 3]);
    }

    #[tokio::test]
    async fn test_complex_if_uses_else_when_nothing_matches() {
        let organizer = organizer(&[failure(), success(), failure()]);
        let s = |i: usize| Expression::scalar(organizer.steps()[i].clone());

        let chain = Expression::complex_if(
            Conditional::new(s(0), s(1)),
            vec![],
            Some(Expression::group(s(2))),
        );

        assert_eq!(chain.result().await, Ok(failure()));
        assert_eq!(executed(&organizer).await, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_complex_if_defaults_to_success_without_else() {
        let organizer = organizer(&[failure(), success(), failure(), success()]);
        let s = |i: usize| Expression::scalar(organizer.steps()[i].clone());

        let chain = Expression::complex_if(
            Conditional::new(s(0), s(1)),
            vec![Conditional::new(s(2), s(3))],
            None,
        )
        .with_organizer(&organizer)
        .expect("rebinding");

        assert_eq!(chain.result().await, Ok(organizer.success(Data::new())));
        assert_eq!(executed(&organizer).await, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_complex_if_empty_else_is_not_absent_else() {
        let organizer = organizer(&[failure(), success()]);
        let s = |i: usize| Expression::scalar(organizer.steps()[i].clone());

        let chain = Expression::complex_if(
            Conditional::new(s(0), s(1)),
            vec![],
            Some(Expression::empty()),
        )
        .with_organizer(&organizer)
        .expect("rebinding");

        assert_eq!(chain.result().await, Err(ExpressionError::EmptyResult));
        assert_eq!(chain.is_success().await, Err(ExpressionError::EmptyStatus));
        assert_eq!(executed(&organizer).await, vec![0]);
    }

    #[tokio::test]
    async fn test_group_is_transparent() {
        let organizer = organizer(&[error()]);
        let group = Expression::group(Expression::scalar(organizer.steps()[0].clone()));

        assert_eq!(group.result().await, Ok(error()));
        assert_eq!(group.status().await, Ok(Status::Error));
    }

    #[tokio::test]
    async fn test_empty_has_no_result_or_status() {
        let empty = Expression::empty();

        assert_eq!(empty.result().await, Err(ExpressionError::EmptyResult));
        assert_eq!(empty.is_success().await, Err(ExpressionError::EmptyStatus));
        assert_eq!(empty.is_failure().await, Err(ExpressionError::EmptyStatus));
        assert_eq!(empty.is_error().await, Err(ExpressionError::EmptyStatus));
    }

    #[tokio::test]
    async fn test_empty_in_branch_position_reports_status() {
        let organizer = organizer(&[failure()]);
        let s = Expression::scalar(organizer.steps()[0].clone());

        let or = Expression::or(Expression::empty(), s.clone());
        assert_eq!(or.result().await, Err(ExpressionError::EmptyStatus));

        let or = Expression::or(s.clone(), Expression::empty());
        assert_eq!(or.result().await, Err(ExpressionError::EmptyResult));

        let negated = Expression::not(Expression::empty());
        assert_eq!(negated.result().await, Err(ExpressionError::EmptyResult));
        assert_eq!(negated.is_success().await, Err(ExpressionError::EmptyStatus));
    }

    #[tokio::test]
    async fn test_result_is_idempotent() {
        let organizer = organizer(&[failure(), success()]);
        let or = Expression::or(
            Expression::scalar(organizer.steps()[0].clone()),
            Expression::scalar(organizer.steps()[1].clone()),
        );

        let first = or.result().await;
        let second = or.result().await;
        assert_eq!(first, second);
        assert_eq!(executed(&organizer).await, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_deep_sequence_evaluates_without_recursion() {
        let organizer = organizer(&vec![success(); 2000]);
        let chain = Expression::sequence(organizer.steps().iter().cloned());

        assert_eq!(chain.result().await, Ok(success()));
        assert_eq!(executed(&organizer).await.len(), 2000);

        let reached = chain.evaluated_steps().await.expect("evaluable tree");
        assert_eq!(reached.len(), 2000);
        assert_eq!(reached.last().map(StepHandle::index), Some(1999));
    }
}
