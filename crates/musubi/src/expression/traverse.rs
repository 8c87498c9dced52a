//! Structural and evaluation-order traversal.

use super::eval::Query;
use super::Expression;
use crate::organizer::StepHandle;
use musubi_core::ExpressionError;

impl Expression {
    /// Visits every step of the tree once, depth first and left to right,
    /// without evaluating anything.
    pub fn each_step<F>(&self, mut visit: F) -> &Self
    where
        F: FnMut(&StepHandle),
    {
        self.walk(&mut visit);
        self
    }

    fn walk(&self, visit: &mut dyn FnMut(&StepHandle)) {
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            match node {
                Expression::Empty => {}
                Expression::Scalar(scalar) => visit(scalar.step()),
                Expression::Not(not) => pending.push(not.expression()),
                Expression::Or(or) => pending.extend([or.right(), or.left()]),
                Expression::If(branch) => pending.extend([branch.then(), branch.condition()]),
                Expression::ComplexIf(chain) => {
                    let start = pending.len();
                    for branch in chain.branches() {
                        pending.extend([branch.condition(), branch.then()]);
                    }
                    pending.extend(chain.else_branch());
                    // popped last-in first, so reverse to keep construction order
                    pending[start..].reverse();
                }
                Expression::Group(group) => pending.push(group.expression()),
            }
        }
    }

    /// Every step of the tree, in [`Expression::each_step`] order.
    pub fn steps(&self) -> Vec<StepHandle> {
        let mut steps = Vec::new();
        self.each_step(|step| steps.push(step.clone()));
        steps
    }

    /// Evaluates the tree like [`Expression::result`], calling `visit` for
    /// each step as evaluation reaches it.
    ///
    /// # Errors
    ///
    /// Fails like [`Expression::result`]; steps reached before the failure
    /// have already been visited.
    pub async fn each_evaluated_step<F>(&self, mut visit: F) -> Result<&Self, ExpressionError>
    where
        F: FnMut(&StepHandle) + Send,
    {
        self.evaluate(Query::Result, &mut visit).await?;
        Ok(self)
    }

    /// The steps [`Expression::each_evaluated_step`] reaches, in order.
    pub async fn evaluated_steps(&self) -> Result<Vec<StepHandle>, ExpressionError> {
        let mut steps = Vec::new();
        self.each_evaluated_step(|step| steps.push(step.clone()))
            .await?;
        Ok(steps)
    }
}
