//! Constructor arguments and generic reconstruction.
//!
//! Every node exposes the arguments it was built from. Rebinding and
//! structural copies rebuild a node from (possibly replaced) arguments
//! through [`HasArguments::from_arguments`], so no variant carries its own
//! copy or rebinding code.

use super::{ComplexIf, Conditional, Expression, ExpressionKind, Group, Not, Or, Scalar};
use crate::organizer::{Organizer, StepHandle};
use musubi_core::ExpressionError;
use std::sync::Arc;

/// One constructor argument of an expression node.
#[derive(Debug, Clone)]
pub enum Argument {
    Step(StepHandle),
    Node(Expression),
    Nodes(Vec<Expression>),
    Optional(Option<Expression>),
    Organizer(Option<Organizer>),
}

/// An argument waiting for its nodes to be rebound.
enum Pending {
    Ready(Argument),
    Node,
    Nodes(usize),
    Optional(bool),
}

impl Pending {
    /// Splits `argument` into its shape and the nodes it holds. Steps and
    /// organizers are rebound on the spot.
    fn split(
        argument: Argument,
        organizer: &Organizer,
        nodes: &mut Vec<Expression>,
    ) -> Result<Pending, ExpressionError> {
        Ok(match argument {
            Argument::Step(step) => {
                let bound = organizer.step(step.index()).cloned().ok_or_else(|| {
                    ExpressionError::StepNotBound {
                        index: step.index(),
                        name: step.name().clone(),
                    }
                })?;
                Pending::Ready(Argument::Step(bound))
            }
            Argument::Node(node) => {
                nodes.push(node);
                Pending::Node
            }
            Argument::Nodes(list) => {
                let count = list.len();
                nodes.extend(list);
                Pending::Nodes(count)
            }
            Argument::Optional(Some(node)) => {
                nodes.push(node);
                Pending::Optional(true)
            }
            Argument::Optional(None) => Pending::Optional(false),
            Argument::Organizer(_) => Pending::Ready(Argument::Organizer(Some(organizer.clone()))),
        })
    }

    fn node_count(&self) -> usize {
        match self {
            Pending::Ready(_) | Pending::Optional(false) => 0,
            Pending::Node | Pending::Optional(true) => 1,
            Pending::Nodes(count) => *count,
        }
    }

    fn fill(self, bound: &mut impl Iterator<Item = Expression>) -> Option<Argument> {
        Some(match self {
            Pending::Ready(argument) => argument,
            Pending::Node => Argument::Node(bound.next()?),
            Pending::Nodes(count) => {
                let nodes: Vec<_> = bound.take(count).collect();
                if nodes.len() != count {
                    return None;
                }
                Argument::Nodes(nodes)
            }
            Pending::Optional(true) => Argument::Optional(Some(bound.next()?)),
            Pending::Optional(false) => Argument::Optional(None),
        })
    }
}

enum BindTask {
    Bind(Expression),
    Assemble(ExpressionKind, Vec<Pending>),
}

/// Access to a node's constructor arguments, in constructor order.
pub trait HasArguments: Sized + Clone {
    fn into_arguments(self) -> Vec<Argument>;

    /// Rebuilds the node, checking every argument's shape.
    fn from_arguments(arguments: Vec<Argument>) -> Result<Self, ExpressionError>;

    fn arguments(&self) -> Vec<Argument> {
        self.clone().into_arguments()
    }
}

struct ArgumentReader {
    kind: ExpressionKind,
    arguments: std::vec::IntoIter<Argument>,
    position: usize,
}

impl ArgumentReader {
    fn new(kind: ExpressionKind, arguments: Vec<Argument>) -> Self {
        Self {
            kind,
            arguments: arguments.into_iter(),
            position: 0,
        }
    }

    fn mismatch(&self, position: usize) -> ExpressionError {
        ExpressionError::ArgumentMismatch {
            kind: self.kind.as_str(),
            position,
        }
    }

    fn read(&mut self) -> Result<(usize, Argument), ExpressionError> {
        let position = self.position;
        self.position += 1;
        let argument = self
            .arguments
            .next()
            .ok_or_else(|| self.mismatch(position))?;
        Ok((position, argument))
    }

    fn step(&mut self) -> Result<StepHandle, ExpressionError> {
        match self.read()? {
            (_, Argument::Step(step)) => Ok(step),
            (position, _) => Err(self.mismatch(position)),
        }
    }

    fn node(&mut self) -> Result<Arc<Expression>, ExpressionError> {
        match self.read()? {
            (_, Argument::Node(node)) => Ok(Arc::new(node)),
            (position, _) => Err(self.mismatch(position)),
        }
    }

    fn branch(&mut self) -> Result<Conditional, ExpressionError> {
        match self.read()? {
            (_, Argument::Node(Expression::If(branch))) => Ok(branch),
            (position, _) => Err(self.mismatch(position)),
        }
    }

    fn branches(&mut self) -> Result<Vec<Conditional>, ExpressionError> {
        let (position, argument) = self.read()?;
        let Argument::Nodes(nodes) = argument else {
            return Err(self.mismatch(position));
        };
        nodes
            .into_iter()
            .map(|node| match node {
                Expression::If(branch) => Ok(branch),
                _ => Err(self.mismatch(position)),
            })
            .collect()
    }

    fn optional(&mut self) -> Result<Option<Arc<Expression>>, ExpressionError> {
        match self.read()? {
            (_, Argument::Optional(node)) => Ok(node.map(Arc::new)),
            (position, _) => Err(self.mismatch(position)),
        }
    }

    fn organizer(&mut self) -> Result<Option<Organizer>, ExpressionError> {
        match self.read()? {
            (_, Argument::Organizer(organizer)) => Ok(organizer),
            (position, _) => Err(self.mismatch(position)),
        }
    }

    fn finish<T>(mut self, node: T) -> Result<T, ExpressionError> {
        match self.arguments.next() {
            Some(_) => Err(self.mismatch(self.position)),
            None => Ok(node),
        }
    }
}

impl HasArguments for Scalar {
    fn into_arguments(self) -> Vec<Argument> {
        vec![Argument::Step(self.step)]
    }

    fn from_arguments(arguments: Vec<Argument>) -> Result<Self, ExpressionError> {
        let mut reader = ArgumentReader::new(ExpressionKind::Scalar, arguments);
        let step = reader.step()?;
        reader.finish(Scalar { step })
    }
}

impl HasArguments for Not {
    fn into_arguments(self) -> Vec<Argument> {
        vec![Argument::Node(Expression::clone(&self.expression))]
    }

    fn from_arguments(arguments: Vec<Argument>) -> Result<Self, ExpressionError> {
        let mut reader = ArgumentReader::new(ExpressionKind::Not, arguments);
        let expression = reader.node()?;
        reader.finish(Not { expression })
    }
}

impl HasArguments for Or {
    fn into_arguments(self) -> Vec<Argument> {
        vec![
            Argument::Node(Expression::clone(&self.left)),
            Argument::Node(Expression::clone(&self.right)),
        ]
    }

    fn from_arguments(arguments: Vec<Argument>) -> Result<Self, ExpressionError> {
        let mut reader = ArgumentReader::new(ExpressionKind::Or, arguments);
        let left = reader.node()?;
        let right = reader.node()?;
        reader.finish(Or { left, right })
    }
}

impl HasArguments for Conditional {
    fn into_arguments(self) -> Vec<Argument> {
        vec![
            Argument::Node(Expression::clone(&self.condition)),
            Argument::Node(Expression::clone(&self.then)),
        ]
    }

    fn from_arguments(arguments: Vec<Argument>) -> Result<Self, ExpressionError> {
        let mut reader = ArgumentReader::new(ExpressionKind::If, arguments);
        let condition = reader.node()?;
        let then = reader.node()?;
        reader.finish(Conditional { condition, then })
    }
}

impl HasArguments for ComplexIf {
    fn into_arguments(self) -> Vec<Argument> {
        vec![
            Argument::Node(Expression::If(self.if_branch)),
            Argument::Nodes(
                self.elsif_branches
                    .into_iter()
                    .map(Expression::If)
                    .collect(),
            ),
            Argument::Optional(self.else_branch.map(|node| Expression::clone(&node))),
            Argument::Organizer(self.organizer),
        ]
    }

    fn from_arguments(arguments: Vec<Argument>) -> Result<Self, ExpressionError> {
        let mut reader = ArgumentReader::new(ExpressionKind::ComplexIf, arguments);
        let if_branch = reader.branch()?;
        let elsif_branches = reader.branches()?;
        let else_branch = reader.optional()?;
        let organizer = reader.organizer()?;
        reader.finish(ComplexIf {
            if_branch,
            elsif_branches,
            else_branch,
            organizer,
        })
    }
}

impl HasArguments for Group {
    fn into_arguments(self) -> Vec<Argument> {
        vec![Argument::Node(Expression::clone(&self.expression))]
    }

    fn from_arguments(arguments: Vec<Argument>) -> Result<Self, ExpressionError> {
        let mut reader = ArgumentReader::new(ExpressionKind::Group, arguments);
        let expression = reader.node()?;
        reader.finish(Group { expression })
    }
}

impl ExpressionKind {
    /// Builds a node of this kind from its constructor arguments.
    pub fn build(self, arguments: Vec<Argument>) -> Result<Expression, ExpressionError> {
        Ok(match self {
            ExpressionKind::Empty => {
                ArgumentReader::new(self, arguments).finish(Expression::Empty)?
            }
            ExpressionKind::Scalar => Expression::Scalar(Scalar::from_arguments(arguments)?),
            ExpressionKind::Not => Expression::Not(Not::from_arguments(arguments)?),
            ExpressionKind::Or => Expression::Or(Or::from_arguments(arguments)?),
            ExpressionKind::If => Expression::If(Conditional::from_arguments(arguments)?),
            ExpressionKind::ComplexIf => {
                Expression::ComplexIf(ComplexIf::from_arguments(arguments)?)
            }
            ExpressionKind::Group => Expression::Group(Group::from_arguments(arguments)?),
        })
    }
}

impl Expression {
    /// Constructor arguments of this node, in constructor order.
    ///
    /// Child nodes share their subtrees with `self`.
    pub fn arguments(&self) -> Vec<Argument> {
        self.clone().into_arguments()
    }

    fn into_arguments(self) -> Vec<Argument> {
        match self {
            Expression::Empty => Vec::new(),
            Expression::Scalar(node) => node.into_arguments(),
            Expression::Not(node) => node.into_arguments(),
            Expression::Or(node) => node.into_arguments(),
            Expression::If(node) => node.into_arguments(),
            Expression::ComplexIf(node) => node.into_arguments(),
            Expression::Group(node) => node.into_arguments(),
        }
    }

    /// Copies the node, replacing the arguments at the given positions.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError::ArgumentMismatch`] when a position does not
    /// exist or a replacement has the wrong shape.
    pub fn rebuild(
        &self,
        overrides: impl IntoIterator<Item = (usize, Argument)>,
    ) -> Result<Expression, ExpressionError> {
        let kind = self.kind();
        let mut arguments = self.arguments();
        for (position, argument) in overrides {
            let slot = arguments
                .get_mut(position)
                .ok_or(ExpressionError::ArgumentMismatch {
                    kind: kind.as_str(),
                    position,
                })?;
            *slot = argument;
        }
        kind.build(arguments)
    }

    /// Returns a structurally identical tree bound to `organizer`.
    ///
    /// Every scalar is replaced by the organizer's step at the same index and
    /// every chain takes the organizer as its fallback source. The receiver
    /// is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError::StepNotBound`] if the organizer has no step
    /// at an index referenced by the tree.
    pub fn with_organizer(&self, organizer: &Organizer) -> Result<Expression, ExpressionError> {
        // Post-order over an explicit stack: a node is assembled once all of
        // its children sit, in order, on top of `bound`.
        let mut tasks = vec![BindTask::Bind(self.clone())];
        let mut bound: Vec<Expression> = Vec::new();

        while let Some(task) = tasks.pop() {
            match task {
                BindTask::Bind(node) => {
                    let kind = node.kind();
                    let mut children = Vec::new();
                    let pending = node
                        .into_arguments()
                        .into_iter()
                        .map(|argument| Pending::split(argument, organizer, &mut children))
                        .collect::<Result<Vec<_>, _>>()?;
                    tasks.push(BindTask::Assemble(kind, pending));
                    tasks.extend(children.into_iter().rev().map(BindTask::Bind));
                }
                BindTask::Assemble(kind, pending) => {
                    let count: usize = pending.iter().map(Pending::node_count).sum();
                    let mismatch = ExpressionError::ArgumentMismatch {
                        kind: kind.as_str(),
                        position: 0,
                    };
                    if count > bound.len() {
                        return Err(mismatch);
                    }
                    let mut children = bound.split_off(bound.len() - count).into_iter();
                    let arguments = pending
                        .into_iter()
                        .map(|argument| argument.fill(&mut children))
                        .collect::<Option<Vec<_>>>()
                        .ok_or(mismatch)?;
                    bound.push(kind.build(arguments)?);
                }
            }
        }

        bound.pop().ok_or(ExpressionError::ArgumentMismatch {
            kind: self.kind().as_str(),
            position: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use musubi_core::Context;

    #[test]
    fn test_arguments_follow_constructor_order() {
        let organizer = organizer(&[success(), failure(), success()]);
        let s = |i: usize| Expression::scalar(organizer.steps()[i].clone());

        let chain = Expression::complex_if(
            Conditional::new(s(0), s(1)),
            vec![Conditional::new(s(1), s(2))],
            Some(Expression::group(s(2))),
        );
        let arguments = chain.arguments();

        assert_eq!(arguments.len(), 4);
        assert!(matches!(&arguments[0], Argument::Node(node) if node.is_if()));
        assert!(matches!(&arguments[1], Argument::Nodes(nodes) if nodes.len() == 1));
        assert!(matches!(&arguments[2], Argument::Optional(Some(node)) if node.is_group()));
        assert!(matches!(&arguments[3], Argument::Organizer(None)));
        assert!(Expression::empty().arguments().is_empty());
    }

    #[test]
    fn test_rebuild_replaces_selected_positions() {
        let organizer = organizer(&[success(), failure(), success()]);
        let s = |i: usize| Expression::scalar(organizer.steps()[i].clone());

        let original = Expression::or(s(0), s(1));
        let copy = original
            .rebuild([(1, Argument::Node(s(2)))])
            .expect("valid override");

        assert_eq!(copy.inspect(), "steps[0] || steps[2]");
        assert_eq!(original.inspect(), "steps[0] || steps[1]");
        assert_eq!(original.rebuild([]).expect("plain copy"), original);
    }

    #[test]
    fn test_rebuild_rejects_wrong_shapes() {
        let organizer = organizer(&[success(), failure()]);
        let s = |i: usize| Expression::scalar(organizer.steps()[i].clone());

        let or = Expression::or(s(0), s(1));
        assert_eq!(
            or.rebuild([(0, Argument::Step(organizer.steps()[0].clone()))])
                .map(|e| e.inspect()),
            Err(ExpressionError::ArgumentMismatch {
                kind: "or",
                position: 0
            })
        );
        assert_eq!(
            or.rebuild([(2, Argument::Node(s(0)))]).map(|e| e.inspect()),
            Err(ExpressionError::ArgumentMismatch {
                kind: "or",
                position: 2
            })
        );

        let chain = Expression::complex_if(Conditional::new(s(0), s(1)), vec![], None);
        assert_eq!(
            chain
                .rebuild([(1, Argument::Nodes(vec![s(0)]))])
                .map(|e| e.inspect()),
            Err(ExpressionError::ArgumentMismatch {
                kind: "complex_if",
                position: 1
            })
        );
    }

    #[test]
    fn test_with_organizer_rebinds_by_index() {
        let outcomes = [success(), failure(), error()];
        let a = organizer(&outcomes);
        let b = organizer(&outcomes);
        let s = |i: usize| Expression::scalar(a.steps()[i].clone());

        let tree = Expression::complex_if(
            Conditional::new(Expression::not(s(0)), s(1)),
            vec![],
            Some(Expression::or(s(1), s(2))),
        );
        let rebound = tree.with_organizer(&b).expect("same shape");

        assert_eq!(rebound, tree);
        assert!(rebound.steps().iter().all(|step| b.owns(step)));
        assert!(tree.steps().iter().all(|step| a.owns(step)));

        let Expression::ComplexIf(chain) = &rebound else {
            unreachable!("rebinding keeps the kind");
        };
        assert!(chain.organizer().is_some_and(|o| o.ptr_eq(&b)));
    }

    #[test]
    fn test_with_organizer_replaces_previous_binding() {
        let outcomes = [success(), failure()];
        let a = organizer(&outcomes);
        let b = organizer(&outcomes);
        let c = organizer(&outcomes);
        let tree = Expression::if_then(
            Expression::scalar(a.steps()[0].clone()),
            Expression::scalar(a.steps()[1].clone()),
        );

        let twice = tree
            .with_organizer(&b)
            .and_then(|t| t.with_organizer(&b))
            .expect("rebinding");
        assert!(twice.steps().iter().all(|step| b.owns(step)));

        let moved = twice.with_organizer(&c).expect("rebinding");
        assert!(moved.steps().iter().all(|step| c.owns(step)));
        assert!(!moved.steps().iter().any(|step| b.owns(step)));
    }

    #[test]
    fn test_with_organizer_missing_step() {
        let a = organizer(&[success(), success(), success()]);
        let short = Organizer::new(definitions(&[success()]), Context::new());
        let tree = Expression::or(
            Expression::scalar(a.steps()[0].clone()),
            Expression::scalar(a.steps()[2].clone()),
        );

        assert!(matches!(
            tree.with_organizer(&short),
            Err(ExpressionError::StepNotBound { index: 2, .. })
        ));
        assert!(Expression::empty().with_organizer(&short).is_ok());
    }

    #[test]
    fn test_with_organizer_on_deep_tree() {
        let outcomes = vec![success(); 2000];
        let a = organizer(&outcomes);
        let b = organizer(&outcomes);
        let chain = Expression::sequence(a.steps().iter().cloned());

        let rebound = chain.with_organizer(&b).expect("rebinding");
        assert_eq!(rebound, chain);
        let steps = rebound.steps();
        assert_eq!(steps.len(), 2000);
        assert!(steps.iter().all(|step| b.owns(step)));
    }
}
