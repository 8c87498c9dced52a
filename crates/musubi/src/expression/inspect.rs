//! Canonical text form and structural comparison.

use super::Expression;
use std::fmt;

/// Outcome of comparing two expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Same kind and structurally equal arguments.
    Equal,
    /// Same kind, different arguments.
    NotEqual,
    /// Different kinds; the shapes cannot be compared.
    Incomparable,
}

impl Expression {
    /// Compares two trees structurally.
    ///
    /// Steps compare by position and name, so a tree and its rebound copy
    /// are equal. The organizer a chain is bound to is ignored.
    pub fn compare(&self, other: &Expression) -> Comparison {
        if self.kind() != other.kind() {
            return Comparison::Incomparable;
        }
        let mut pairs = vec![(self, other)];
        while let Some(pair) = pairs.pop() {
            let same = match pair {
                (Expression::Empty, Expression::Empty) => true,
                (Expression::Scalar(a), Expression::Scalar(b)) => a.step() == b.step(),
                (Expression::Not(a), Expression::Not(b)) => {
                    pairs.push((a.expression(), b.expression()));
                    true
                }
                (Expression::Group(a), Expression::Group(b)) => {
                    pairs.push((a.expression(), b.expression()));
                    true
                }
                (Expression::Or(a), Expression::Or(b)) => {
                    pairs.extend([(a.left(), b.left()), (a.right(), b.right())]);
                    true
                }
                (Expression::If(a), Expression::If(b)) => {
                    pairs.extend([(a.condition(), b.condition()), (a.then(), b.then())]);
                    true
                }
                (Expression::ComplexIf(a), Expression::ComplexIf(b)) => {
                    let shaped = a.elsif_branches().len() == b.elsif_branches().len()
                        && a.else_branch().is_some() == b.else_branch().is_some();
                    if shaped {
                        for (a, b) in a.branches().zip(b.branches()) {
                            pairs.extend([(a.condition(), b.condition()), (a.then(), b.then())]);
                        }
                        pairs.extend(a.else_branch().zip(b.else_branch()));
                    }
                    shaped
                }
                _ => false,
            };
            if !same {
                return Comparison::NotEqual;
            }
        }
        Comparison::Equal
    }

    /// The canonical text form, e.g. `if steps[0] then steps[1] end`.
    pub fn inspect(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Comparison::Equal
    }
}

enum Piece<'a> {
    Text(&'static str),
    Node(&'a Expression),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Piece::{Node, Text};

        // pieces are popped from the end, so each form is pushed reversed
        let mut pieces = vec![Node(self)];
        while let Some(piece) = pieces.pop() {
            let node = match piece {
                Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Node(node) => node,
            };
            match node {
                Expression::Empty => {}
                Expression::Scalar(scalar) => write!(f, "steps[{}]", scalar.step().index())?,
                Expression::Not(not) => pieces.extend([Node(not.expression()), Text("not ")]),
                Expression::Or(or) => {
                    pieces.extend([Node(or.right()), Text(" || "), Node(or.left())]);
                }
                Expression::Group(group) => {
                    pieces.extend([Text(")"), Node(group.expression()), Text("(")]);
                }
                Expression::If(branch) => pieces.extend([
                    Text(" end"),
                    Node(branch.then()),
                    Text(" then "),
                    Node(branch.condition()),
                    Text("if "),
                ]),
                Expression::ComplexIf(chain) => {
                    pieces.push(Text(" end"));
                    if let Some(otherwise) = chain.else_branch() {
                        // the else clause already delimits its group
                        let otherwise = match otherwise {
                            Expression::Group(group) => group.expression(),
                            other => other,
                        };
                        pieces.extend([Node(otherwise), Text(" else ")]);
                    }
                    for branch in chain.elsif_branches().iter().rev() {
                        pieces.extend([
                            Node(branch.then()),
                            Text(" then "),
                            Node(branch.condition()),
                            Text(" elsif "),
                        ]);
                    }
                    let first = chain.if_branch();
                    pieces.extend([
                        Node(first.then()),
                        Text(" then "),
                        Node(first.condition()),
                        Text("if "),
                    ]);
                }
            }
        }
        Ok(())
    }
}
