//! Constant folding with short-circuit pruning.
//!
//! Every/AnyOf drop dominated children: a false child collapses an Every to
//! false, a true child collapses an AnyOf to true, neutral children are
//! removed, and singletons unwrap. Invert folds over boolean literals, and
//! comparisons between two literals of the same kind fold to a boolean.

use crate::ast::{rewrite::rewrite_children, CompareOp, Node};
use crate::error::OptimizeError;
use crate::CompileEnv;

pub(crate) fn run<'a>(
    env: &mut CompileEnv<'a>,
    node: &'a Node<'a>,
) -> Result<&'a Node<'a>, OptimizeError> {
    let cx = env.ast;
    let node = rewrite_children(cx, node, &mut |n| run(env, n))?;
    let cx = env.ast;

    match *node {
        Node::Invert(inner) => {
            if let Node::Boolean(value) = *inner {
                Ok(cx.boolean(!value))
            } else {
                Ok(node)
            }
        }

        Node::Every(children) => {
            if children.iter().any(|c| matches!(c, Node::Boolean(false))) {
                return Ok(cx.boolean(false));
            }
            prune(cx, node, children, |c| matches!(c, Node::Boolean(true)), true)
        }

        Node::AnyOf(children) => {
            if children.iter().any(|c| matches!(c, Node::Boolean(true))) {
                return Ok(cx.boolean(true));
            }
            prune(cx, node, children, |c| matches!(c, Node::Boolean(false)), false)
        }

        Node::Compare { op, lhs, rhs } => Ok(fold_compare(op, lhs, rhs).unwrap_or(node)),

        _ => Ok(node),
    }
}

/// Drops neutral children; unwraps singletons; an emptied node folds to the
/// reduction's identity.
fn prune<'a>(
    cx: crate::ast::AstContext<'a>,
    node: &'a Node<'a>,
    children: &'a [Node<'a>],
    neutral: impl Fn(&Node<'a>) -> bool,
    identity: bool,
) -> Result<&'a Node<'a>, OptimizeError> {
    let kept: Vec<&Node<'a>> = children.iter().filter(|c| !neutral(c)).collect();
    match kept.len() {
        0 => Ok(cx.boolean(identity)),
        1 => Ok(kept[0]),
        n if n == children.len() => Ok(node),
        _ => {
            let kept: Vec<Node<'a>> = kept.into_iter().copied().collect();
            let rebuilt = match node {
                Node::Every(_) => Node::Every(cx.alloc_nodes(kept)),
                _ => Node::AnyOf(cx.alloc_nodes(kept)),
            };
            Ok(cx.alloc(rebuilt))
        }
    }
}

fn fold_compare<'a>(op: CompareOp, lhs: &Node<'a>, rhs: &Node<'a>) -> Option<&'a Node<'a>> {
    let result = match (lhs, rhs) {
        (Node::Number(l), Node::Number(r)) => match op {
            CompareOp::Eq => l == r,
            CompareOp::Nq => l != r,
            CompareOp::Lt => l < r,
        },
        (Node::Boolean(l), Node::Boolean(r)) => match op {
            CompareOp::Eq => l == r,
            CompareOp::Nq => l != r,
            CompareOp::Lt => return None,
        },
        (Node::String(l), Node::String(r)) => match op {
            CompareOp::Eq => l == r,
            CompareOp::Nq => l != r,
            CompareOp::Lt => return None,
        },
        _ => return None,
    };
    Some(if result {
        crate::ast::TRUE
    } else {
        crate::ast::FALSE
    })
}
