//! The shared child-rewriting walk.
//!
//! Every optimizer pass is a function from a node to a node. For the
//! variants a pass does not care about, it delegates here:
//! [`rewrite_children`] applies the pass to each child and rebuilds the node
//! only when some child actually changed, so an untouched subtree keeps its
//! pointer identity. That identity is what lets the pass driver detect a
//! fixed point without a structural comparison.

use super::{AstContext, Node};

/// Applies `f` to every child of `node`, rebuilding the node if any child
/// was replaced. Leaves pass through untouched.
pub fn rewrite_children<'a, E>(
    cx: AstContext<'a>,
    node: &'a Node<'a>,
    f: &mut dyn FnMut(&'a Node<'a>) -> Result<&'a Node<'a>, E>,
) -> Result<&'a Node<'a>, E> {
    match *node {
        Node::Boolean(_)
        | Node::Number(_)
        | Node::String(_)
        | Node::Identifier(_) => Ok(node),

        Node::Invoke { target, args } => {
            let new_target = f(target)?;
            let (new_args, args_changed) = rewrite_slice(args, f)?;
            if !args_changed && std::ptr::eq(new_target, target) {
                return Ok(node);
            }
            Ok(cx.alloc(Node::Invoke {
                target: new_target,
                args: cx.alloc_nodes(new_args),
            }))
        }

        Node::Invert(inner) => {
            let new_inner = f(inner)?;
            if std::ptr::eq(new_inner, inner) {
                return Ok(node);
            }
            Ok(cx.alloc(Node::Invert(new_inner)))
        }

        Node::Every(children) => {
            let (new_children, changed) = rewrite_slice(children, f)?;
            if !changed {
                return Ok(node);
            }
            Ok(cx.alloc(Node::Every(cx.alloc_nodes(new_children))))
        }

        Node::AnyOf(children) => {
            let (new_children, changed) = rewrite_slice(children, f)?;
            if !changed {
                return Ok(node);
            }
            Ok(cx.alloc(Node::AnyOf(cx.alloc_nodes(new_children))))
        }

        Node::Compare { op, lhs, rhs } => {
            let new_lhs = f(lhs)?;
            let new_rhs = f(rhs)?;
            if std::ptr::eq(new_lhs, lhs) && std::ptr::eq(new_rhs, rhs) {
                return Ok(node);
            }
            Ok(cx.alloc(Node::Compare {
                op,
                lhs: new_lhs,
                rhs: new_rhs,
            }))
        }
    }
}

fn rewrite_slice<'a, E>(
    children: &'a [Node<'a>],
    f: &mut dyn FnMut(&'a Node<'a>) -> Result<&'a Node<'a>, E>,
) -> Result<(Vec<Node<'a>>, bool), E> {
    let mut out = Vec::with_capacity(children.len());
    let mut changed = false;
    for child in children {
        let rewritten = f(child)?;
        changed |= !std::ptr::eq(rewritten, child);
        out.push(*rewritten);
    }
    Ok((out, changed))
}
