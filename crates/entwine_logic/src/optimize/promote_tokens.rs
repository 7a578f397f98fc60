//! Promotes bare token identifiers used as predicates.
//!
//! A token name standing alone where a boolean is expected — at the top of
//! a rule, or as a child of Every/AnyOf/Invert — means "do I hold one", so
//! it becomes `has(token, 1)`. Token identifiers in argument positions are
//! operands and stay bare.

use crate::ast::{rewrite::rewrite_children, Node};
use crate::error::{OptimizeError, OptimizeErrorKind};
use crate::symbols::SymbolKind;
use crate::CompileEnv;

pub(crate) fn run<'a>(
    env: &mut CompileEnv<'a>,
    node: &'a Node<'a>,
) -> Result<&'a Node<'a>, OptimizeError> {
    predicate(env, node)
}

/// Rewrites a node standing in a predicate position.
fn predicate<'a>(
    env: &mut CompileEnv<'a>,
    node: &'a Node<'a>,
) -> Result<&'a Node<'a>, OptimizeError> {
    let cx = env.ast;
    match *node {
        Node::Identifier(id) => {
            if env.symbols.symbol(id).kind != SymbolKind::Token {
                return Ok(node);
            }
            let Some(has) = env.symbols.lookup("has") else {
                return Err(env.fail(OptimizeErrorKind::MissingSymbol { name: "has".into() }));
            };
            let target = cx.identifier(has.id);
            Ok(cx.invoke(target, vec![Node::Identifier(id), Node::Number(1.0)]))
        }

        Node::Every(children) => {
            rebuild(env, node, children, Node::Every)
        }
        Node::AnyOf(children) => {
            rebuild(env, node, children, Node::AnyOf)
        }

        Node::Invert(inner) => {
            let rewritten = predicate(env, inner)?;
            if std::ptr::eq(rewritten, inner) {
                return Ok(node);
            }
            Ok(cx.alloc(Node::Invert(rewritten)))
        }

        // Argument and operand positions: walk through without promoting.
        _ => rewrite_children(cx, node, &mut |n| value(env, n)),
    }
}

fn rebuild<'a>(
    env: &mut CompileEnv<'a>,
    node: &'a Node<'a>,
    children: &'a [Node<'a>],
    wrap: fn(&'a [Node<'a>]) -> Node<'a>,
) -> Result<&'a Node<'a>, OptimizeError> {
    let cx = env.ast;
    let mut out = Vec::with_capacity(children.len());
    let mut changed = false;
    for child in children {
        let rewritten = predicate(env, child)?;
        changed |= !std::ptr::eq(rewritten, child);
        out.push(*rewritten);
    }
    if !changed {
        return Ok(node);
    }
    Ok(cx.alloc(wrap(cx.alloc_nodes(out))))
}

/// A value position: tokens stay bare, but containers further down may hold
/// predicate positions again.
fn value<'a>(
    env: &mut CompileEnv<'a>,
    node: &'a Node<'a>,
) -> Result<&'a Node<'a>, OptimizeError> {
    let cx = env.ast;
    match *node {
        Node::Identifier(_) => Ok(node),
        Node::Every(_) | Node::AnyOf(_) | Node::Invert(_) => predicate(env, node),
        _ => rewrite_children(cx, node, &mut |n| value(env, n)),
    }
}
