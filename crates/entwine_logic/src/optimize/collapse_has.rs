//! Canonicalises `has` forms.
//!
//! `has(TOKEN)` gains the implicit quantity: `has(TOKEN, 1)`. Aggregates of
//! unit checks simplify to the flat form the dedicated built-ins exist for:
//! `has_every(has(a), has(b))` becomes `has_every(a, b)`, likewise
//! `has_anyof`.

use crate::ast::{rewrite::rewrite_children, Node};
use crate::error::OptimizeError;
use crate::symbols::SymbolId;
use crate::CompileEnv;

pub(crate) fn run<'a>(
    env: &mut CompileEnv<'a>,
    node: &'a Node<'a>,
) -> Result<&'a Node<'a>, OptimizeError> {
    let cx = env.ast;
    let node = rewrite_children(cx, node, &mut |n| run(env, n))?;
    let cx = env.ast;

    let Node::Invoke { target, args } = *node else {
        return Ok(node);
    };
    let Node::Identifier(id) = *target else {
        return Ok(node);
    };

    match env.symbols.symbol(id).name.as_str() {
        "has" if args.len() == 1 => Ok(cx.alloc(Node::Invoke {
            target,
            args: cx.alloc_nodes(vec![args[0], Node::Number(1.0)]),
        })),
        "has_every" | "has_anyof" if !args.is_empty() => {
            let has = env.symbols.lookup("has").map(|s| s.id);
            let Some(inner) = unwrap_unit_checks(args, has) else {
                return Ok(node);
            };
            Ok(cx.alloc(Node::Invoke {
                target,
                args: cx.alloc_nodes(inner),
            }))
        }
        _ => Ok(node),
    }
}

/// When every argument is a unit `has` check, yields the checked operands.
fn unwrap_unit_checks<'a>(
    args: &'a [Node<'a>],
    has: Option<SymbolId>,
) -> Option<Vec<Node<'a>>> {
    let has = has?;
    let mut inner = Vec::with_capacity(args.len());
    for arg in args {
        let Node::Invoke {
            target: &Node::Identifier(id),
            args: check,
        } = arg
        else {
            return None;
        };
        if id != has {
            return None;
        }
        match check {
            [what] => inner.push(*what),
            [what, Node::Number(qty)] if *qty == 1.0 => inner.push(*what),
            _ => return None,
        }
    }
    Some(inner)
}
