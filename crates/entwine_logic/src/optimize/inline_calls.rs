//! Substitutes scripted helper bodies into their call sites.
//!
//! Parameters are replaced by the actual argument nodes. The substituted
//! body is immediately re-run through this pass so helpers that call other
//! helpers flatten in one sweep; a stack of helpers currently being
//! expanded catches recursion, which is not supported.

use crate::ast::{rewrite::rewrite_children, Node};
use crate::error::{OptimizeError, OptimizeErrorKind};
use crate::symbols::{SymbolId, SymbolKind};
use crate::CompileEnv;
use rustc_hash::FxHashMap;

pub(crate) fn run<'a>(
    env: &mut CompileEnv<'a>,
    node: &'a Node<'a>,
) -> Result<&'a Node<'a>, OptimizeError> {
    let cx = env.ast;
    match *node {
        Node::Invoke { target, args } => {
            let Node::Identifier(id) = *target else {
                return rewrite_children(cx, node, &mut |n| run(env, n));
            };
            let symbol = env.symbols.symbol(id);
            if !matches!(symbol.kind, SymbolKind::ScriptedFn | SymbolKind::Function) {
                return rewrite_children(cx, node, &mut |n| run(env, n));
            }
            let name = symbol.name.clone();

            if env.context.inlining.contains(&id) {
                return Err(env.fail(OptimizeErrorKind::RecursiveHelper { name }));
            }
            let Some(helper) = env.helpers.get(id) else {
                return Err(env.fail(OptimizeErrorKind::MissingHelper { name }));
            };
            if helper.params.len() != args.len() {
                return Err(env.fail(OptimizeErrorKind::HelperArity {
                    name,
                    expects: helper.params.len(),
                    got: args.len(),
                }));
            }

            let body = helper.body;
            let replacements: FxHashMap<SymbolId, &'a Node<'a>> = helper
                .params
                .iter()
                .copied()
                .zip(args.iter())
                .collect();

            env.context.inlining.push(id);
            let substituted = substitute(env, body, &replacements);
            let result = substituted.and_then(|inlined| run(env, inlined));
            env.context.inlining.pop();
            result
        }
        _ => rewrite_children(cx, node, &mut |n| run(env, n)),
    }
}

fn substitute<'a>(
    env: &mut CompileEnv<'a>,
    node: &'a Node<'a>,
    replacements: &FxHashMap<SymbolId, &'a Node<'a>>,
) -> Result<&'a Node<'a>, OptimizeError> {
    match *node {
        Node::Identifier(id) => Ok(replacements.get(&id).copied().unwrap_or(node)),
        _ => {
            let cx = env.ast;
            rewrite_children(cx, node, &mut |n| substitute(env, n, replacements))
        }
    }
}
