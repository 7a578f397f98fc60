//! Promotes bare function references to zero-arg calls.
//!
//! An identifier that names a built-in or compiler function in a value
//! position becomes a zero-arg Invoke of it. A bare reference to a zero-arg
//! scripted helper behaves the same; referring to a helper that takes
//! arguments without supplying any is an error. Identifiers that are
//! already call targets are left alone.

use crate::ast::{rewrite::rewrite_children, Node};
use crate::error::{OptimizeError, OptimizeErrorKind};
use crate::symbols::SymbolKind;
use crate::CompileEnv;

pub(crate) fn run<'a>(
    env: &mut CompileEnv<'a>,
    node: &'a Node<'a>,
) -> Result<&'a Node<'a>, OptimizeError> {
    let cx = env.ast;
    match *node {
        // Call targets stay bare; only the arguments are walked.
        Node::Invoke { target, args } => {
            let mut changed = false;
            let mut new_args = Vec::with_capacity(args.len());
            for arg in args {
                let rewritten = run(env, arg)?;
                changed |= !std::ptr::eq(rewritten, arg);
                new_args.push(*rewritten);
            }
            if !changed {
                return Ok(node);
            }
            Ok(cx.alloc(Node::Invoke {
                target,
                args: cx.alloc_nodes(new_args),
            }))
        }

        Node::Identifier(id) => {
            let symbol = env.symbols.symbol(id);
            match symbol.kind {
                SymbolKind::BuiltInFn | SymbolKind::CompilerFn => {
                    Ok(cx.invoke(node, vec![]))
                }
                SymbolKind::ScriptedFn | SymbolKind::Function => {
                    let name = symbol.name.clone();
                    let Some(helper) = env.helpers.get(id) else {
                        return Err(env.fail(OptimizeErrorKind::MissingHelper { name }));
                    };
                    if helper.params.is_empty() {
                        Ok(cx.invoke(node, vec![]))
                    } else {
                        let params = helper.params.len();
                        Err(env.fail(OptimizeErrorKind::BareFunctionArgs { name, params }))
                    }
                }
                _ => Ok(node),
            }
        }

        _ => rewrite_children(cx, node, &mut |n| run(env, n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstContext;
    use crate::settings::Settings;
    use entwine_base::Arena;

    #[test]
    fn built_in_references_become_calls() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        let bottle = env.symbols.lookup("has_bottle").unwrap().id;
        let node = env.ast.identifier(bottle);
        let out = run(&mut env, node).unwrap();
        assert_eq!(out, env.ast.invoke(env.ast.identifier(bottle), vec![]));
    }

    #[test]
    fn call_targets_are_not_doubly_invoked() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        let bottle = env.symbols.lookup("has_bottle").unwrap().id;
        let call = env.ast.invoke(env.ast.identifier(bottle), vec![]);
        let out = run(&mut env, call).unwrap();
        assert!(std::ptr::eq(out, call));
    }

    #[test]
    fn call_arguments_are_still_promoted() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        let every = env.symbols.lookup("has_every").unwrap().id;
        let adult = env.symbols.lookup("is_adult").unwrap().id;
        let call = env.ast.invoke(
            env.ast.identifier(every),
            vec![Node::Identifier(adult)],
        );
        let out = run(&mut env, call).unwrap();
        match out {
            Node::Invoke { args, .. } => {
                assert!(matches!(args[0], Node::Invoke { .. }))
            }
            other => panic!("expected invoke, got {}", other.kind_name()),
        }
    }

    #[test]
    fn zero_arg_helpers_promote() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        let (fairy, none) = env.declare_helper("Fairy", &[]).unwrap();
        let body = env.ast.boolean(true);
        env.define_helper(fairy, none, body);
        let node = env.ast.identifier(fairy);
        let out = run(&mut env, node).unwrap();
        assert_eq!(out, env.ast.invoke(env.ast.identifier(fairy), vec![]));
    }

    #[test]
    fn helpers_with_params_cannot_appear_bare() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        let (here, params) = env.declare_helper("here", &["x"]).unwrap();
        let body = env.ast.identifier(params[0]);
        env.define_helper(here, params, body);
        let node = env.ast.identifier(here);
        let err = run(&mut env, node).unwrap_err();
        assert!(matches!(err.kind, OptimizeErrorKind::BareFunctionArgs { .. }));
    }

    #[test]
    fn token_identifiers_stay_bare() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        let sword = env
            .symbols
            .declare("Sword", crate::symbols::SymbolKind::Token)
            .unwrap();
        let node = env.ast.identifier(sword);
        assert!(std::ptr::eq(run(&mut env, node).unwrap(), node));
    }
}
