//! Connection generation for anonymous at-locations.
//!
//! `at(region, rule)` means "there is something collectable in `region`
//! gated by `rule`". The rewrite synthesises a fresh event token and
//! placement, adds an edge from the named region to the placement carrying
//! the supplied rule, and replaces the expression with an identifier of the
//! generated token. Structurally equal rules share one generated token: the
//! synthesised names embed the rule's structural hash and the symbol table
//! dedupes on them.
//!
//! This pass deliberately mutates the world while optimizing — the entities
//! and edges it creates are picked up by the rest of the compile batch. The
//! mutation happens through the [`ConnectionScribe`] the driver supplies.

use crate::ast::{hash::structural_hash, rewrite::rewrite_children, Node};
use crate::error::{DataError, OptimizeError, OptimizeErrorKind};
use crate::objects::Builder;
use crate::symbols::{SymbolId, SymbolTable};
use crate::CompileEnv;

/// The world-side collaborator that materialises generated connections.
///
/// Implementations create the token, the placement, and the edge, fix the
/// token at the placement, declare and bind the token's symbol, and queue
/// the new edge's rule for compilation.
pub trait ConnectionScribe<'a> {
    fn add_connection_to(
        &mut self,
        region: &str,
        rule: &'a Node<'a>,
        hash: u64,
        symbols: &mut SymbolTable,
        objects: &mut Builder,
    ) -> Result<SymbolId, DataError>;
}

/// A scribe for contexts with no world attached; any `at(...)` is an error.
pub struct NoConnections;

impl<'a> ConnectionScribe<'a> for NoConnections {
    fn add_connection_to(
        &mut self,
        region: &str,
        _rule: &'a Node<'a>,
        _hash: u64,
        _symbols: &mut SymbolTable,
        _objects: &mut Builder,
    ) -> Result<SymbolId, DataError> {
        Err(DataError::UnknownRegion(region.to_string()))
    }
}

pub(crate) fn run<'a>(
    env: &mut CompileEnv<'a>,
    scribe: &mut dyn ConnectionScribe<'a>,
    node: &'a Node<'a>,
) -> Result<&'a Node<'a>, OptimizeError> {
    let cx = env.ast;
    match *node {
        Node::Invoke { target, args } => {
            let Node::Identifier(id) = *target else {
                return rewrite_children(cx, node, &mut |n| run(env, scribe, n));
            };
            if env.symbols.symbol(id).name != "at" {
                return rewrite_children(cx, node, &mut |n| run(env, scribe, n));
            }

            let (region, rule) = match args {
                [Node::String(region), rule] => (*region, rule),
                _ => {
                    return Err(env.fail(OptimizeErrorKind::CompilerFnArity {
                        name: "at".into(),
                        got: args.len(),
                    }))
                }
            };

            let region = env.interner.resolve(region).to_string();
            let hash = structural_hash(rule);
            let token = scribe
                .add_connection_to(
                    &region,
                    rule,
                    hash,
                    &mut env.symbols,
                    &mut env.objects,
                )
                .map_err(|err| {
                    env.fail(OptimizeErrorKind::MissingSymbol {
                        name: err.to_string(),
                    })
                })?;
            Ok(cx.identifier(token))
        }
        _ => rewrite_children(cx, node, &mut |n| run(env, scribe, n)),
    }
}
