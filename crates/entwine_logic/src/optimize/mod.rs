//! The AST rewrite passes.
//!
//! Each pass is a function from an arena node to an arena node; an unchanged
//! subtree keeps its pointer. [`optimize`] threads a rule through the fixed
//! pass sequence — settings, scripted inlining, compiler functions, constant
//! folding, bare-function promotion, has-collapsing, token promotion,
//! connection generation — and repeats the sweep until nothing changes or
//! the pass budget runs out.

pub mod bare_invoke;
pub mod collapse_has;
pub mod compiler_fns;
pub mod conngen;
pub mod fold;
pub mod inline_calls;
pub mod inline_settings;
pub mod promote_tokens;

pub use compiler_fns::{CompilerFn, CompilerFns};
pub use conngen::ConnectionScribe;

use crate::ast::Node;
use crate::error::OptimizeError;
use crate::symbols::SymbolId;
use crate::CompileEnv;

/// Mutable optimizer state threaded through a compile batch.
///
/// `current_location` is the name of the region whose rule is compiling;
/// the batch driver sets it per edge and optimization errors report it.
#[derive(Default)]
pub struct Context {
    pub current_location: String,
    /// Helpers currently being expanded, for recursion detection.
    pub(crate) inlining: Vec<SymbolId>,
}

/// Records the owning region for subsequent error reports.
pub fn set_current_location(context: &mut Context, name: &str) {
    context.current_location.clear();
    context.current_location.push_str(name);
}

/// Runs the full pass sequence to a fixed point, bounded by `env.passes`.
pub fn optimize<'a>(
    env: &mut CompileEnv<'a>,
    scribe: &mut dyn ConnectionScribe<'a>,
    node: &'a Node<'a>,
) -> Result<&'a Node<'a>, OptimizeError> {
    let mut current = node;
    for _ in 0..env.passes {
        let next = rewrite_with_every(env, scribe, current)?;
        if std::ptr::eq(next, current) {
            break;
        }
        current = next;
    }
    Ok(current)
}

/// One sweep: every pass applied once, in the fixed order.
pub fn rewrite_with_every<'a>(
    env: &mut CompileEnv<'a>,
    scribe: &mut dyn ConnectionScribe<'a>,
    node: &'a Node<'a>,
) -> Result<&'a Node<'a>, OptimizeError> {
    let node = inline_settings::run(env, node)?;
    let node = inline_calls::run(env, node)?;
    let node = compiler_fns::run(env, node)?;
    let node = fold::run(env, node)?;
    let node = bare_invoke::run(env, node)?;
    let node = collapse_has::run(env, node)?;
    let node = promote_tokens::run(env, node)?;
    conngen::run(env, scribe, node)
}
