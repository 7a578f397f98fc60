//! # entwine-logic
//!
//! The access-rule pipeline: everything between a parsed rule expression
//! and a boolean answer against an inventory.
//!
//! ```text
//! rule AST
//!     │
//!     ▼
//! ┌───────────┐    ┌────────────┐    ┌──────────┐
//! │ optimizer │ ─▶ │  codegen   │ ─▶ │ bytecode │
//! │ (8 passes)│    │            │    │  module  │
//! └───────────┘    └────────────┘    └──────────┘
//!                                         │
//!                        inventory ──▶ ┌──▼──┐
//!                                      │ VM  │ ─▶ true / false
//!                                      └─────┘
//! ```
//!
//! - [`symbols`]: names to typed symbols, with aliasing
//! - [`objects`]: packed 32-bit runtime values and the frozen object table
//! - [`ast`]: arena-allocated rule trees with structural hashing
//! - [`optimize`]: the fixed rewrite pass sequence
//! - [`codegen`]: the specialising bytecode emitter
//! - [`vm`]: the stack machine
//! - [`settings`]: the typed option surface rules compile against
//! - [`error`]: stage errors and the per-edge diagnostic report
//!
//! [`CompileEnv`] owns the shared build state — symbol table, object
//! builder, interner, settings, helpers — and declares the standard
//! vocabulary on construction: every built-in function, every setting name,
//! every compiler function, and the `at` connection generator.

pub mod ast;
pub mod code;
pub mod codegen;
pub mod error;
pub mod helpers;
pub mod objects;
pub mod optimize;
pub mod settings;
pub mod symbols;
pub mod vm;

pub use entwine_base::{Arena, CancelToken, IStr, Interner};

use ast::{AstContext, Node};
use code::Bytecode;
use error::{DataError, OptimizeError, OptimizeErrorKind, PipelineError};
use helpers::{Helper, Helpers};
use objects::{Builder, Object, Ptr32, PtrTag};
use optimize::compiler_fns::SupportSymbols;
use optimize::{CompilerFns, ConnectionScribe, Context};
use settings::Settings;
use symbols::{SymbolId, SymbolKind, SymbolTable};

/// Rewrite sweeps before the optimizer gives up on reaching a fixed point.
pub const DEFAULT_PASS_BUDGET: u32 = 10;

/// The built-in functions every world declares: name and parameter count
/// (−1 variadic). The runtime binds an implementation for each.
pub const BUILT_IN_DEFS: &[(&str, i8)] = &[
    ("can_live_dmg", -1),
    ("check_tod", 1),
    ("check_tod_access", 1),
    ("has", 2),
    ("has_anyof", -1),
    ("has_bottle", 0),
    ("has_dungeon_rewards", 1),
    ("has_every", -1),
    ("has_hearts", 1),
    ("has_medallions", 1),
    ("has_notes_for_song", 1),
    ("has_stones", 1),
    ("is_adult", 0),
    ("is_child", 0),
    ("is_starting_age", 0),
    ("needs_hearts_for_damage_multiplier", 1),
];

/// Shared state for one compile batch.
pub struct CompileEnv<'a> {
    pub ast: AstContext<'a>,
    pub interner: Interner,
    pub symbols: SymbolTable,
    pub objects: Builder,
    pub settings: Settings,
    pub helpers: Helpers<'a>,
    pub compiler_fns: CompilerFns,
    pub context: Context,
    /// Rewrite sweep budget per rule.
    pub passes: u32,
}

impl<'a> CompileEnv<'a> {
    /// Builds an environment with the standard vocabulary declared: the
    /// built-in function definitions, the setting symbols with their packed
    /// pointers, the compiler functions, and the `at` generator.
    pub fn new(ast: AstContext<'a>, settings: Settings) -> Result<CompileEnv<'a>, DataError> {
        let mut symbols = SymbolTable::new();
        let mut objects = Builder::new();

        let has_notes_for_song =
            declare_built_in(&mut symbols, &mut objects, "has_notes_for_song", 1)?;
        let needs_hearts = declare_built_in(
            &mut symbols,
            &mut objects,
            "needs_hearts_for_damage_multiplier",
            1,
        )?;
        let check_tod = declare_built_in(&mut symbols, &mut objects, "check_tod", 1)?;

        let compiler_fns = CompilerFns::install(
            &mut symbols,
            SupportSymbols {
                has_notes_for_song,
                needs_hearts_for_damage_multiplier: needs_hearts,
                check_tod,
            },
        )?;

        // can_live_dmg is already declared as a compiler function; it still
        // gets a runtime definition so the declaration table is complete
        for (name, params) in BUILT_IN_DEFS {
            declare_built_in(&mut symbols, &mut objects, name, *params)?;
        }

        for (address, name) in Settings::names().iter().enumerate() {
            let id = symbols.declare(name, SymbolKind::Setting)?;
            let symbol = symbols.symbol(id).clone();
            objects.associate_symbol(
                &symbol,
                Object::pack_ptr(Ptr32 {
                    tag: PtrTag::Setting,
                    addr: address as u32,
                }),
            )?;
        }

        // the connection generator's entry point; rewritten away before
        // codegen ever sees it
        symbols.declare("at", SymbolKind::BuiltInFn)?;

        Ok(CompileEnv {
            ast,
            interner: Interner::new(),
            symbols,
            objects,
            settings,
            helpers: Helpers::new(),
            compiler_fns,
            context: Context::default(),
            passes: DEFAULT_PASS_BUDGET,
        })
    }

    /// Declares a scripted helper and its parameter symbols.
    ///
    /// Parameter symbols are scoped to the helper, so two helpers can both
    /// name a parameter `x`.
    pub fn declare_helper(
        &mut self,
        name: &str,
        params: &[&str],
    ) -> Result<(SymbolId, Vec<SymbolId>), DataError> {
        let symbol = self.symbols.declare(name, SymbolKind::ScriptedFn)?;
        let mut param_ids = Vec::with_capacity(params.len());
        for param in params {
            let scoped = format!("{name}::{param}");
            param_ids.push(self.symbols.declare(&scoped, SymbolKind::Local)?);
        }
        Ok((symbol, param_ids))
    }

    /// Attaches a parsed body to a declared helper.
    pub fn define_helper(&mut self, symbol: SymbolId, params: Vec<SymbolId>, body: &'a Node<'a>) {
        let name = self.symbols.symbol(symbol).name.clone();
        self.helpers.insert(symbol, Helper { name, params, body });
    }

    /// Runs the rewrite passes to a fixed point.
    pub fn optimize(
        &mut self,
        scribe: &mut dyn ConnectionScribe<'a>,
        node: &'a Node<'a>,
    ) -> Result<&'a Node<'a>, OptimizeError> {
        optimize::optimize(self, scribe, node)
    }

    /// Emits bytecode for an already-optimized tree.
    pub fn compile(&mut self, node: &'a Node<'a>) -> Result<Bytecode, PipelineError> {
        codegen::compile(node, &self.symbols, &self.interner, &mut self.objects)
    }

    /// Optimizes and compiles one rule.
    pub fn compile_rule(
        &mut self,
        scribe: &mut dyn ConnectionScribe<'a>,
        node: &'a Node<'a>,
    ) -> Result<Bytecode, PipelineError> {
        let optimized = self.optimize(scribe, node)?;
        self.compile(optimized)
    }

    pub(crate) fn fail(&self, kind: OptimizeErrorKind) -> OptimizeError {
        OptimizeError::new(self.context.current_location.clone(), kind)
    }
}

fn declare_built_in(
    symbols: &mut SymbolTable,
    objects: &mut Builder,
    name: &str,
    params: i8,
) -> Result<SymbolId, DataError> {
    let id = match symbols.lookup(name) {
        Some(existing) => existing.id,
        None => symbols.declare(name, SymbolKind::BuiltInFn)?,
    };
    let symbol = symbols.symbol(id).clone();
    objects.define_function(&symbol, params)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entwine_base::Arena;
    use optimize::conngen::NoConnections;

    #[test]
    fn new_declares_the_standard_vocabulary() {
        let arena = Arena::new();
        let env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        for (name, _) in BUILT_IN_DEFS {
            let symbol = env.symbols.lookup(name).unwrap();
            // can_live_dmg doubles as a compiler function; everything else
            // is a plain built-in
            if *name == "can_live_dmg" {
                assert_eq!(symbol.kind, SymbolKind::CompilerFn);
            } else {
                assert_eq!(symbol.kind, SymbolKind::BuiltInFn, "{name}");
            }
        }
        for name in Settings::names() {
            assert_eq!(env.symbols.lookup(name).unwrap().kind, SymbolKind::Setting);
        }
        assert_eq!(
            env.symbols.lookup("is_trick_enabled").unwrap().kind,
            SymbolKind::CompilerFn
        );
        assert!(env.symbols.lookup("at").is_some());
    }

    #[test]
    fn built_in_defs_carry_the_declared_arity() {
        let arena = Arena::new();
        let env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        let has = env.symbols.lookup("has").unwrap().clone();
        assert_eq!(env.objects.function_definition(&has).unwrap().params, 2);
        let anyof = env.symbols.lookup("has_anyof").unwrap().clone();
        assert_eq!(env.objects.function_definition(&anyof).unwrap().params, -1);
    }

    #[test]
    fn compile_rule_runs_the_whole_pipeline() {
        // S4: a trick check folds before codegen; the tape is one PUSH_T
        let arena = Arena::new();
        let mut settings = Settings::default();
        settings.skills.tricks.insert("HammerJump".into(), true);
        let mut env = CompileEnv::new(AstContext::new(&arena), settings).unwrap();
        let trick = env.interner.intern("HammerJump");
        let target = env
            .ast
            .identifier(env.symbols.lookup("is_trick_enabled").unwrap().id);
        let rule = env.ast.invoke(target, vec![Node::String(trick)]);
        let module = env.compile_rule(&mut NoConnections, rule).unwrap();
        assert_eq!(module.tape, vec![u8::from(code::Op::PushT)]);
    }

    #[test]
    fn optimizer_output_is_idempotent() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        let token = env.symbols.declare("Bow", SymbolKind::Token).unwrap();
        let rule = env.ast.every(vec![
            Node::Identifier(token),
            Node::Boolean(true),
            *env.ast.invert(env.ast.boolean(false)),
        ]);
        let once = env.optimize(&mut NoConnections, rule).unwrap();
        let twice = env.optimize(&mut NoConnections, once).unwrap();
        assert!(std::ptr::eq(once, twice));
    }
}
