//! Runs host compiler functions at compile time.
//!
//! When an Invoke targets a compiler-function symbol, the registered host
//! function receives the *unevaluated* argument nodes and returns a
//! replacement tree. The registered set is closed: every member is a
//! variant of [`CompilerFn`].

use crate::ast::{rewrite::rewrite_children, Node};
use crate::error::{DataError, OptimizeError, OptimizeErrorKind};
use crate::symbols::{SymbolId, SymbolKind, SymbolTable};
use crate::CompileEnv;
use entwine_base::IStr;
use rustc_hash::FxHashMap;

/// The registered compiler functions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CompilerFn {
    RegionHasShortcuts,
    IsGlitchEnabled,
    IsTrickEnabled,
    HadNightStart,
    HasAllNotesForSong,
    AtDampeTime,
    AtDay,
    AtNight,
    IsTrialSkipped,
    HasSoul,
    CanLiveDmg,
}

const REGISTRY: &[(&str, CompilerFn)] = &[
    ("region_has_shortcuts", CompilerFn::RegionHasShortcuts),
    ("is_glitch_enabled", CompilerFn::IsGlitchEnabled),
    ("is_trick_enabled", CompilerFn::IsTrickEnabled),
    ("had_night_start", CompilerFn::HadNightStart),
    ("has_all_notes_for_song", CompilerFn::HasAllNotesForSong),
    ("at_dampe_time", CompilerFn::AtDampeTime),
    ("at_day", CompilerFn::AtDay),
    ("at_night", CompilerFn::AtNight),
    ("is_trial_skipped", CompilerFn::IsTrialSkipped),
    ("has_soul", CompilerFn::HasSoul),
    ("can_live_dmg", CompilerFn::CanLiveDmg),
];

/// Symbols a compiler function may rewrite a call into.
#[derive(Clone, Copy)]
pub struct SupportSymbols {
    pub has_notes_for_song: SymbolId,
    pub needs_hearts_for_damage_multiplier: SymbolId,
    pub check_tod: SymbolId,
}

/// The installed registry: compiler-function symbols and their rewriters.
pub struct CompilerFns {
    by_symbol: FxHashMap<SymbolId, CompilerFn>,
    support: SupportSymbols,
}

impl CompilerFns {
    /// Declares every registered name as a compiler-function symbol.
    ///
    /// The support built-ins must already be declared; they come from the
    /// built-in definition table.
    pub fn install(
        symbols: &mut SymbolTable,
        support: SupportSymbols,
    ) -> Result<CompilerFns, DataError> {
        let mut by_symbol = FxHashMap::default();
        for (name, func) in REGISTRY {
            let id = symbols.declare(name, SymbolKind::CompilerFn)?;
            by_symbol.insert(id, *func);
        }
        Ok(CompilerFns { by_symbol, support })
    }

    /// The registered names, declaration order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        REGISTRY.iter().map(|(name, _)| *name)
    }

    pub fn get(&self, symbol: SymbolId) -> Option<CompilerFn> {
        self.by_symbol.get(&symbol).copied()
    }
}

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
            if env.symbols.symbol(id).kind != SymbolKind::CompilerFn {
                return rewrite_children(cx, node, &mut |n| run(env, n));
            }
            let Some(func) = env.compiler_fns.get(id) else {
                let name = env.symbols.symbol(id).name.clone();
                return Err(env.fail(OptimizeErrorKind::MissingCompilerFn { name }));
            };
            apply(env, func, args)
        }
        _ => rewrite_children(cx, node, &mut |n| run(env, n)),
    }
}

fn apply<'a>(
    env: &mut CompileEnv<'a>,
    func: CompilerFn,
    args: &'a [Node<'a>],
) -> Result<&'a Node<'a>, OptimizeError> {
    let cx = env.ast;
    match func {
        CompilerFn::RegionHasShortcuts => Ok(cx.boolean(false)),
        CompilerFn::IsTrialSkipped => Ok(cx.boolean(false)),
        CompilerFn::HasSoul => Ok(cx.boolean(true)),
        CompilerFn::HadNightStart => Ok(cx.boolean(env.settings.starting.time_of_day.is_night())),

        CompilerFn::IsGlitchEnabled => {
            let name = string_arg(env, "is_glitch_enabled", args)?;
            let enabled = env
                .settings
                .skills
                .glitches
                .get(env.interner.resolve(name))
                .copied()
                .unwrap_or(false);
            Ok(cx.boolean(enabled))
        }
        CompilerFn::IsTrickEnabled => {
            let name = string_arg(env, "is_trick_enabled", args)?;
            let enabled = env
                .settings
                .skills
                .tricks
                .get(env.interner.resolve(name))
                .copied()
                .unwrap_or(false);
            Ok(cx.boolean(enabled))
        }

        CompilerFn::HasAllNotesForSong => {
            if !env.settings.shuffling.ocarina_notes {
                return Ok(cx.boolean(true));
            }
            let target = cx.identifier(env.compiler_fns.support.has_notes_for_song);
            Ok(cx.invoke(target, args.to_vec()))
        }

        CompilerFn::AtDampeTime => check_tod(env, "dampe"),
        CompilerFn::AtDay => check_tod(env, "day"),
        CompilerFn::AtNight => check_tod(env, "night"),

        CompilerFn::CanLiveDmg => can_live_dmg(env, args),
    }
}

/// Time-of-day gates collapse to true unless entrance shuffling can move
/// the check; then they defer to the runtime `check_tod` built-in.
fn check_tod<'a>(env: &mut CompileEnv<'a>, tod: &str) -> Result<&'a Node<'a>, OptimizeError> {
    let cx = env.ast;
    if !env.settings.entrances.affected_tod_checks() {
        return Ok(cx.boolean(true));
    }
    let handle = env.interner.intern(tod);
    let target = cx.identifier(env.compiler_fns.support.check_tod);
    Ok(cx.invoke(target, vec![Node::String(handle)]))
}

/// `can_live_dmg(dmg, [with_fairy], [with_nayrus])` expands into an AnyOf of
/// the heart check, the fairy helper, and Nayru's Love, with disabled legs
/// substituted by false.
fn can_live_dmg<'a>(
    env: &mut CompileEnv<'a>,
    args: &'a [Node<'a>],
) -> Result<&'a Node<'a>, OptimizeError> {
    let cx = env.ast;
    if args.is_empty() || args.len() > 3 {
        return Err(env.fail(OptimizeErrorKind::CompilerFnArity {
            name: "can_live_dmg".into(),
            got: args.len(),
        }));
    }

    let fairy = lookup(env, "Fairy")?;
    let can_use = lookup(env, "can_use")?;
    let nayrus = lookup(env, "Nayrus_Love")?;

    let hearts_target = cx.identifier(env.compiler_fns.support.needs_hearts_for_damage_multiplier);
    let mut legs = vec![
        *cx.invoke(hearts_target, vec![args[0]]),
        *cx.invoke(cx.identifier(fairy), vec![]),
        *cx.invoke(cx.identifier(can_use), vec![Node::Identifier(nayrus)]),
    ];

    for (slot, arg) in legs.iter_mut().skip(1).zip(&args[1..]) {
        match arg {
            Node::Boolean(false) => *slot = Node::Boolean(false),
            Node::Boolean(true) => {}
            _ => {
                return Err(env.fail(OptimizeErrorKind::CompilerFnType {
                    name: "can_live_dmg".into(),
                    expected: "boolean",
                }))
            }
        }
    }

    Ok(cx.any_of(legs))
}

fn string_arg<'a>(
    env: &CompileEnv<'a>,
    name: &str,
    args: &'a [Node<'a>],
) -> Result<IStr, OptimizeError> {
    match args.first() {
        Some(Node::String(handle)) => Ok(*handle),
        _ => Err(env.fail(OptimizeErrorKind::CompilerFnType {
            name: name.to_string(),
            expected: "string",
        })),
    }
}

fn lookup(env: &CompileEnv<'_>, name: &str) -> Result<SymbolId, OptimizeError> {
    env.symbols
        .lookup(name)
        .map(|symbol| symbol.id)
        .ok_or_else(|| {
            env.fail(OptimizeErrorKind::MissingSymbol {
                name: name.to_string(),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstContext;
    use crate::settings::Settings;
    use entwine_base::Arena;

    fn invoke_of<'a>(env: &mut CompileEnv<'a>, name: &str, args: Vec<Node<'a>>) -> &'a Node<'a> {
        let id = env.symbols.lookup(name).unwrap().id;
        env.ast.invoke(env.ast.identifier(id), args)
    }

    #[test]
    fn tricks_fold_to_their_configured_value() {
        let arena = Arena::new();
        let mut settings = Settings::default();
        settings.skills.tricks.insert("HammerJump".into(), true);
        let mut env = CompileEnv::new(AstContext::new(&arena), settings).unwrap();
        let trick = env.interner.intern("HammerJump");
        let call = invoke_of(&mut env, "is_trick_enabled", vec![Node::String(trick)]);
        assert_eq!(run(&mut env, call).unwrap(), &Node::Boolean(true));
    }

    #[test]
    fn unconfigured_glitches_fold_to_false() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        let glitch = env.interner.intern("MegaFlip");
        let call = invoke_of(&mut env, "is_glitch_enabled", vec![Node::String(glitch)]);
        assert_eq!(run(&mut env, call).unwrap(), &Node::Boolean(false));
    }

    #[test]
    fn a_non_string_skill_argument_is_a_type_error() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        let call = invoke_of(&mut env, "is_trick_enabled", vec![Node::Number(4.0)]);
        let err = run(&mut env, call).unwrap_err();
        assert!(matches!(err.kind, OptimizeErrorKind::CompilerFnType { .. }));
    }

    #[test]
    fn night_start_reads_the_settings() {
        let arena = Arena::new();
        let mut settings = Settings::default();
        settings.starting.time_of_day = crate::settings::TimeOfDay::Night;
        let mut env = CompileEnv::new(AstContext::new(&arena), settings).unwrap();
        let call = invoke_of(&mut env, "had_night_start", vec![]);
        assert_eq!(run(&mut env, call).unwrap(), &Node::Boolean(true));
    }

    #[test]
    fn note_checks_vanish_unless_notes_are_shuffled() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        let song = env.symbols.declare("Eponas Song", SymbolKind::Token).unwrap();
        let call = invoke_of(
            &mut env,
            "has_all_notes_for_song",
            vec![Node::Identifier(song)],
        );
        assert_eq!(run(&mut env, call).unwrap(), &Node::Boolean(true));
    }

    #[test]
    fn note_checks_defer_to_the_runtime_when_shuffled() {
        let arena = Arena::new();
        let mut settings = Settings::default();
        settings.shuffling.ocarina_notes = true;
        let mut env = CompileEnv::new(AstContext::new(&arena), settings).unwrap();
        let song = env.symbols.declare("Eponas Song", SymbolKind::Token).unwrap();
        let call = invoke_of(
            &mut env,
            "has_all_notes_for_song",
            vec![Node::Identifier(song)],
        );
        let out = run(&mut env, call).unwrap();
        let runtime = env.compiler_fns.support.has_notes_for_song;
        assert_eq!(
            out,
            env.ast.invoke(
                env.ast.identifier(runtime),
                vec![Node::Identifier(song)]
            )
        );
    }

    #[test]
    fn tod_gates_fold_true_when_entrances_are_fixed() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        let call = invoke_of(&mut env, "at_day", vec![]);
        assert_eq!(run(&mut env, call).unwrap(), &Node::Boolean(true));
    }

    #[test]
    fn tod_gates_defer_to_check_tod_when_entrances_move() {
        let arena = Arena::new();
        let mut settings = Settings::default();
        settings.entrances.shuffle_overworld = true;
        let mut env = CompileEnv::new(AstContext::new(&arena), settings).unwrap();
        let call = invoke_of(&mut env, "at_dampe_time", vec![]);
        let out = run(&mut env, call).unwrap();
        let dampe = env.interner.lookup("dampe").unwrap();
        let check = env.compiler_fns.support.check_tod;
        assert_eq!(
            out,
            env.ast
                .invoke(env.ast.identifier(check), vec![Node::String(dampe)])
        );
    }

    fn declare_dmg_support(env: &mut CompileEnv<'_>) {
        let (can_use, params) = env.declare_helper("can_use", &["item"]).unwrap();
        let body = env.ast.identifier(params[0]);
        env.define_helper(can_use, params, body);
        let (fairy, none) = env.declare_helper("Fairy", &[]).unwrap();
        let body = env.ast.boolean(true);
        env.define_helper(fairy, none, body);
        env.symbols
            .declare("Nayrus_Love", SymbolKind::Token)
            .unwrap();
    }

    #[test]
    fn can_live_dmg_expands_to_three_legs() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        declare_dmg_support(&mut env);
        let call = invoke_of(&mut env, "can_live_dmg", vec![Node::Number(2.0)]);
        let out = run(&mut env, call).unwrap();
        match out {
            Node::AnyOf(legs) => assert_eq!(legs.len(), 3),
            other => panic!("expected AnyOf, got {}", other.kind_name()),
        }
    }

    #[test]
    fn can_live_dmg_disables_legs_with_false_flags() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        declare_dmg_support(&mut env);
        let call = invoke_of(
            &mut env,
            "can_live_dmg",
            vec![Node::Number(2.0), Node::Boolean(false), Node::Boolean(false)],
        );
        let out = run(&mut env, call).unwrap();
        match out {
            Node::AnyOf(legs) => {
                assert_eq!(legs[1], Node::Boolean(false));
                assert_eq!(legs[2], Node::Boolean(false));
                assert!(matches!(legs[0], Node::Invoke { .. }));
            }
            other => panic!("expected AnyOf, got {}", other.kind_name()),
        }
    }

    #[test]
    fn can_live_dmg_rejects_too_many_arguments() {
        let arena = Arena::new();
        let mut env = CompileEnv::new(AstContext::new(&arena), Settings::default()).unwrap();
        declare_dmg_support(&mut env);
        let call = invoke_of(
            &mut env,
            "can_live_dmg",
            vec![
                Node::Number(2.0),
                Node::Boolean(true),
                Node::Boolean(true),
                Node::Boolean(true),
            ],
        );
        let err = run(&mut env, call).unwrap_err();
        assert!(matches!(err.kind, OptimizeErrorKind::CompilerFnArity { .. }));
    }
}
