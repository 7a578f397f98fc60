//! Compile-side end-to-end scenarios: source tree in, module out.

mod common;

use common::{declare_token, env_with, has_rule};
use entwine_base::{Arena, CancelToken};
use entwine_logic::ast::{AstContext, Node};
use entwine_logic::code::{Bytecode, Op};
use entwine_logic::error::OptimizeErrorKind;
use entwine_logic::optimize::conngen::NoConnections;
use entwine_logic::settings::Settings;
use entwine_world::{compile_rules, ExplorableWorld, Search, Store};

#[test]
fn a_trivial_edge_compiles_and_explores() {
    // Root -> Start gated by "true"
    let arena = Arena::new();
    let mut env = env_with(AstContext::new(&arena), Settings::default());
    let mut store = Store::new();
    let root = store.region("Root");
    let start = store.region("Start");
    store.mark_root(root.entity());
    let edge = store.connect(root, start);

    let rules = vec![(edge.entity(), entwine_logic::ast::TRUE)];
    let modules = compile_rules(&mut store, &mut env, rules, &CancelToken::new()).unwrap();
    assert_eq!(modules[&edge.entity()].tape, vec![u8::from(Op::PushT)]);

    let world = ExplorableWorld::assemble(&store, modules).unwrap();
    let table = env.objects.freeze();
    let funcs = entwine_logic::vm::BuiltInFunctions::new(Vec::new());
    let vm = entwine_logic::vm::Vm {
        objects: &table,
        funcs: &funcs,
        chk_qty: None,
    };
    let mut search = Search::from_roots(&world);
    let sphere = search.explore(&vm);
    assert!(sphere.nodes.reached.contains(start.entity().index()));
}

#[test]
fn a_quantity_check_compiles_to_one_chk_qty() {
    let arena = Arena::new();
    let mut env = env_with(AstContext::new(&arena), Settings::default());
    let mut store = Store::new();
    let (sword, _) = declare_token(&mut env, &mut store, "Kokiri_Sword");

    let rule = has_rule(&mut env, sword, 1.0);
    let module = env.compile_rule(&mut NoConnections, rule).unwrap();

    assert_eq!(module.tape.len(), 4);
    assert_eq!(module.tape[0], u8::from(Op::ChkQty));
    assert_eq!(module.tape[3], 1);
    assert_eq!(module.consts.len(), 1);
    assert_eq!(
        module.names.get(&module.consts[0]).map(String::as_str),
        Some("Kokiri_Sword")
    );
}

#[test]
fn folding_strips_dominated_branches() {
    // true and (false or has(T, 1))  ==>  a single CHK_QTY
    let arena = Arena::new();
    let mut env = env_with(AstContext::new(&arena), Settings::default());
    let mut store = Store::new();
    let (token, _) = declare_token(&mut env, &mut store, "Slingshot");

    let check = has_rule(&mut env, token, 1.0);
    let inner = env.ast.any_of(vec![Node::Boolean(false), *check]);
    let rule = env.ast.every(vec![Node::Boolean(true), *inner]);
    let module = env.compile_rule(&mut NoConnections, rule).unwrap();

    assert_eq!(module.tape[0], u8::from(Op::ChkQty));
    assert_eq!(module.tape.len(), 4);
    let forbidden = [u8::from(Op::NeedAll), u8::from(Op::NeedAny)];
    assert!(module.tape.iter().all(|byte| !forbidden.contains(byte)));
}

#[test]
fn trick_checks_fold_before_codegen() {
    let arena = Arena::new();
    let mut settings = Settings::default();
    settings.skills.tricks.insert("HammerJump".into(), true);
    let mut env = env_with(AstContext::new(&arena), settings);

    let trick = env.interner.intern("HammerJump");
    let target = env
        .ast
        .identifier(env.symbols.lookup("is_trick_enabled").unwrap().id);
    let rule = env.ast.invoke(target, vec![Node::String(trick)]);
    let module = env.compile_rule(&mut NoConnections, rule).unwrap();
    assert_eq!(module.tape, vec![u8::from(Op::PushT)]);
}

#[test]
fn helpers_inline_and_fold_away() {
    // here(x) := x and true ; here(has(T, 1))  ==>  has(T, 1)
    let arena = Arena::new();
    let mut env = env_with(AstContext::new(&arena), Settings::default());
    let mut store = Store::new();
    let (token, _) = declare_token(&mut env, &mut store, "Boomerang");

    let (here, params) = env.declare_helper("here", &["x"]).unwrap();
    let body = env
        .ast
        .every(vec![Node::Identifier(params[0]), Node::Boolean(true)]);
    env.define_helper(here, params, body);

    let check = has_rule(&mut env, token, 1.0);
    let rule = env.ast.invoke(env.ast.identifier(here), vec![*check]);
    let module = env.compile_rule(&mut NoConnections, rule).unwrap();
    assert_eq!(module.tape[0], u8::from(Op::ChkQty));
    assert_eq!(module.tape.len(), 4);
}

#[test]
fn recursive_helpers_are_rejected() {
    let arena = Arena::new();
    let mut env = env_with(AstContext::new(&arena), Settings::default());

    let (bad, params) = env.declare_helper("bad", &["x"]).unwrap();
    let body = env.ast.invoke(
        env.ast.identifier(bad),
        vec![Node::Identifier(params[0])],
    );
    env.define_helper(bad, params, body);

    let rule = env
        .ast
        .invoke(env.ast.identifier(bad), vec![Node::Boolean(true)]);
    let err = env
        .optimize(&mut NoConnections, rule)
        .unwrap_err();
    assert!(matches!(err.kind, OptimizeErrorKind::RecursiveHelper { .. }));
}

#[test]
fn repeated_at_rules_share_one_generated_token() {
    // two edges whose rules both say at("Field", has(A, 1))
    let arena = Arena::new();
    let mut env = env_with(AstContext::new(&arena), Settings::default());
    let mut store = Store::new();
    let (a, _) = declare_token(&mut env, &mut store, "A");

    let root = store.region("Root");
    let field = store.region("Field");
    store.mark_root(root.entity());
    let left = store.connect(root, field);
    let right = store.connect(field, root);

    let at = env.symbols.lookup("at").unwrap().id;
    let region = env.interner.intern("Field");
    let check_one = *has_rule(&mut env, a, 1.0);
    let rule_left = env.ast.invoke(
        env.ast.identifier(at),
        vec![Node::String(region), check_one],
    );
    let check_two = *has_rule(&mut env, a, 1.0);
    let rule_right = env.ast.invoke(
        env.ast.identifier(at),
        vec![Node::String(region), check_two],
    );

    let rules = vec![(left.entity(), rule_left), (right.entity(), rule_right)];
    let modules = compile_rules(&mut store, &mut env, rules, &CancelToken::new()).unwrap();

    // one generated token, one generated edge, three modules in total
    assert_eq!(modules.len(), 3);
    let generated: Vec<_> = store
        .edges_in_order()
        .iter()
        .filter(|edge| store.name(**edge).contains("Place#Field#"))
        .collect();
    assert_eq!(generated.len(), 1);

    // both original edges compile to the same quantity check on the shared
    // token
    assert_eq!(
        modules[&left.entity()].tape,
        modules[&right.entity()].tape
    );
    assert_eq!(modules[&left.entity()].tape[0], u8::from(Op::ChkQty));
}

#[test]
fn modules_survive_persistence() {
    let arena = Arena::new();
    let mut env = env_with(AstContext::new(&arena), Settings::default());
    let mut store = Store::new();
    let (token, _) = declare_token(&mut env, &mut store, "Lens of Truth");

    let check = has_rule(&mut env, token, 1.0);
    let bottle = env.symbols.lookup("has_bottle").unwrap().id;
    let call = env.ast.invoke(env.ast.identifier(bottle), vec![]);
    let rule = env.ast.every(vec![*check, *call]);
    let module = env.compile_rule(&mut NoConnections, rule).unwrap();

    let decoded = Bytecode::from_bytes(&module.to_bytes()).unwrap();
    assert_eq!(decoded, module);

    let table = env.objects.freeze();
    let listing = decoded.disassemble(&table);
    assert!(listing.contains("CHK_QTY"));
    assert!(listing.contains("NEED_ALL"));
    assert!(listing.contains("Lens of Truth"));
}
