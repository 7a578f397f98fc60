//! Shared fixtures for the end-to-end suites.

use entwine_logic::ast::{AstContext, Node};
use entwine_logic::objects::{Object, Ptr32, PtrTag};
use entwine_logic::settings::Settings;
use entwine_logic::symbols::{SymbolId, SymbolKind};
use entwine_logic::CompileEnv;
use entwine_world::{Entity, Store};

pub fn env_with<'a>(cx: AstContext<'a>, settings: Settings) -> CompileEnv<'a> {
    CompileEnv::new(cx, settings).expect("standard vocabulary declares")
}

/// The tokens every pocket requires.
pub fn pocket_tokens(store: &mut Store) {
    store.token("Piece of Heart");
    store.token("Scarecrow Song");
}

/// Declares a token in both worlds: store entity, symbol, and bound pointer.
pub fn declare_token(
    env: &mut CompileEnv<'_>,
    store: &mut Store,
    name: &str,
) -> (SymbolId, Entity) {
    let entity = store.token(name).entity();
    let id = env
        .symbols
        .declare(name, SymbolKind::Token)
        .expect("token declares");
    let symbol = env.symbols.symbol(id).clone();
    let ptr = Object::pack_ptr(Ptr32 {
        tag: PtrTag::Token,
        addr: entity.index(),
    });
    env.objects
        .associate_symbol(&symbol, ptr)
        .expect("token binds once");
    store.set_ptr(entity, ptr);
    (id, entity)
}

/// `has(token, qty)`
pub fn has_rule<'a>(env: &mut CompileEnv<'a>, token: SymbolId, qty: f64) -> &'a Node<'a> {
    let has = env.symbols.lookup("has").expect("has is standard").id;
    let target = env.ast.identifier(has);
    env.ast
        .invoke(target, vec![Node::Identifier(token), Node::Number(qty)])
}
