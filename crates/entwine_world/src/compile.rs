//! The batch compile driver.
//!
//! Takes every edge with a parsed rule, optimizes and compiles it, and
//! keeps going until the worklist is dry — connection generation appends
//! new edges mid-batch and those compile too. Failures are collected per
//! edge; a non-empty report is terminal because exploration must never run
//! against a partially compiled rule set.

use crate::store::{Entity, Store};
use entwine_base::CancelToken;
use entwine_logic::ast::Node;
use entwine_logic::code::Bytecode;
use entwine_logic::error::{DataError, Diagnostic};
use entwine_logic::objects::{Builder, Object, Ptr32, PtrTag};
use entwine_logic::optimize::{self, ConnectionScribe};
use entwine_logic::symbols::{SymbolId, SymbolKind, SymbolTable};
use entwine_logic::CompileEnv;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::fmt;

/// Why a compile batch did not produce a full rule set.
#[derive(Debug)]
pub enum BatchError {
    /// The cancellation token fired between rules.
    Cancelled,
    /// One or more rules failed; the report covers every failure.
    Failed(Vec<Diagnostic>),
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::Cancelled => write!(f, "compile batch cancelled"),
            BatchError::Failed(diagnostics) => {
                write!(f, "{} rules failed to compile", diagnostics.len())
            }
        }
    }
}

impl std::error::Error for BatchError {}

/// The world-side connection generator.
///
/// Synthesises `Token#<region>#<hash>` and `Place#<region>#<hash>`, fixes
/// the token at the placement, marks it an event, binds its symbol and
/// pointer, and queues the new edge's rule for the running batch.
pub struct StoreScribe<'s, 'a> {
    store: &'s mut Store,
    pub pending: Vec<(Entity, &'a Node<'a>)>,
}

impl<'s, 'a> StoreScribe<'s, 'a> {
    pub fn new(store: &'s mut Store) -> Self {
        StoreScribe {
            store,
            pending: Vec::new(),
        }
    }
}

impl<'a> ConnectionScribe<'a> for StoreScribe<'_, 'a> {
    fn add_connection_to(
        &mut self,
        region: &str,
        rule: &'a Node<'a>,
        hash: u64,
        symbols: &mut SymbolTable,
        objects: &mut Builder,
    ) -> Result<SymbolId, DataError> {
        let token_name = format!("Token#{region}#{hash:016x}");
        if let Some(existing) = symbols.lookup(&token_name) {
            return Ok(existing.id);
        }

        let token = self.store.token(&token_name);
        let place = self
            .store
            .placement(&format!("Place#{region}#{hash:016x}"));
        self.store.mark_event(token.entity());
        self.store.fix(place, token);

        let origin = self.store.region(region);
        let edge = self.store.place(origin, place);

        let ptr = Object::pack_ptr(Ptr32 {
            tag: PtrTag::Token,
            addr: token.entity().index(),
        });
        self.store.set_ptr(token.entity(), ptr);

        let id = symbols.declare(&token_name, SymbolKind::Token)?;
        let symbol = symbols.symbol(id).clone();
        objects.associate_symbol(&symbol, ptr)?;

        self.pending.push((edge.entity(), rule));
        Ok(id)
    }
}

/// Compiles every queued rule, plus whatever connection generation adds.
///
/// On success every edge in the input (and every generated edge) has a
/// module in the returned map.
pub fn compile_rules<'a>(
    store: &mut Store,
    env: &mut CompileEnv<'a>,
    rules: Vec<(Entity, &'a Node<'a>)>,
    cancel: &CancelToken,
) -> Result<FxHashMap<Entity, Bytecode>, BatchError> {
    let mut queue: VecDeque<(Entity, &'a Node<'a>)> = rules.into();
    let mut modules = FxHashMap::default();
    let mut diagnostics = Vec::new();

    while let Some((edge, rule)) = queue.pop_front() {
        if cancel.is_cancelled() {
            return Err(BatchError::Cancelled);
        }

        let (from, to) = match store.endpoints(edge) {
            Some(connection) => (
                store.name(connection.from).to_string(),
                store.name(connection.to).to_string(),
            ),
            None => (String::new(), store.name(edge).to_string()),
        };
        optimize::set_current_location(&mut env.context, &from);

        let mut scribe = StoreScribe::new(store);
        let result = env.compile_rule(&mut scribe, rule);
        let generated = scribe.pending;
        queue.extend(generated);

        match result {
            Ok(module) => {
                log::debug!("compiled connection rule from {from:?} to {to:?}");
                modules.insert(edge, module);
            }
            Err(error) => diagnostics.push(Diagnostic::new(from, to, &error)),
        }
    }

    if diagnostics.is_empty() {
        Ok(modules)
    } else {
        Err(BatchError::Failed(diagnostics))
    }
}
