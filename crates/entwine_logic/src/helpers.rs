//! Scripted helper functions.
//!
//! Helpers are small reusable expressions declared in the world data with
//! named parameters. They never reach the VM: the inlining pass substitutes
//! their bodies into every call site during optimization.

use crate::ast::Node;
use crate::symbols::SymbolId;
use rustc_hash::FxHashMap;

/// One declared helper: its parameter symbols and parsed body.
pub struct Helper<'a> {
    pub name: String,
    pub params: Vec<SymbolId>,
    pub body: &'a Node<'a>,
}

/// Helpers keyed by their function symbol.
#[derive(Default)]
pub struct Helpers<'a> {
    by_symbol: FxHashMap<SymbolId, Helper<'a>>,
}

impl<'a> Helpers<'a> {
    pub fn new() -> Self {
        Helpers::default()
    }

    pub fn insert(&mut self, symbol: SymbolId, helper: Helper<'a>) {
        self.by_symbol.insert(symbol, helper);
    }

    pub fn get(&self, symbol: SymbolId) -> Option<&Helper<'a>> {
        self.by_symbol.get(&symbol)
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}
