//! Names to typed symbols.
//!
//! Every name a rule can mention — tokens, regions, transits, settings,
//! functions of all flavors — is declared here once and referred to by a
//! dense [`SymbolId`] afterwards. Aliases layer additional lookup keys over
//! the primary map so tokens can also be addressed by a name-safe spelling.

use crate::error::DataError;
use rustc_hash::FxHashMap;

/// Dense handle into the symbol table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a declared name refers to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SymbolKind {
    /// Placeholder for bulk name-imports that are kind-tagged later.
    Unknown,
    Token,
    Region,
    Transit,
    Setting,
    Global,
    Local,
    BuiltInFn,
    CompilerFn,
    ScriptedFn,
    Function,
}

impl SymbolKind {
    pub fn name(self) -> &'static str {
        match self {
            SymbolKind::Unknown => "unknown",
            SymbolKind::Token => "token",
            SymbolKind::Region => "region",
            SymbolKind::Transit => "transit",
            SymbolKind::Setting => "setting",
            SymbolKind::Global => "global",
            SymbolKind::Local => "local",
            SymbolKind::BuiltInFn => "built-in function",
            SymbolKind::CompilerFn => "compiler function",
            SymbolKind::ScriptedFn => "scripted function",
            SymbolKind::Function => "function",
        }
    }
}

/// A declared symbol.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub id: SymbolId,
}

/// The table of declared symbols. Indices are stable for its lifetime.
#[derive(Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: FxHashMap<String, SymbolId>,
    aliases: FxHashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Declares `name` with `kind`, or returns the existing symbol.
    ///
    /// Redeclaring with the same kind is idempotent. A symbol declared as
    /// [`SymbolKind::Unknown`] is promoted in place when redeclared with a
    /// concrete kind; any other kind change is a [`DataError`].
    pub fn declare(&mut self, name: &str, kind: SymbolKind) -> Result<SymbolId, DataError> {
        if let Some(&id) = self.by_name.get(name) {
            let existing = &mut self.symbols[id.index()];
            if existing.kind == kind || kind == SymbolKind::Unknown {
                return Ok(id);
            }
            if existing.kind == SymbolKind::Unknown {
                existing.kind = kind;
                return Ok(id);
            }
            return Err(DataError::KindMismatch {
                name: name.to_string(),
                have: existing.kind.name(),
                want: kind.name(),
            });
        }

        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: name.to_string(),
            kind,
            id,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Declares every name in `names` with the same kind.
    pub fn declare_many<I, S>(&mut self, kind: SymbolKind, names: I) -> Result<(), DataError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.declare(name.as_ref(), kind)?;
        }
        Ok(())
    }

    /// Adds an additional lookup key for an existing symbol.
    ///
    /// Fails when the alias already resolves to a different symbol, either
    /// as a primary name or as an earlier alias.
    pub fn alias(&mut self, id: SymbolId, alias: &str) -> Result<(), DataError> {
        let resolved = self
            .by_name
            .get(alias)
            .or_else(|| self.aliases.get(alias))
            .copied();
        match resolved {
            Some(existing) if existing != id => Err(DataError::AliasCollision {
                alias: alias.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.aliases.insert(alias.to_string(), id);
                Ok(())
            }
        }
    }

    /// Resolves a primary name or alias.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.by_name
            .get(name)
            .or_else(|| self.aliases.get(name))
            .map(|id| &self.symbols[id.index()])
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
