//! Typed handles for building worlds.
//!
//! Thin wrappers over the store that keep relational invariants intact:
//! fixing a token at a placement writes both the HoldsToken and HeldAt
//! directions in one step, and connecting nodes stamps the edge with its
//! kind and display name.

use crate::store::{Connection, EdgeKind, Entity, Store};
use entwine_logic::error::DataError;
use entwine_logic::symbols::SymbolTable;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Region(Entity);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Placement(Entity);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token(Entity);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Edge(Entity);

impl Region {
    pub fn entity(self) -> Entity {
        self.0
    }
}

impl Placement {
    pub fn entity(self) -> Entity {
        self.0
    }
}

impl Token {
    pub fn entity(self) -> Entity {
        self.0
    }
}

impl Edge {
    pub fn entity(self) -> Entity {
        self.0
    }
}

impl Store {
    /// Gets or creates a region by name.
    pub fn region(&mut self, name: &str) -> Region {
        let entity = self.spawn(name);
        self.mark_region(entity);
        Region(entity)
    }

    /// Gets or creates a placement by name.
    pub fn placement(&mut self, name: &str) -> Placement {
        let entity = self.spawn(name);
        self.mark_placement(entity);
        Placement(entity)
    }

    /// Gets or creates a token by name.
    pub fn token(&mut self, name: &str) -> Token {
        let entity = self.spawn(name);
        self.mark_token(entity);
        Token(entity)
    }

    /// A transit edge between two regions.
    pub fn connect(&mut self, from: Region, to: Region) -> Edge {
        self.connect_kind(from.0, to.0, EdgeKind::Transit)
    }

    /// A placement edge from a region to one of its placements.
    pub fn place(&mut self, from: Region, to: Placement) -> Edge {
        self.connect_kind(from.0, to.0, EdgeKind::Placement)
    }

    fn connect_kind(&mut self, from: Entity, to: Entity, kind: EdgeKind) -> Edge {
        let entity = self.edge(Connection { from, to });
        self.set_edge_kind(entity, kind);
        Edge(entity)
    }

    /// Fixes `token` at `place`: the placement holds the token, the token
    /// knows where it is held, and both carry the Fixed marker.
    pub fn fix(&mut self, place: Placement, token: Token) {
        self.set_holds_token(place.0, token.0);
        self.set_held_at(token.0, place.0);
        self.set_fixed(place.0);
        self.set_fixed(token.0);
    }

    /// Puts `token` at `place` without fixing it there.
    pub fn hold(&mut self, place: Placement, token: Token) {
        self.set_holds_token(place.0, token.0);
        self.set_held_at(token.0, place.0);
    }

    /// Records the vanilla placement of a token.
    pub fn default_token(&mut self, place: Placement, token: Token) {
        self.set_default_placement(token.0, place.0);
    }

    /// Gives every token whose display name is not identifier-shaped a
    /// name-safe alias, in both the symbol table and the store.
    ///
    /// Rules say `Kokiri_Sword`; the store says "Kokiri Sword".
    pub fn alias_tokens(&mut self, symbols: &mut SymbolTable) -> Result<(), DataError> {
        let tokens: Vec<Entity> = self.tokens().iter().map(Entity::new).collect();
        for entity in tokens {
            let name = self.name(entity).to_string();
            let safe = name_safe(&name);
            if safe == name {
                continue;
            }
            let Some(symbol) = symbols.lookup(&name) else {
                continue;
            };
            symbols.alias(symbol.id, &safe)?;
            self.set_alias(entity, &safe);
        }
        Ok(())
    }
}

/// Spaces become underscores; quoting and bracket characters vanish.
fn name_safe(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\'' | '(' | ')' | '[' | ']' | '-'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}
