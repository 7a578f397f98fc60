//! The explorable world graph.
//!
//! Assembled once after the compile batch: adjacency over entity ids plus
//! the compiled rule for every edge. Successor order is the creation order
//! of outgoing edges, which together with ascending node iteration makes
//! exploration deterministic.

use crate::store::{EdgeKind, Entity, Store};
use entwine_base::Bitset;
use entwine_logic::code::Bytecode;
use entwine_logic::error::DataError;
use rustc_hash::FxHashMap;

/// One traversable edge with its compiled rule.
pub struct EdgeRecord {
    pub entity: Entity,
    pub kind: EdgeKind,
    pub rule: Bytecode,
    pub name: String,
}

pub struct ExplorableWorld {
    successors: FxHashMap<u32, Vec<u32>>,
    edges: FxHashMap<(u32, u32), EdgeRecord>,
    roots: Bitset,
}

impl ExplorableWorld {
    /// Builds the graph from the store's edges and their compiled rules.
    ///
    /// Fails when the store has no roots or any edge is missing its module;
    /// exploration never runs against a partially compiled world.
    pub fn assemble(
        store: &Store,
        mut compiled: FxHashMap<Entity, Bytecode>,
    ) -> Result<ExplorableWorld, DataError> {
        let roots = store.roots().clone();
        if roots.is_empty() {
            return Err(DataError::NoRoots);
        }

        let mut successors: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        let mut edges = FxHashMap::default();
        for &edge in store.edges_in_order() {
            let name = store.name(edge).to_string();
            let Some(connection) = store.endpoints(edge) else {
                return Err(DataError::Malformed(format!("{name} has no endpoints")));
            };
            let Some(kind) = store.edge_kind(edge) else {
                return Err(DataError::Malformed(format!("{name} has no kind")));
            };
            let rule = compiled
                .remove(&edge)
                .ok_or(DataError::MissingRule { edge: name.clone() })?;

            successors
                .entry(connection.from.index())
                .or_default()
                .push(connection.to.index());
            edges.insert(
                (connection.from.index(), connection.to.index()),
                EdgeRecord {
                    entity: edge,
                    kind,
                    rule,
                    name,
                },
            );
        }

        Ok(ExplorableWorld {
            successors,
            edges,
            roots,
        })
    }

    /// Outgoing neighbors in edge-creation order.
    pub fn successors(&self, node: u32) -> &[u32] {
        self.successors
            .get(&node)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    pub fn edge(&self, from: u32, to: u32) -> Option<&EdgeRecord> {
        self.edges.get(&(from, to))
    }

    pub fn roots(&self) -> &Bitset {
        &self.roots
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
