//! Sphere-by-sphere reachability.
//!
//! One [`Search::explore`] call produces a sphere: everything newly
//! reachable given the current inventory. Pending nodes are visited in
//! ascending id order and successors in edge-creation order, so identical
//! inputs always yield identical spheres.
//!
//! Nodes reached mid-sphere join the working set immediately; a chain of
//! open edges resolves in a single sphere.

use crate::graph::ExplorableWorld;
use entwine_base::Bitset;
use entwine_logic::error::RuntimeError;
use entwine_logic::vm::Vm;

#[derive(Clone, Default, Debug)]
pub struct NodeSet {
    pub reached: Bitset,
    pub pended: Bitset,
}

impl NodeSet {
    pub fn all(&self) -> Bitset {
        self.reached.union(&self.pended)
    }
}

#[derive(Clone, Default, Debug)]
pub struct EdgeSet {
    pub crossed: Bitset,
    pub pended: Bitset,
}

impl EdgeSet {
    pub fn all(&self) -> Bitset {
        self.crossed.union(&self.pended)
    }
}

/// The delta produced by one reachability pass.
#[derive(Default, Debug)]
pub struct Sphere {
    pub nodes: NodeSet,
    pub edges: EdgeSet,
    /// Set when an edge evaluation failed; the search is dead.
    pub error: Option<RuntimeError>,
    /// Set when the driver abandoned the run mid-search.
    pub cancelled: bool,
}

/// Reachability state for one age's run.
pub struct Search<'w> {
    world: &'w ExplorableWorld,
    visited: Bitset,
    pended: Bitset,
}

impl<'w> Search<'w> {
    /// A fresh search; the world's roots are pending.
    pub fn from_roots(world: &'w ExplorableWorld) -> Search<'w> {
        Search {
            world,
            visited: Bitset::new(),
            pended: world.roots().clone(),
        }
    }

    pub fn visited(&self) -> &Bitset {
        &self.visited
    }

    /// Runs one pass over the pending frontier.
    ///
    /// Nodes that still have uncrossable edges are re-pended for the next
    /// sphere; the caller grows the inventory between spheres.
    pub fn explore(&mut self, vm: &Vm<'_>) -> Sphere {
        let mut sphere = Sphere::default();

        while let Some(current) = self.pended.pop_first() {
            let mut blocked = false;
            for &neighbor in self.world.successors(current) {
                if self.visited.contains(neighbor) {
                    continue;
                }
                let Some(edge) = self.world.edge(current, neighbor) else {
                    continue;
                };
                match vm.execute(&edge.rule) {
                    Ok(answer) if vm.truthy(answer) => {
                        self.visited.insert(neighbor);
                        self.pended.insert(neighbor);
                        sphere.nodes.reached.insert(neighbor);
                        sphere.edges.crossed.insert(edge.entity.index());
                    }
                    Ok(_) => {
                        sphere.edges.pended.insert(edge.entity.index());
                        blocked = true;
                    }
                    Err(error) => {
                        sphere.error = Some(error);
                        self.pended.insert(current);
                        return sphere;
                    }
                }
            }
            if blocked {
                sphere.nodes.pended.insert(current);
            }
        }

        self.pended = sphere.nodes.pended.clone();
        sphere
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use entwine_logic::code::{emit, Bytecode, Op};
    use entwine_logic::objects::Builder;
    use entwine_logic::vm::BuiltInFunctions;
    use rustc_hash::FxHashMap;

    fn rule(op: Op) -> Bytecode {
        let mut module = Bytecode::default();
        emit(&mut module.tape, op, &[]);
        module
    }

    /// Root -> A (true), A -> B (false), Root -> C (true)
    fn world() -> (Store, ExplorableWorld, Vec<u32>) {
        let mut store = Store::new();
        let root = store.region("Root");
        let a = store.region("A");
        let b = store.region("B");
        let c = store.region("C");
        store.mark_root(root.entity());
        let mut compiled = FxHashMap::default();
        compiled.insert(store.connect(root, a).entity(), rule(Op::PushT));
        compiled.insert(store.connect(a, b).entity(), rule(Op::PushF));
        compiled.insert(store.connect(root, c).entity(), rule(Op::PushT));
        let ids = vec![
            root.entity().index(),
            a.entity().index(),
            b.entity().index(),
            c.entity().index(),
        ];
        let world = ExplorableWorld::assemble(&store, compiled).unwrap();
        (store, world, ids)
    }

    fn vm<'r>(
        table: &'r entwine_logic::objects::Table,
        funcs: &'r BuiltInFunctions<'r>,
    ) -> Vm<'r> {
        Vm {
            objects: table,
            funcs,
            chk_qty: None,
        }
    }

    #[test]
    fn open_edges_are_crossed_in_one_sphere() {
        let (_store, world, ids) = world();
        let table = Builder::new().freeze();
        let funcs = BuiltInFunctions::new(Vec::new());
        let vm = vm(&table, &funcs);
        let mut search = Search::from_roots(&world);

        let sphere = search.explore(&vm);
        let reached: Vec<u32> = sphere.nodes.reached.iter().collect();
        assert_eq!(reached, vec![ids[1], ids[3]]);
        // A -> B stays pended, so A carries over
        let pended: Vec<u32> = sphere.nodes.pended.iter().collect();
        assert_eq!(pended, vec![ids[1]]);
        assert_eq!(sphere.edges.crossed.len(), 2);
        assert_eq!(sphere.edges.pended.len(), 1);
    }

    #[test]
    fn a_closed_world_reaches_a_fixed_point() {
        let (_store, world, _) = world();
        let table = Builder::new().freeze();
        let funcs = BuiltInFunctions::new(Vec::new());
        let vm = vm(&table, &funcs);
        let mut search = Search::from_roots(&world);

        search.explore(&vm);
        let second = search.explore(&vm);
        assert!(second.nodes.reached.is_empty());
        let third = search.explore(&vm);
        assert!(third.nodes.reached.is_empty());
    }

    #[test]
    fn visited_nodes_are_never_revisited() {
        let (_store, world, ids) = world();
        let table = Builder::new().freeze();
        let funcs = BuiltInFunctions::new(Vec::new());
        let vm = vm(&table, &funcs);
        let mut search = Search::from_roots(&world);

        let first = search.explore(&vm);
        let crossed_first = first.edges.crossed.clone();
        let second = search.explore(&vm);
        for edge in &crossed_first {
            assert!(!second.edges.crossed.contains(edge));
        }
        assert!(search.visited().contains(ids[1]));
        assert!(search.visited().contains(ids[3]));
    }

    #[test]
    fn a_failing_rule_aborts_the_sphere() {
        let mut store = Store::new();
        let root = store.region("Root");
        let a = store.region("A");
        store.mark_root(root.entity());
        let mut compiled = FxHashMap::default();
        compiled.insert(store.connect(root, a).entity(), rule(Op::Err));
        let world = ExplorableWorld::assemble(&store, compiled).unwrap();

        let table = Builder::new().freeze();
        let funcs = BuiltInFunctions::new(Vec::new());
        let vm = vm(&table, &funcs);
        let mut search = Search::from_roots(&world);
        let sphere = search.explore(&vm);
        assert!(matches!(sphere.error, Some(RuntimeError::Halted)));
        assert!(sphere.nodes.reached.is_empty());
    }
}
