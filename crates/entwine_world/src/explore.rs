//! The exploration driver.
//!
//! Runs spheres to a fixed point, collecting tokens fixed at newly reached
//! placements into the inventory between spheres so later spheres can cross
//! edges the earlier ones could not. The cancellation token is honoured at
//! sphere boundaries. Two ages share one inventory; the driver runs the
//! starting age first.

use crate::builtins::{bind, Age, Bindings};
use crate::graph::ExplorableWorld;
use crate::inventory::Inventory;
use crate::pocket::Pocket;
use crate::search::{Search, Sphere};
use crate::store::{Entity, Store};
use entwine_base::{Bitset, CancelToken};
use entwine_logic::error::PipelineError;
use entwine_logic::objects::Table;
use entwine_logic::settings::{Settings, StartingAge};
use entwine_logic::vm::Vm;

/// Everything one run of spheres needs, minus the mutable inventory.
pub struct Exploration<'w> {
    pub world: &'w ExplorableWorld,
    pub store: &'w Store,
    pub objects: &'w Table,
    pub settings: &'w Settings,
    /// The run's resolved starting age; callers resolve `Random` up front.
    pub starting_age: Age,
    pub cancel: CancelToken,
}

/// All spheres produced by one age's search.
#[derive(Default)]
pub struct ExplorationResults {
    pub spheres: Vec<Sphere>,
    pub cancelled: bool,
}

impl ExplorationResults {
    /// True when the run ended at a fixed point rather than an error or
    /// cancellation.
    pub fn completed(&self) -> bool {
        !self.cancelled && self.spheres.iter().all(|sphere| sphere.error.is_none())
    }

    /// Union of every sphere's reached nodes.
    pub fn reached(&self) -> Bitset {
        let mut all = Bitset::new();
        for sphere in &self.spheres {
            all = all.union(&sphere.nodes.reached);
        }
        all
    }
}

impl<'w> Exploration<'w> {
    /// Explores as one age until no sphere reaches anything new.
    ///
    /// `looted` tracks placements whose fixed token was already handed
    /// over; a second search sharing the inventory must reuse it or the
    /// same chest pays out twice.
    pub fn run(
        &self,
        age: Age,
        inventory: &mut Inventory,
        looted: &mut Bitset,
    ) -> Result<ExplorationResults, PipelineError> {
        let pocket = Pocket::new(self.store)?;
        let mut search = Search::from_roots(self.world);
        let mut results = ExplorationResults::default();

        loop {
            if self.cancel.is_cancelled() {
                results.cancelled = true;
                return Ok(results);
            }

            let sphere = {
                let bindings = Bindings {
                    age,
                    starting_age: self.starting_age,
                    notes_shuffled: self.settings.shuffling.ocarina_notes,
                };
                let (funcs, chk_qty) = bind(self.objects, &pocket, inventory, bindings)?;
                let vm = Vm {
                    objects: self.objects,
                    funcs: &funcs,
                    chk_qty: Some(&chk_qty),
                };
                search.explore(&vm)
            };

            let done = sphere.nodes.reached.is_empty() || sphere.error.is_some();
            collect_fixed(self.store, &sphere, inventory, looted);
            results.spheres.push(sphere);
            if done {
                return Ok(results);
            }
        }
    }

    /// One search per age, starting age first, sharing the inventory and
    /// the looted set.
    pub fn run_both_ages(
        &self,
        inventory: &mut Inventory,
    ) -> Result<(ExplorationResults, ExplorationResults), PipelineError> {
        let second_age = match self.starting_age {
            Age::Child => Age::Adult,
            Age::Adult => Age::Child,
        };
        let mut looted = Bitset::new();
        let first = self.run(self.starting_age, inventory, &mut looted)?;
        let second = self.run(second_age, inventory, &mut looted)?;
        Ok((first, second))
    }
}

/// Resolves the configured starting age; `Random` needs a roll the caller
/// provides.
pub fn resolve_starting_age(configured: StartingAge) -> Option<Age> {
    match configured {
        StartingAge::Child => Some(Age::Child),
        StartingAge::Adult => Some(Age::Adult),
        StartingAge::Random => None,
    }
}

/// Collects tokens fixed at the sphere's newly reached placements,
/// skipping placements already looted by an earlier search.
pub fn collect_fixed(
    store: &Store,
    sphere: &Sphere,
    inventory: &mut Inventory,
    looted: &mut Bitset,
) {
    for id in sphere.nodes.reached.iter() {
        let entity = Entity::new(id);
        if !store.is_placement(entity) || !store.is_fixed(entity) {
            continue;
        }
        if let Some(token) = store.holds_token(entity) {
            if looted.insert(id) {
                inventory.collect_one(token);
            }
        }
    }
}
