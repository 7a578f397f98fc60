//! The bag of collected tokens.
//!
//! Quantities are real-valued: most tokens count in whole units, heart
//! pieces in quarters.

use crate::store::Entity;
use rustc_hash::FxHashMap;

#[derive(Default)]
pub struct Inventory {
    onhand: FxHashMap<Entity, f64>,
}

impl Inventory {
    pub fn new() -> Self {
        Inventory::default()
    }

    pub fn collect_one(&mut self, entity: Entity) {
        self.collect(entity, 1.0);
    }

    pub fn collect(&mut self, entity: Entity, n: f64) {
        *self.onhand.entry(entity).or_insert(0.0) += n;
    }

    /// Removes up to `n`, returning how much actually came out.
    pub fn remove(&mut self, entity: Entity, n: f64) -> f64 {
        let Some(has) = self.onhand.get_mut(&entity) else {
            return 0.0;
        };
        let removed = n.min(*has);
        *has -= removed;
        removed
    }

    pub fn count(&self, entity: Entity) -> f64 {
        self.onhand.get(&entity).copied().unwrap_or(0.0)
    }

    pub fn sum(&self, entities: &[Entity]) -> f64 {
        entities.iter().map(|entity| self.count(*entity)).sum()
    }
}
