//! Exploration end-to-end scenarios: sphere progression, token collection,
//! determinism, monotonicity, cancellation.

mod common;

use common::{declare_token, env_with, has_rule, pocket_tokens};
use entwine_base::{Arena, Bitset, CancelToken};
use entwine_logic::ast::AstContext;
use entwine_logic::objects::Table;
use entwine_logic::settings::Settings;
use entwine_world::{
    compile_rules, Age, Entity, ExplorableWorld, Exploration, ExplorationResults, Inventory,
    Store,
};

struct SmallWorld {
    store: Store,
    world: ExplorableWorld,
    table: Table,
    settings: Settings,
    key: Entity,
    region_a: Entity,
    region_b: Entity,
    key_chest: Entity,
}

/// Root -> Key Chest (placement, open) holding the fixed Small Key.
/// Root -> A gated by has(Small Key, 1); A -> B open.
fn small_world(fix_key: bool) -> SmallWorld {
    let arena = Arena::new();
    let settings = Settings::default();
    let mut env = env_with(AstContext::new(&arena), settings.clone());
    let mut store = Store::new();
    pocket_tokens(&mut store);
    let (key_symbol, key) = declare_token(&mut env, &mut store, "Small Key");

    let root = store.region("Root");
    let a = store.region("A");
    let b = store.region("B");
    store.mark_root(root.entity());
    let chest = store.placement("Key Chest");
    if fix_key {
        let key_token = store.token("Small Key");
        store.fix(chest, key_token);
    }

    let chest_edge = store.place(root, chest);
    let gated = store.connect(root, a);
    let open = store.connect(a, b);

    let key_rule = has_rule(&mut env, key_symbol, 1.0);
    let rules = vec![
        (chest_edge.entity(), entwine_logic::ast::TRUE),
        (gated.entity(), key_rule),
        (open.entity(), entwine_logic::ast::TRUE),
    ];
    let modules = compile_rules(&mut store, &mut env, rules, &CancelToken::new()).unwrap();
    let world = ExplorableWorld::assemble(&store, modules).unwrap();
    let table = env.objects.freeze();

    SmallWorld {
        region_a: a.entity(),
        region_b: b.entity(),
        key_chest: chest.entity(),
        store,
        world,
        table,
        settings,
        key,
    }
}

fn exploration<'w>(world: &'w SmallWorld, cancel: CancelToken) -> Exploration<'w> {
    Exploration {
        world: &world.world,
        store: &world.store,
        objects: &world.table,
        settings: &world.settings,
        starting_age: Age::Child,
        cancel,
    }
}

fn signature(results: &ExplorationResults) -> Vec<[Vec<u32>; 4]> {
    results
        .spheres
        .iter()
        .map(|sphere| {
            [
                sphere.nodes.reached.iter().collect(),
                sphere.nodes.pended.iter().collect(),
                sphere.edges.crossed.iter().collect(),
                sphere.edges.pended.iter().collect(),
            ]
        })
        .collect()
}

#[test]
fn spheres_progress_as_the_inventory_grows() {
    // the key chest is empty; the gate only opens once the driver hands
    // over the key between spheres
    let world = small_world(false);
    let xplr = exploration(&world, CancelToken::new());
    let mut inventory = Inventory::new();

    let results = xplr.run(Age::Child, &mut inventory, &mut Bitset::new()).unwrap();
    // sphere 1 reaches the chest, then the search is stuck
    let reached = results.reached();
    assert!(reached.contains(world.key_chest.index()));
    assert!(!reached.contains(world.region_a.index()));

    // hand over the key and search again from scratch
    inventory.collect_one(world.key);
    let results = xplr.run(Age::Child, &mut inventory, &mut Bitset::new()).unwrap();
    let reached = results.reached();
    assert!(reached.contains(world.region_a.index()));
    assert!(reached.contains(world.region_b.index()));
    // A and B fall in the same sphere: the gate opens, then the open edge
    // crosses immediately
    let first = &results.spheres[0];
    assert!(first.nodes.reached.contains(world.region_a.index()));
    assert!(first.nodes.reached.contains(world.region_b.index()));
}

#[test]
fn fixed_tokens_are_collected_between_spheres() {
    // with the key fixed in the chest the driver feeds it back and the
    // whole world opens without outside help
    let world = small_world(true);
    let xplr = exploration(&world, CancelToken::new());
    let mut inventory = Inventory::new();

    let results = xplr.run(Age::Child, &mut inventory, &mut Bitset::new()).unwrap();
    assert!(results.completed());
    let reached = results.reached();
    assert!(reached.contains(world.key_chest.index()));
    assert!(reached.contains(world.region_a.index()));
    assert!(reached.contains(world.region_b.index()));
    assert_eq!(inventory.count(world.key), 1.0);
}

#[test]
fn identical_runs_produce_identical_sphere_sequences() {
    let world = small_world(true);
    let xplr = exploration(&world, CancelToken::new());

    let mut first_inventory = Inventory::new();
    let first = xplr.run(Age::Child, &mut first_inventory, &mut Bitset::new()).unwrap();
    let mut second_inventory = Inventory::new();
    let second = xplr.run(Age::Child, &mut second_inventory, &mut Bitset::new()).unwrap();

    assert_eq!(signature(&first), signature(&second));
}

#[test]
fn crossed_edges_are_disjoint_across_spheres() {
    let world = small_world(true);
    let xplr = exploration(&world, CancelToken::new());
    let mut inventory = Inventory::new();
    let results = xplr.run(Age::Child, &mut inventory, &mut Bitset::new()).unwrap();

    let mut seen = Bitset::new();
    for sphere in &results.spheres {
        for edge in &sphere.edges.crossed {
            assert!(seen.insert(edge), "edge {edge} crossed twice");
        }
    }
}

#[test]
fn both_ages_share_the_inventory() {
    let world = small_world(true);
    let xplr = exploration(&world, CancelToken::new());
    let mut inventory = Inventory::new();
    let (first, second) = xplr.run_both_ages(&mut inventory).unwrap();

    assert!(first.completed());
    assert!(second.completed());
    // the key collected as child is already on hand for the adult pass, so
    // the gate opens in the very first sphere
    assert!(second.spheres[0]
        .nodes
        .reached
        .contains(world.region_a.index()));
    assert_eq!(inventory.count(world.key), 1.0);
}

#[test]
fn cancellation_flags_the_run() {
    let world = small_world(true);
    let cancel = CancelToken::new();
    cancel.cancel();
    let xplr = exploration(&world, cancel);
    let mut inventory = Inventory::new();
    let results = xplr.run(Age::Child, &mut inventory, &mut Bitset::new()).unwrap();
    assert!(results.cancelled);
    assert!(results.spheres.is_empty());
    assert!(!results.completed());
}
