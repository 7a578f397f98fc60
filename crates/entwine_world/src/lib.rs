//! # entwine-world
//!
//! The world side of the pipeline: the entity attribute store, the
//! explorable graph, the sphere search, and the runtime state a search
//! evaluates rules against.
//!
//! A generation flows through three phases:
//!
//! 1. **Build** — ingest populates the [`store::Store`]; the tracking
//!    helpers keep relational invariants intact.
//! 2. **Compile** — [`compile::compile_rules`] optimizes and compiles every
//!    edge rule (connection generation adds more mid-batch), then
//!    [`graph::ExplorableWorld::assemble`] freezes the graph.
//! 3. **Explore** — [`explore::Exploration`] runs spheres per age against a
//!    shared [`inventory::Inventory`], with built-ins answering through the
//!    per-run [`pocket::Pocket`].

pub mod builtins;
pub mod compile;
pub mod explore;
pub mod graph;
pub mod inventory;
pub mod pocket;
pub mod search;
pub mod store;
pub mod tracking;

pub use builtins::{bind, Age, Bindings};
pub use compile::{compile_rules, BatchError, StoreScribe};
pub use explore::{collect_fixed, resolve_starting_age, Exploration, ExplorationResults};
pub use graph::{EdgeRecord, ExplorableWorld};
pub use inventory::Inventory;
pub use pocket::Pocket;
pub use search::{EdgeSet, NodeSet, Search, Sphere};
pub use store::{Connection, EdgeKind, Entity, SongKind, Store, TokenKind};
pub use tracking::{Edge, Placement, Region, Token};
