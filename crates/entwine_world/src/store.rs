//! The entity attribute store.
//!
//! Every world object — region, placement, token, edge — is an opaque
//! [`Entity`] with attributes in columns keyed by id. Markers are bitsets,
//! valued attributes are maps, and membership queries intersect bitsets.
//! The store is mutable through ingest and compilation (connection
//! generation adds entities mid-batch) and read-only during exploration.

use entwine_base::Bitset;
use entwine_logic::objects::Object;
use rustc_hash::FxHashMap;

/// Opaque 32-bit identity for any world object.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Entity(u32);

impl Entity {
    pub fn new(raw: u32) -> Entity {
        Entity(raw)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Whether an edge leads to another region or to a placement.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EdgeKind {
    Transit,
    Placement,
}

/// Token classification markers. A token can carry several.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TokenKind {
    Compass,
    Map,
    SmallKey,
    BossKey,
    KeyRing,
    Drop,
    Refill,
    Shop,
    Item,
    DungeonReward,
    SilverRupee,
    SilverRupeePouch,
    GoldSkulltulaToken,
    Medallion,
    Stone,
    Bottle,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SongKind {
    Normal,
    Warp,
}

/// Directed endpoints of an edge entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Connection {
    pub from: Entity,
    pub to: Entity,
}

/// Columnar attribute storage over dense entity ids.
#[derive(Default)]
pub struct Store {
    names: Vec<String>,
    by_name: FxHashMap<String, Entity>,

    regions: Bitset,
    placements: Bitset,
    tokens: Bitset,
    events: Bitset,
    roots: Bitset,
    fixed: Bitset,
    boss_rooms: Bitset,
    time_passes: Bitset,
    token_kinds: FxHashMap<TokenKind, Bitset>,

    holds_token: FxHashMap<Entity, Entity>,
    held_at: FxHashMap<Entity, Entity>,
    default_placement: FxHashMap<Entity, Entity>,

    edges: FxHashMap<Connection, Entity>,
    endpoints: FxHashMap<Entity, Connection>,
    edge_kinds: FxHashMap<Entity, EdgeKind>,
    edge_order: Vec<Entity>,
    rule_sources: FxHashMap<Entity, String>,

    ptrs: FxHashMap<Entity, Object>,
    aliases: FxHashMap<Entity, String>,

    songs: FxHashMap<Entity, SongKind>,
    song_notes: FxHashMap<Entity, String>,
    ocarina_notes: FxHashMap<Entity, char>,

    prices: FxHashMap<Entity, u32>,
    priorities: FxHashMap<Entity, i32>,
    scenes: FxHashMap<Entity, String>,
    savewarps: FxHashMap<Entity, String>,
    dungeon_names: FxHashMap<Entity, String>,
    hint_regions: FxHashMap<Entity, String>,
    alt_hint_regions: FxHashMap<Entity, String>,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    /// Gets or creates the entity with this name.
    pub fn spawn(&mut self, name: &str) -> Entity {
        if let Some(&entity) = self.by_name.get(name) {
            return entity;
        }
        let entity = Entity(self.names.len() as u32);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), entity);
        entity
    }

    pub fn lookup(&self, name: &str) -> Option<Entity> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, entity: Entity) -> &str {
        &self.names[entity.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    // markers

    pub fn mark_region(&mut self, entity: Entity) {
        self.regions.insert(entity.0);
    }

    pub fn mark_placement(&mut self, entity: Entity) {
        self.placements.insert(entity.0);
    }

    pub fn mark_token(&mut self, entity: Entity) {
        self.tokens.insert(entity.0);
    }

    pub fn mark_event(&mut self, entity: Entity) {
        self.events.insert(entity.0);
    }

    pub fn mark_root(&mut self, entity: Entity) {
        self.roots.insert(entity.0);
    }

    pub fn mark_boss_room(&mut self, entity: Entity) {
        self.boss_rooms.insert(entity.0);
    }

    pub fn mark_time_passes(&mut self, entity: Entity) {
        self.time_passes.insert(entity.0);
    }

    pub fn mark_kind(&mut self, entity: Entity, kind: TokenKind) {
        self.token_kinds.entry(kind).or_default().insert(entity.0);
    }

    pub fn is_region(&self, entity: Entity) -> bool {
        self.regions.contains(entity.0)
    }

    pub fn is_placement(&self, entity: Entity) -> bool {
        self.placements.contains(entity.0)
    }

    pub fn is_token(&self, entity: Entity) -> bool {
        self.tokens.contains(entity.0)
    }

    pub fn is_event(&self, entity: Entity) -> bool {
        self.events.contains(entity.0)
    }

    pub fn is_fixed(&self, entity: Entity) -> bool {
        self.fixed.contains(entity.0)
    }

    pub fn has_kind(&self, entity: Entity, kind: TokenKind) -> bool {
        self.token_kinds
            .get(&kind)
            .is_some_and(|members| members.contains(entity.0))
    }

    pub fn roots(&self) -> &Bitset {
        &self.roots
    }

    pub fn regions(&self) -> &Bitset {
        &self.regions
    }

    pub fn placements(&self) -> &Bitset {
        &self.placements
    }

    pub fn tokens(&self) -> &Bitset {
        &self.tokens
    }

    /// Tokens carrying `kind`, ascending by id.
    pub fn with_kind(&self, kind: TokenKind) -> Vec<Entity> {
        match self.token_kinds.get(&kind) {
            Some(members) => members.iter().map(Entity).collect(),
            None => Vec::new(),
        }
    }

    // held-token relations; the tracking layer keeps both directions in step

    pub(crate) fn set_holds_token(&mut self, place: Entity, token: Entity) {
        self.holds_token.insert(place, token);
    }

    pub(crate) fn set_held_at(&mut self, token: Entity, place: Entity) {
        self.held_at.insert(token, place);
    }

    pub(crate) fn set_fixed(&mut self, entity: Entity) {
        self.fixed.insert(entity.0);
    }

    pub fn holds_token(&self, place: Entity) -> Option<Entity> {
        self.holds_token.get(&place).copied()
    }

    pub fn held_at(&self, token: Entity) -> Option<Entity> {
        self.held_at.get(&token).copied()
    }

    pub fn set_default_placement(&mut self, token: Entity, place: Entity) {
        self.default_placement.insert(token, place);
    }

    pub fn default_placement(&self, token: Entity) -> Option<Entity> {
        self.default_placement.get(&token).copied()
    }

    // edges

    /// Gets or creates the edge entity for `(from, to)`.
    pub fn edge(&mut self, connection: Connection) -> Entity {
        if let Some(&entity) = self.edges.get(&connection) {
            return entity;
        }
        let name = format!(
            "{} -> {}",
            self.name(connection.from),
            self.name(connection.to)
        );
        let entity = self.spawn(&name);
        self.edges.insert(connection, entity);
        self.endpoints.insert(entity, connection);
        self.edge_order.push(entity);
        entity
    }

    pub fn edge_between(&self, from: Entity, to: Entity) -> Option<Entity> {
        self.edges.get(&Connection { from, to }).copied()
    }

    pub fn endpoints(&self, edge: Entity) -> Option<Connection> {
        self.endpoints.get(&edge).copied()
    }

    pub fn set_edge_kind(&mut self, edge: Entity, kind: EdgeKind) {
        self.edge_kinds.insert(edge, kind);
    }

    pub fn edge_kind(&self, edge: Entity) -> Option<EdgeKind> {
        self.edge_kinds.get(&edge).copied()
    }

    /// Edge entities in creation order; exploration's successor order
    /// derives from this.
    pub fn edges_in_order(&self) -> &[Entity] {
        &self.edge_order
    }

    pub fn set_rule_source(&mut self, edge: Entity, source: &str) {
        self.rule_sources.insert(edge, source.to_string());
    }

    pub fn rule_source(&self, edge: Entity) -> Option<&str> {
        self.rule_sources.get(&edge).map(|s| s.as_str())
    }

    // misc columns

    pub fn set_ptr(&mut self, entity: Entity, ptr: Object) {
        self.ptrs.insert(entity, ptr);
    }

    pub fn ptr(&self, entity: Entity) -> Option<Object> {
        self.ptrs.get(&entity).copied()
    }

    pub fn set_alias(&mut self, entity: Entity, alias: &str) {
        self.aliases.insert(entity, alias.to_string());
    }

    pub fn alias(&self, entity: Entity) -> Option<&str> {
        self.aliases.get(&entity).map(|s| s.as_str())
    }

    pub fn set_song(&mut self, entity: Entity, kind: SongKind, notes: &str) {
        self.songs.insert(entity, kind);
        self.song_notes.insert(entity, notes.to_string());
    }

    pub fn song_notes(&self, entity: Entity) -> Option<&str> {
        self.song_notes.get(&entity).map(|s| s.as_str())
    }

    pub fn songs(&self) -> impl Iterator<Item = (Entity, &str)> {
        self.song_notes
            .iter()
            .map(|(entity, notes)| (*entity, notes.as_str()))
    }

    pub fn set_ocarina_note(&mut self, entity: Entity, glyph: char) {
        self.ocarina_notes.insert(entity, glyph);
    }

    pub fn note_tokens(&self) -> impl Iterator<Item = (char, Entity)> + '_ {
        self.ocarina_notes
            .iter()
            .map(|(entity, glyph)| (*glyph, *entity))
    }

    pub fn set_price(&mut self, entity: Entity, price: u32) {
        self.prices.insert(entity, price);
    }

    pub fn price(&self, entity: Entity) -> Option<u32> {
        self.prices.get(&entity).copied()
    }

    pub fn set_priority(&mut self, entity: Entity, priority: i32) {
        self.priorities.insert(entity, priority);
    }

    pub fn priority(&self, entity: Entity) -> Option<i32> {
        self.priorities.get(&entity).copied()
    }

    pub fn set_scene(&mut self, entity: Entity, scene: &str) {
        self.scenes.insert(entity, scene.to_string());
    }

    pub fn scene(&self, entity: Entity) -> Option<&str> {
        self.scenes.get(&entity).map(|s| s.as_str())
    }

    pub fn set_savewarp(&mut self, entity: Entity, target: &str) {
        self.savewarps.insert(entity, target.to_string());
    }

    pub fn savewarp(&self, entity: Entity) -> Option<&str> {
        self.savewarps.get(&entity).map(|s| s.as_str())
    }

    pub fn set_dungeon_name(&mut self, entity: Entity, name: &str) {
        self.dungeon_names.insert(entity, name.to_string());
    }

    pub fn dungeon_name(&self, entity: Entity) -> Option<&str> {
        self.dungeon_names.get(&entity).map(|s| s.as_str())
    }

    pub fn set_hint_region(&mut self, entity: Entity, hint: &str) {
        self.hint_regions.insert(entity, hint.to_string());
    }

    pub fn hint_region(&self, entity: Entity) -> Option<&str> {
        self.hint_regions.get(&entity).map(|s| s.as_str())
    }

    pub fn set_alt_hint_region(&mut self, entity: Entity, hint: &str) {
        self.alt_hint_regions.insert(entity, hint.to_string());
    }

    pub fn alt_hint_region(&self, entity: Entity) -> Option<&str> {
        self.alt_hint_regions.get(&entity).map(|s| s.as_str())
    }
}
