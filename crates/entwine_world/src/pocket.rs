//! The read-optimised view built-in functions consult.
//!
//! A pocket is bound once per search run. It precomputes the entity lists
//! the built-ins aggregate over — bottles, stones, medallions, dungeon
//! rewards, the ocarina-note transcription — so a rule evaluation never
//! scans the store.

use crate::inventory::Inventory;
use crate::store::{Entity, Store, TokenKind};
use entwine_logic::error::DataError;
use rustc_hash::FxHashMap;

const HEART_PIECE: &str = "Piece of Heart";
const SCARECROW_SONG: &str = "Scarecrow Song";

pub struct Pocket {
    transcribe: FxHashMap<char, Entity>,
    songs: FxHashMap<Entity, String>,

    heart_piece: Entity,
    scarecrow_song: Entity,
    bottles: Vec<Entity>,
    stones: Vec<Entity>,
    medallions: Vec<Entity>,
    rewards: Vec<Entity>,
    notes: Vec<Entity>,
}

impl Pocket {
    /// Precomputes the aggregate indices from the store.
    ///
    /// The heart-piece and scarecrow-song tokens must exist; worlds always
    /// carry them.
    pub fn new(store: &Store) -> Result<Pocket, DataError> {
        let heart_piece = named_token(store, HEART_PIECE)?;
        let scarecrow_song = named_token(store, SCARECROW_SONG)?;

        let transcribe: FxHashMap<char, Entity> = store.note_tokens().collect();
        let songs = store
            .songs()
            .map(|(entity, notes)| (entity, notes.to_string()))
            .collect();

        let mut notes: Vec<Entity> = transcribe.values().copied().collect();
        notes.sort();

        Ok(Pocket {
            transcribe,
            songs,
            heart_piece,
            scarecrow_song,
            bottles: store.with_kind(TokenKind::Bottle),
            stones: store.with_kind(TokenKind::Stone),
            medallions: store.with_kind(TokenKind::Medallion),
            rewards: store.with_kind(TokenKind::DungeonReward),
            notes,
        })
    }

    pub fn has(&self, inventory: &Inventory, entity: Entity, n: f64) -> bool {
        inventory.count(entity) >= n
    }

    pub fn has_every(&self, inventory: &Inventory, entities: &[Entity]) -> bool {
        entities.iter().all(|entity| self.has(inventory, *entity, 1.0))
    }

    pub fn has_any(&self, inventory: &Inventory, entities: &[Entity]) -> bool {
        entities.iter().any(|entity| self.has(inventory, *entity, 1.0))
    }

    pub fn has_bottle(&self, inventory: &Inventory) -> bool {
        self.has_any(inventory, &self.bottles)
    }

    pub fn has_stones(&self, inventory: &Inventory, n: f64) -> bool {
        inventory.sum(&self.stones) >= n
    }

    pub fn has_medallions(&self, inventory: &Inventory, n: f64) -> bool {
        inventory.sum(&self.medallions) >= n
    }

    pub fn has_dungeon_rewards(&self, inventory: &Inventory, n: f64) -> bool {
        inventory.sum(&self.rewards) >= n
    }

    /// Four heart pieces make a heart.
    pub fn has_hearts(&self, inventory: &Inventory, n: f64) -> bool {
        inventory.count(self.heart_piece) / 4.0 >= n
    }

    /// For the scarecrow song any two notes suffice; other songs need the
    /// carrier token of every note in their line.
    pub fn has_all_notes(&self, inventory: &Inventory, song: Entity) -> Result<bool, DataError> {
        if song == self.scarecrow_song {
            return Ok(inventory.sum(&self.notes) >= 2.0);
        }

        let Some(notes) = self.songs.get(&song) else {
            return Err(DataError::NotASong(format!("entity {}", song.index())));
        };
        let mut transcript = Vec::with_capacity(notes.chars().count());
        for glyph in notes.chars() {
            let token = self
                .transcribe
                .get(&glyph)
                .copied()
                .ok_or(DataError::UnknownNote(glyph))?;
            transcript.push(token);
        }
        Ok(self.has_every(inventory, &transcript))
    }
}

fn named_token(store: &Store, name: &str) -> Result<Entity, DataError> {
    store
        .lookup(name)
        .filter(|entity| store.is_token(*entity))
        .ok_or_else(|| DataError::UnknownToken(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        store: Store,
        heart: Entity,
        scarecrow: Entity,
        epona: Entity,
        up: Entity,
        left: Entity,
    }

    fn fixture() -> Fixture {
        let mut store = Store::new();
        let heart = store.token(HEART_PIECE).entity();
        let scarecrow = store.token(SCARECROW_SONG).entity();
        store.set_song(scarecrow, crate::store::SongKind::Normal, "UD");

        let epona = store.token("Eponas Song").entity();
        store.set_song(epona, crate::store::SongKind::Normal, "ULUL");

        let up = store.token("Note U").entity();
        store.set_ocarina_note(up, 'U');
        let left = store.token("Note L").entity();
        store.set_ocarina_note(left, 'L');
        let down = store.token("Note D").entity();
        store.set_ocarina_note(down, 'D');

        Fixture {
            store,
            heart,
            scarecrow,
            epona,
            up,
            left,
        }
    }

    #[test]
    fn has_compares_against_the_count() {
        let fx = fixture();
        let pocket = Pocket::new(&fx.store).unwrap();
        let mut inventory = Inventory::new();
        assert!(!pocket.has(&inventory, fx.heart, 1.0));
        inventory.collect(fx.heart, 1.0);
        assert!(pocket.has(&inventory, fx.heart, 1.0));
    }

    #[test]
    fn hearts_count_in_quarters() {
        let fx = fixture();
        let pocket = Pocket::new(&fx.store).unwrap();
        let mut inventory = Inventory::new();
        inventory.collect(fx.heart, 7.0);
        assert!(pocket.has_hearts(&inventory, 1.0));
        assert!(!pocket.has_hearts(&inventory, 2.0));
        inventory.collect(fx.heart, 1.0);
        assert!(pocket.has_hearts(&inventory, 2.0));
    }

    #[test]
    fn bottles_answer_through_has_any() {
        let mut store = Store::new();
        store.token(HEART_PIECE);
        store.token(SCARECROW_SONG);
        let ruto = store.token("Rutos Letter").entity();
        store.mark_kind(ruto, TokenKind::Bottle);
        let pocket = Pocket::new(&store).unwrap();
        let mut inventory = Inventory::new();
        assert!(!pocket.has_bottle(&inventory));
        inventory.collect_one(ruto);
        assert!(pocket.has_bottle(&inventory));
    }

    #[test]
    fn stones_sum_across_the_kind() {
        let mut store = Store::new();
        store.token(HEART_PIECE);
        store.token(SCARECROW_SONG);
        let kokiri = store.token("Kokiri Emerald").entity();
        let goron = store.token("Goron Ruby").entity();
        store.mark_kind(kokiri, TokenKind::Stone);
        store.mark_kind(goron, TokenKind::Stone);
        let pocket = Pocket::new(&store).unwrap();
        let mut inventory = Inventory::new();
        inventory.collect_one(kokiri);
        assert!(pocket.has_stones(&inventory, 1.0));
        assert!(!pocket.has_stones(&inventory, 2.0));
        inventory.collect_one(goron);
        assert!(pocket.has_stones(&inventory, 2.0));
    }

    #[test]
    fn songs_need_every_note_carrier() {
        let fx = fixture();
        let pocket = Pocket::new(&fx.store).unwrap();
        let mut inventory = Inventory::new();
        inventory.collect_one(fx.up);
        assert!(!pocket.has_all_notes(&inventory, fx.epona).unwrap());
        inventory.collect_one(fx.left);
        assert!(pocket.has_all_notes(&inventory, fx.epona).unwrap());
    }

    #[test]
    fn the_scarecrow_song_needs_any_two_notes() {
        let fx = fixture();
        let pocket = Pocket::new(&fx.store).unwrap();
        let mut inventory = Inventory::new();
        inventory.collect_one(fx.up);
        assert!(!pocket.has_all_notes(&inventory, fx.scarecrow).unwrap());
        inventory.collect_one(fx.left);
        assert!(pocket.has_all_notes(&inventory, fx.scarecrow).unwrap());
    }

    #[test]
    fn non_songs_are_rejected() {
        let fx = fixture();
        let pocket = Pocket::new(&fx.store).unwrap();
        let inventory = Inventory::new();
        let err = pocket.has_all_notes(&inventory, fx.heart).unwrap_err();
        assert!(matches!(err, DataError::NotASong(_)));
    }

    #[test]
    fn worlds_without_the_heart_piece_fail_to_bind() {
        let store = Store::new();
        assert!(matches!(
            Pocket::new(&store),
            Err(DataError::UnknownToken(_))
        ));
    }
}
