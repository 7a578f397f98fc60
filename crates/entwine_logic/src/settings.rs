//! The typed settings surface.
//!
//! Rules and compiler functions read world options three ways: setting
//! identifiers inlined to constants, skill maps consulted by
//! `is_glitch_enabled`/`is_trick_enabled`, and option groups consulted by
//! the remaining compiler functions. Every name in [`Settings::names`] is
//! declarable as a Setting symbol and resolvable through
//! [`Settings::value`]; the name's position in that list is the address
//! packed into its setting pointer.

use bitflags::bitflags;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

bitflags! {
    /// The shuffle options as a flag word, for callers that test several at
    /// once.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct ShuffleFlags: u32 {
        const OCARINA_NOTES = 1 << 0;
        const SHOPS = 1 << 1;
        const SONGS = 1 << 2;
        const SCRUBS = 1 << 3;
        const COWS = 1 << 4;
        const BEEHIVES = 1 << 5;
        const POTS = 1 << 6;
        const FROGS = 1 << 7;
    }
}

/// Which placement pools are shuffled.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Shuffling {
    pub ocarina_notes: bool,
    pub shops: bool,
    pub songs: bool,
    pub scrubs: bool,
    pub cows: bool,
    pub beehives: bool,
    pub pots: bool,
    pub frogs: bool,
    /// How many big poes a buyer expects.
    pub big_poe_count: u32,
}

impl Shuffling {
    pub fn flags(&self) -> ShuffleFlags {
        let mut flags = ShuffleFlags::empty();
        flags.set(ShuffleFlags::OCARINA_NOTES, self.ocarina_notes);
        flags.set(ShuffleFlags::SHOPS, self.shops);
        flags.set(ShuffleFlags::SONGS, self.songs);
        flags.set(ShuffleFlags::SCRUBS, self.scrubs);
        flags.set(ShuffleFlags::COWS, self.cows);
        flags.set(ShuffleFlags::BEEHIVES, self.beehives);
        flags.set(ShuffleFlags::POTS, self.pots);
        flags.set(ShuffleFlags::FROGS, self.frogs);
        flags
    }
}

/// Player skill assumptions, keyed by the names rules use.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Skills {
    pub glitches: FxHashMap<String, bool>,
    pub tricks: FxHashMap<String, bool>,
}

/// Clock position the run starts at.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    #[default]
    Sunrise,
    Morning,
    Noon,
    Afternoon,
    Sunset,
    Evening,
    Night,
    Witching,
}

impl TimeOfDay {
    pub fn is_night(self) -> bool {
        matches!(self, TimeOfDay::Sunset | TimeOfDay::Evening | TimeOfDay::Night | TimeOfDay::Witching)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Starting {
    pub time_of_day: TimeOfDay,
}

/// Which age the run begins as.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartingAge {
    #[default]
    Child,
    Adult,
    Random,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Spawns {
    pub starting_age: StartingAge,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Locations {
    pub open_door_of_time: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Entrances {
    pub shuffle_interiors: bool,
    pub shuffle_overworld: bool,
    pub shuffle_dungeons: bool,
}

impl Entrances {
    /// True when entrance shuffling can move a time-of-day check away from
    /// the scene it was written for.
    pub fn affected_tod_checks(&self) -> bool {
        self.shuffle_interiors || self.shuffle_overworld
    }
}

/// Every option group the compiler configuration carries.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub shuffling: Shuffling,
    pub skills: Skills,
    pub starting: Starting,
    pub spawns: Spawns,
    pub locations: Locations,
    pub entrances: Entrances,
}

/// A setting resolved to the constant a rule sees.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
}

/// The inlinable setting names, in pointer-address order.
const NAMES: &[&str] = &[
    "shuffle_ocarina_notes",
    "shuffle_shops",
    "shuffle_songs",
    "shuffle_scrubs",
    "shuffle_cows",
    "shuffle_beehives",
    "shuffle_pots",
    "shuffle_frogs",
    "big_poe_count",
    "open_door_of_time",
    "shuffle_interior_entrances",
    "shuffle_overworld_entrances",
    "shuffle_dungeon_entrances",
];

impl Settings {
    /// The recognised setting names in a stable order. A name's position is
    /// the address its setting pointer carries.
    pub fn names() -> &'static [&'static str] {
        NAMES
    }

    /// Resolves a setting name to its current value.
    pub fn value(&self, name: &str) -> Option<SettingValue> {
        let value = match name {
            "shuffle_ocarina_notes" => SettingValue::Bool(self.shuffling.ocarina_notes),
            "shuffle_shops" => SettingValue::Bool(self.shuffling.shops),
            "shuffle_songs" => SettingValue::Bool(self.shuffling.songs),
            "shuffle_scrubs" => SettingValue::Bool(self.shuffling.scrubs),
            "shuffle_cows" => SettingValue::Bool(self.shuffling.cows),
            "shuffle_beehives" => SettingValue::Bool(self.shuffling.beehives),
            "shuffle_pots" => SettingValue::Bool(self.shuffling.pots),
            "shuffle_frogs" => SettingValue::Bool(self.shuffling.frogs),
            "big_poe_count" => SettingValue::Number(self.shuffling.big_poe_count as f64),
            "open_door_of_time" => SettingValue::Bool(self.locations.open_door_of_time),
            "shuffle_interior_entrances" => SettingValue::Bool(self.entrances.shuffle_interiors),
            "shuffle_overworld_entrances" => SettingValue::Bool(self.entrances.shuffle_overworld),
            "shuffle_dungeon_entrances" => SettingValue::Bool(self.entrances.shuffle_dungeons),
            _ => return None,
        };
        Some(value)
    }
}
