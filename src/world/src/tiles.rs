//! Static tile definitions.
//!
//! Tile ids are plain integers in level data. The registry maps them to a
//! semantic category and a movement-blocking flag; it is built once and never
//! mutated at runtime.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};

/// Raw tile id as stored in level layers
pub type TileId = u16;

/// Nothing drawn on the decor layer
pub const EMPTY: TileId = 0;
pub const FLOOR: TileId = 1;
pub const WALL: TileId = 2;
pub const DOOR_LOCKED: TileId = 3;
pub const DOOR_OPEN: TileId = 4;
/// Decor marker: the collision tile underneath can be destroyed
pub const DESTROY_OVERLAY: TileId = 5;
pub const CRATE: TileId = 6;
pub const RUBBLE_FLOOR: TileId = 7;
pub const GRASS: TileId = 8;
pub const TORCH: TileId = 9;
pub const WATER: TileId = 10;
/// Wall segment that opens together with the level gate
pub const SEALED_WALL: TileId = 11;
pub const CARPET: TileId = 12;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TileCategory {
    Wall,
    Floor,
    Door,
    Decor,
}

/// Immutable tile definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileDef {
    pub id: TileId,
    pub name: &'static str,
    pub category: TileCategory,
    pub blocks_movement: bool,
}

impl TileDef {
    const fn new(
        id: TileId,
        name: &'static str,
        category: TileCategory,
        blocks_movement: bool,
    ) -> Self {
        Self {
            id,
            name,
            category,
            blocks_movement,
        }
    }
}

const BUILTIN_TILES: &[TileDef] = &[
    TileDef::new(EMPTY, "empty", TileCategory::Decor, false),
    TileDef::new(FLOOR, "floor", TileCategory::Floor, false),
    TileDef::new(WALL, "wall", TileCategory::Wall, true),
    TileDef::new(DOOR_LOCKED, "door_locked", TileCategory::Door, true),
    TileDef::new(DOOR_OPEN, "door_open", TileCategory::Door, false),
    TileDef::new(DESTROY_OVERLAY, "destroy_overlay", TileCategory::Decor, false),
    TileDef::new(CRATE, "crate", TileCategory::Wall, true),
    TileDef::new(RUBBLE_FLOOR, "rubble_floor", TileCategory::Floor, false),
    TileDef::new(GRASS, "grass", TileCategory::Decor, false),
    TileDef::new(TORCH, "torch", TileCategory::Decor, false),
    TileDef::new(WATER, "water", TileCategory::Floor, true),
    TileDef::new(SEALED_WALL, "sealed_wall", TileCategory::Wall, true),
    TileDef::new(CARPET, "carpet", TileCategory::Floor, false),
];

/// Lookup table from tile id to definition
#[derive(Debug, Clone)]
pub struct TileRegistry {
    defs: BTreeMap<TileId, TileDef>,
}

impl TileRegistry {
    /// The built-in tile set every level is authored against
    pub fn builtin() -> Self {
        Self::from_defs(BUILTIN_TILES.iter().cloned())
    }

    pub fn from_defs(defs: impl IntoIterator<Item = TileDef>) -> Self {
        Self {
            defs: defs.into_iter().map(|def| (def.id, def)).collect(),
        }
    }

    pub fn get(&self, id: TileId) -> Option<&TileDef> {
        self.defs.get(&id)
    }

    pub fn category(&self, id: TileId) -> Option<TileCategory> {
        self.get(id).map(|def| def.category)
    }

    /// Unknown ids block movement.
    pub fn is_blocking(&self, id: TileId) -> bool {
        self.get(id).map_or(true, |def| def.blocks_movement)
    }

    pub fn is_known(&self, id: TileId) -> bool {
        self.defs.contains_key(&id)
    }

    /// All ids in a category, ascending
    pub fn ids_in(&self, category: TileCategory) -> Vec<TileId> {
        self.defs
            .values()
            .filter(|def| def.category == category)
            .map(|def| def.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl Default for TileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn builtin_blocking_flags() {
        let registry = TileRegistry::builtin();
        assert!(registry.is_blocking(WALL));
        assert!(registry.is_blocking(CRATE));
        assert!(registry.is_blocking(DOOR_LOCKED));
        assert!(!registry.is_blocking(FLOOR));
        assert!(!registry.is_blocking(DOOR_OPEN));
        assert!(!registry.is_blocking(EMPTY));
    }

    #[test]
    fn unknown_ids_fail_closed() {
        let registry = TileRegistry::builtin();
        assert!(registry.is_blocking(9999));
        assert_eq!(registry.category(9999), None);
        assert!(!registry.is_known(9999));
    }

    #[test]
    fn every_category_has_tiles() {
        let registry = TileRegistry::builtin();
        for category in TileCategory::iter() {
            assert!(!registry.ids_in(category).is_empty(), "{category} has no tiles");
        }
        assert_eq!(registry.ids_in(TileCategory::Door), vec![DOOR_LOCKED, DOOR_OPEN]);
    }

    #[test]
    fn category_names_round_trip() {
        assert_eq!(TileCategory::Door.to_string(), "door");
        assert_eq!(TileCategory::from_str("wall").unwrap(), TileCategory::Wall);
    }
}
