//! The slice of level content that describes geometry, lighting and the gate.
//!
//! Field names follow the level JSON format (camelCase).

use error::LevelError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::tiles::{self, TileId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub level_number: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn tile_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(&self, tx: i32, ty: i32) -> bool {
        tx >= 0 && ty >= 0 && (tx as u32) < self.width && (ty as u32) < self.height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileLayers {
    pub collision: Vec<TileId>,
    pub decor: Vec<TileId>,
    /// Per-tile override of the floor a destroyed tile turns into (0 = none)
    #[serde(default)]
    pub destroyed_floors: Option<Vec<TileId>>,
    /// Per-tile value written into sealed tiles when the gate opens (0 = floor)
    #[serde(default)]
    pub unlock_mask: Option<Vec<TileId>>,
    /// Hits needed to break a destructible tile
    #[serde(default = "default_destructible_hits")]
    pub destructible_hits: u32,
    /// Level-wide fallback for destroyed tiles
    #[serde(default)]
    pub destroyed_floor_tile: Option<TileId>,
}

fn default_destructible_hits() -> u32 {
    1
}

/// Rectangle in tile coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl TileRect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Tiles covered by the rectangle, clipped to the level
    pub fn tiles(&self, dims: Dimensions) -> impl Iterator<Item = (i32, i32)> + '_ {
        let (x0, y0) = (self.x, self.y);
        let (x1, y1) = (self.x + self.w as i32, self.y + self.h as i32);
        (y0..y1)
            .flat_map(move |ty| (x0..x1).map(move |tx| (tx, ty)))
            .filter(move |&(tx, ty)| dims.contains(tx, ty))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightSwitchConfig {
    pub id: String,
    pub tx: i32,
    pub ty: i32,
    #[serde(default)]
    pub lights: Vec<TileRect>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightingConfig {
    /// Zones lit from the start
    #[serde(default)]
    pub lit_zones: Vec<TileRect>,
    #[serde(default)]
    pub switches: Vec<LightSwitchConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateConfig {
    #[serde(default = "default_gate_id")]
    pub id: String,
    pub tx: i32,
    pub ty: i32,
    #[serde(default = "default_open_tile")]
    pub open_tile: TileId,
    #[serde(default = "default_locked_tile")]
    pub locked_tile: TileId,
    /// Collision id that marks the tiles restored when the gate opens
    #[serde(default = "default_sealed_tile")]
    pub sealed_tile: TileId,
    /// Item consumed to unlock the gate
    #[serde(default)]
    pub required_item: Option<String>,
    /// Flag set once the gate has been unlocked
    #[serde(default)]
    pub unlock_flag: Option<String>,
    #[serde(default)]
    pub locked_prompt: Option<String>,
}

/// Generic target id accepted by every gate
pub const GENERIC_GATE_ID: &str = "gate";

fn default_gate_id() -> String {
    GENERIC_GATE_ID.to_string()
}

fn default_open_tile() -> TileId {
    tiles::DOOR_OPEN
}

fn default_locked_tile() -> TileId {
    tiles::DOOR_LOCKED
}

fn default_sealed_tile() -> TileId {
    tiles::SEALED_WALL
}

/// Everything a [`crate::LevelInstance`] is built from
#[derive(Debug, Clone, PartialEq)]
pub struct LevelBlueprint {
    pub meta: LevelMeta,
    pub dimensions: Dimensions,
    pub tile_layers: TileLayers,
    pub lighting: LightingConfig,
    pub gate: Option<GateConfig>,
}

impl LevelBlueprint {
    /// Structural checks. Any failure makes the level unplayable.
    pub fn validate(&self) -> Result<(), LevelError> {
        let dims = self.dimensions;
        if dims.width == 0 || dims.height == 0 {
            return Err(LevelError::EmptyDimensions {
                width: dims.width,
                height: dims.height,
            });
        }

        let expected = dims.tile_count();
        let layers = &self.tile_layers;
        check_layer("collision", expected, layers.collision.len())?;
        check_layer("decor", expected, layers.decor.len())?;
        if let Some(floors) = &layers.destroyed_floors {
            check_layer("destroyedFloors", expected, floors.len())?;
        }
        if let Some(mask) = &layers.unlock_mask {
            check_layer("unlockMask", expected, mask.len())?;
        }

        let mut switch_ids = BTreeSet::new();
        for switch in &self.lighting.switches {
            if !switch_ids.insert(switch.id.as_str()) {
                return Err(LevelError::DuplicateId {
                    kind: "light switch",
                    id: switch.id.clone(),
                });
            }
            if !dims.contains(switch.tx, switch.ty) {
                return Err(LevelError::OutOfBounds {
                    what: format!("light switch `{}`", switch.id),
                    tx: switch.tx,
                    ty: switch.ty,
                });
            }
        }

        if let Some(gate) = &self.gate {
            if !dims.contains(gate.tx, gate.ty) {
                return Err(LevelError::OutOfBounds {
                    what: format!("gate `{}`", gate.id),
                    tx: gate.tx,
                    ty: gate.ty,
                });
            }
        }

        Ok(())
    }
}

fn check_layer(layer: &'static str, expected: usize, actual: usize) -> Result<(), LevelError> {
    if expected != actual {
        return Err(LevelError::DimensionMismatch {
            layer,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_tiles_are_clipped() {
        let dims = Dimensions {
            width: 3,
            height: 2,
        };
        let rect = TileRect::new(1, 0, 4, 4);
        let tiles: Vec<_> = rect.tiles(dims).collect();
        assert_eq!(tiles, vec![(1, 0), (2, 0), (1, 1), (2, 1)]);
    }

    #[test]
    fn gate_defaults_from_json() {
        let gate: GateConfig = serde_json::from_str(r#"{"tx": 2, "ty": 3}"#).unwrap();
        assert_eq!(gate.id, GENERIC_GATE_ID);
        assert_eq!(gate.open_tile, tiles::DOOR_OPEN);
        assert_eq!(gate.sealed_tile, tiles::SEALED_WALL);
        assert!(gate.required_item.is_none());
    }
}
