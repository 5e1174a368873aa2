//! Runtime state of one level.
//!
//! The instance keeps the blueprint's base layers untouched and derives every
//! mutable array from them in [`LevelInstance::reset_state`]. Persisted state
//! only records *what happened* (gate opened, switches used, tiles destroyed)
//! and is replayed on top of a fresh reset, so derived tile arrays never get
//! serialized directly.

use error::LevelError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

use crate::blueprint::{GENERIC_GATE_ID, LevelBlueprint, LevelMeta, TileRect};
use crate::tiles::{self, TileId, TileRegistry};

/// Shrinks the far edges of a collision box so a box exactly one tile wide
/// fits inside that tile.
const EDGE_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, PartialEq)]
pub struct LightSwitch {
    pub id: String,
    pub tx: i32,
    pub ty: i32,
    pub activated: bool,
    pub lights: Vec<TileRect>,
}

/// Result of toggling a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchToggle {
    pub activated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateState {
    pub id: String,
    pub locked: bool,
    pub tx: i32,
    pub ty: i32,
    pub open_tile: TileId,
    pub sealed_tile_indices: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightingSnapshot {
    #[serde(default)]
    pub activated_switch_ids: Vec<String>,
}

/// Persisted level mutations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStateSnapshot {
    #[serde(default)]
    pub gate_unlocked: bool,
    #[serde(default)]
    pub lighting: LightingSnapshot,
    #[serde(default)]
    pub destroyed_tiles: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct LevelInstance {
    blueprint: LevelBlueprint,
    registry: Arc<TileRegistry>,
    tile_size: f32,
    collision_tiles: Vec<TileId>,
    decor_tiles: Vec<TileId>,
    /// Destructible tile index -> remaining hits
    destructible_tiles: BTreeMap<usize, u32>,
    destroyed_tiles: BTreeSet<usize>,
    light_tiles: Vec<bool>,
    light_switches: Vec<LightSwitch>,
    gate: Option<GateState>,
}

impl LevelInstance {
    /// Build a level. Fails fast on malformed layer dimensions.
    pub fn new(
        blueprint: LevelBlueprint,
        registry: Arc<TileRegistry>,
        tile_size: f32,
    ) -> Result<Self, LevelError> {
        blueprint.validate()?;

        let mut level = Self {
            blueprint,
            registry,
            tile_size,
            collision_tiles: Vec::new(),
            decor_tiles: Vec::new(),
            destructible_tiles: BTreeMap::new(),
            destroyed_tiles: BTreeSet::new(),
            light_tiles: Vec::new(),
            light_switches: Vec::new(),
            gate: None,
        };
        level.reset_state();
        Ok(level)
    }

    /// Reinitialise every derived array from the blueprint's base layers.
    pub fn reset_state(&mut self) {
        let layers = &self.blueprint.tile_layers;
        let dims = self.blueprint.dimensions;

        self.collision_tiles = layers.collision.clone();
        self.decor_tiles = layers.decor.clone();
        self.destroyed_tiles.clear();
        self.destructible_tiles = self
            .decor_tiles
            .iter()
            .enumerate()
            .filter(|(_, id)| **id == tiles::DESTROY_OVERLAY)
            .map(|(index, _)| (index, layers.destructible_hits.max(1)))
            .collect();

        self.light_tiles = vec![false; dims.tile_count()];
        for zone in &self.blueprint.lighting.lit_zones {
            for (tx, ty) in zone.tiles(dims) {
                let index = (ty as u32 * dims.width + tx as u32) as usize;
                self.light_tiles[index] = true;
            }
        }

        self.light_switches = self
            .blueprint
            .lighting
            .switches
            .iter()
            .map(|config| LightSwitch {
                id: config.id.clone(),
                tx: config.tx,
                ty: config.ty,
                activated: false,
                lights: config.lights.clone(),
            })
            .collect();

        self.gate = self.blueprint.gate.as_ref().map(|config| {
            let sealed_tile_indices = self
                .collision_tiles
                .iter()
                .enumerate()
                .filter(|(_, id)| **id == config.sealed_tile)
                .map(|(index, _)| index)
                .collect();
            GateState {
                id: config.id.clone(),
                locked: true,
                tx: config.tx,
                ty: config.ty,
                open_tile: config.open_tile,
                sealed_tile_indices,
            }
        });
        if let Some(config) = &self.blueprint.gate {
            let index = (config.ty as u32 * dims.width + config.tx as u32) as usize;
            self.collision_tiles[index] = config.locked_tile;
        }
    }

    pub fn meta(&self) -> &LevelMeta {
        &self.blueprint.meta
    }

    pub fn id(&self) -> &str {
        &self.blueprint.meta.id
    }

    pub fn blueprint(&self) -> &LevelBlueprint {
        &self.blueprint
    }

    pub fn width(&self) -> u32 {
        self.blueprint.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.blueprint.dimensions.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn world_width(&self) -> f32 {
        self.width() as f32 * self.tile_size
    }

    pub fn world_height(&self) -> f32 {
        self.height() as f32 * self.tile_size
    }

    pub fn collision_tiles(&self) -> &[TileId] {
        &self.collision_tiles
    }

    pub fn decor_tiles(&self) -> &[TileId] {
        &self.decor_tiles
    }

    pub fn light_tiles(&self) -> &[bool] {
        &self.light_tiles
    }

    /// World coordinates to tile coordinates (floor division)
    pub fn world_to_tile(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.tile_size).floor() as i32,
            (y / self.tile_size).floor() as i32,
        )
    }

    /// Centre of a tile in world coordinates
    pub fn tile_center(&self, tx: i32, ty: i32) -> (f32, f32) {
        (
            (tx as f32 + 0.5) * self.tile_size,
            (ty as f32 + 0.5) * self.tile_size,
        )
    }

    pub fn tile_index(&self, tx: i32, ty: i32) -> Option<usize> {
        if !self.blueprint.dimensions.contains(tx, ty) {
            return None;
        }
        Some((ty as u32 * self.width() + tx as u32) as usize)
    }

    fn world_index(&self, x: f32, y: f32) -> Option<usize> {
        let (tx, ty) = self.world_to_tile(x, y);
        self.tile_index(tx, ty)
    }

    /// Collision tile under a world position
    pub fn tile_at(&self, x: f32, y: f32) -> Option<TileId> {
        self.world_index(x, y).map(|i| self.collision_tiles[i])
    }

    pub fn collision_at_tile(&self, tx: i32, ty: i32) -> Option<TileId> {
        self.tile_index(tx, ty).map(|i| self.collision_tiles[i])
    }

    pub fn decor_at_tile(&self, tx: i32, ty: i32) -> Option<TileId> {
        self.tile_index(tx, ty).map(|i| self.decor_tiles[i])
    }

    /// Out-of-bounds tiles always block.
    pub fn is_blocking_tile(&self, tx: i32, ty: i32) -> bool {
        match self.collision_at_tile(tx, ty) {
            Some(id) => self.registry.is_blocking(id),
            None => true,
        }
    }

    /// True iff every corner of a `size`x`size` box centred on `(x, y)` lands
    /// on a non-blocking tile.
    pub fn can_move(&self, size: f32, x: f32, y: f32) -> bool {
        let half = size / 2.0;
        let left = x - half;
        let top = y - half;
        let right = (x + half - EDGE_EPSILON).max(left);
        let bottom = (y + half - EDGE_EPSILON).max(top);

        [(left, top), (right, top), (left, bottom), (right, bottom)]
            .into_iter()
            .all(|(cx, cy)| {
                let (tx, ty) = self.world_to_tile(cx, cy);
                !self.is_blocking_tile(tx, ty)
            })
    }

    pub fn is_destructible_at(&self, x: f32, y: f32) -> bool {
        self.world_index(x, y)
            .is_some_and(|i| self.destructible_tiles.contains_key(&i))
    }

    pub fn destructible_count(&self) -> usize {
        self.destructible_tiles.len()
    }

    /// Damage the tile under `(x, y)`. Returns whether damage was applied.
    pub fn damage_tile_at(&mut self, x: f32, y: f32, amount: u32) -> bool {
        match self.world_index(x, y) {
            Some(index) => self.damage_tile_index(index, amount),
            None => false,
        }
    }

    fn damage_tile_index(&mut self, index: usize, amount: u32) -> bool {
        if amount == 0 {
            return false;
        }
        let Some(remaining) = self.destructible_tiles.get_mut(&index) else {
            return false;
        };
        *remaining = remaining.saturating_sub(amount);
        if *remaining == 0 {
            self.destroy_tile(index);
        }
        true
    }

    fn destroy_tile(&mut self, index: usize) {
        let floor = self.resolved_destroyed_floor(index);
        self.collision_tiles[index] = floor;
        self.decor_tiles[index] = floor;
        self.destructible_tiles.remove(&index);
        self.destroyed_tiles.insert(index);
        debug!(level = %self.id(), index, floor, "tile_destroyed");
    }

    /// Floor a destroyed tile turns into: per-tile override, then the level
    /// default, then plain floor.
    pub fn resolved_destroyed_floor(&self, index: usize) -> TileId {
        let layers = &self.blueprint.tile_layers;
        layers
            .destroyed_floors
            .as_ref()
            .and_then(|floors| floors.get(index).copied())
            .filter(|id| *id != tiles::EMPTY)
            .or(layers.destroyed_floor_tile)
            .unwrap_or(tiles::FLOOR)
    }

    /// Out-of-bounds is always dark.
    pub fn is_lit_at(&self, x: f32, y: f32) -> bool {
        self.world_index(x, y).is_some_and(|i| self.light_tiles[i])
    }

    pub fn light_switches(&self) -> &[LightSwitch] {
        &self.light_switches
    }

    pub fn light_switch(&self, id: &str) -> Option<&LightSwitch> {
        self.light_switches.iter().find(|s| s.id == id)
    }

    pub fn light_switch_at_tile(&self, tx: i32, ty: i32) -> Option<&LightSwitch> {
        self.light_switches.iter().find(|s| s.tx == tx && s.ty == ty)
    }

    /// Closest switch within `max_tiles` (Chebyshev distance in tiles)
    pub fn nearest_switch(&self, x: f32, y: f32, max_tiles: i32) -> Option<&LightSwitch> {
        let (tx, ty) = self.world_to_tile(x, y);
        self.light_switches
            .iter()
            .map(|s| (s, (s.tx - tx).abs().max((s.ty - ty).abs())))
            .filter(|(_, distance)| *distance <= max_tiles)
            .min_by_key(|(_, distance)| *distance)
            .map(|(s, _)| s)
    }

    /// Activate a switch and light its zones. Returns `true` on first
    /// activation. Switches never deactivate.
    pub fn activate_light_switch(&mut self, id: &str) -> bool {
        let dims = self.blueprint.dimensions;
        let Some(switch) = self.light_switches.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        if switch.activated {
            return false;
        }
        switch.activated = true;
        for zone in &switch.lights {
            for (tx, ty) in zone.tiles(dims) {
                let index = (ty as u32 * dims.width + tx as u32) as usize;
                self.light_tiles[index] = true;
            }
        }
        debug!(level = %self.blueprint.meta.id, switch = id, "light_switch_activated");
        true
    }

    /// Interact with a switch. Lighting is one-way: an activated switch stays
    /// activated and its zones stay lit.
    pub fn toggle_light_switch(&mut self, id: &str) -> Option<SwitchToggle> {
        self.light_switch(id)?;
        self.activate_light_switch(id);
        Some(SwitchToggle { activated: true })
    }

    pub fn gate(&self) -> Option<&GateState> {
        self.gate.as_ref()
    }

    pub fn gate_world_center(&self) -> Option<(f32, f32)> {
        self.gate.as_ref().map(|g| self.tile_center(g.tx, g.ty))
    }

    /// Unlock the gate when `target_id` names it (or is the generic `gate`).
    /// Returns whether the target matched.
    pub fn unlock_gate(&mut self, target_id: &str) -> bool {
        let width = self.width();
        let Some(gate) = self.gate.as_mut() else {
            return false;
        };
        if target_id != gate.id && target_id != GENERIC_GATE_ID {
            return false;
        }
        if !gate.locked {
            return true;
        }
        gate.locked = false;

        let gate_index = (gate.ty as u32 * width + gate.tx as u32) as usize;
        self.collision_tiles[gate_index] = gate.open_tile;

        let mask = self.blueprint.tile_layers.unlock_mask.as_ref();
        for &index in &gate.sealed_tile_indices {
            let restored = mask
                .and_then(|m| m.get(index).copied())
                .filter(|id| *id != tiles::EMPTY)
                .unwrap_or(tiles::FLOOR);
            self.collision_tiles[index] = restored;
        }
        debug!(level = %self.blueprint.meta.id, gate = %gate.id, "gate_unlocked");
        true
    }

    pub fn is_gate_locked(&self) -> bool {
        self.gate.as_ref().is_some_and(|g| g.locked)
    }

    pub fn serialize_state(&self) -> LevelStateSnapshot {
        LevelStateSnapshot {
            gate_unlocked: self.gate.as_ref().is_some_and(|g| !g.locked),
            lighting: LightingSnapshot {
                activated_switch_ids: self
                    .light_switches
                    .iter()
                    .filter(|s| s.activated)
                    .map(|s| s.id.clone())
                    .collect(),
            },
            destroyed_tiles: self.destroyed_tiles.iter().copied().collect(),
        }
    }

    /// Reset, then replay the recorded mutations.
    pub fn restore_state(&mut self, snapshot: &LevelStateSnapshot) {
        self.reset_state();
        if snapshot.gate_unlocked {
            if let Some(id) = self.gate.as_ref().map(|g| g.id.clone()) {
                self.unlock_gate(&id);
            }
        }
        for id in &snapshot.lighting.activated_switch_ids {
            self.activate_light_switch(id);
        }
        for &index in &snapshot.destroyed_tiles {
            if self.destructible_tiles.contains_key(&index) {
                self.destroy_tile(index);
            }
        }
    }
}
