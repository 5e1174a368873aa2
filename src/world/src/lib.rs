//! Level geometry: tile registry, level blueprints and the runtime level
//! instance (collision, destructible terrain, lighting and the gate).

pub mod blueprint;
pub mod level;
pub mod tiles;

pub use blueprint::{
    Dimensions, GENERIC_GATE_ID, GateConfig, LevelBlueprint, LevelMeta, LightSwitchConfig,
    LightingConfig, TileLayers, TileRect,
};
pub use level::{
    GateState, LevelInstance, LevelStateSnapshot, LightSwitch, LightingSnapshot, SwitchToggle,
};
pub use tiles::{TileCategory, TileDef, TileId, TileRegistry};

/// Default tile edge length in world pixels
pub const DEFAULT_TILE_SIZE: f32 = 32.0;
