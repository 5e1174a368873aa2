//! Game configuration, read from TOML.
//!
//! Every field has a default, so a missing file or a partial one is fine.

use anyhow::{Context, Result};
use error::GameError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Tile edge length in world pixels
    pub tile_size: f32,
    pub levels_dir: PathBuf,
    /// Level to start a new game on; defaults to the first in the library
    pub start_level: Option<String>,
    pub log_level: String,
    /// Seed for NPC wandering; random when unset
    pub seed: Option<u64>,
    pub interaction: InteractionConfig,
    pub save: SaveConfig,
    pub player: PlayerConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_size: world::DEFAULT_TILE_SIZE,
            levels_dir: PathBuf::from("levels"),
            start_level: None,
            log_level: "info".to_string(),
            seed: None,
            interaction: InteractionConfig::default(),
            save: SaveConfig::default(),
            player: PlayerConfig::default(),
        }
    }
}

/// Interaction ranges, in world pixels unless noted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub npc_radius: f32,
    pub safe_radius: f32,
    pub gate_radius: f32,
    /// Chebyshev distance in tiles
    pub switch_tiles: i32,
    pub pickup_radius: f32,
    /// Open dialogue closes once the NPC is further than this
    pub dialogue_close_radius: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            npc_radius: 40.0,
            safe_radius: 36.0,
            gate_radius: 26.0,
            switch_tiles: 1,
            pickup_radius: 28.0,
            dialogue_close_radius: 72.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    pub directory: PathBuf,
    pub key_prefix: String,
    pub slot_count: usize,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("saves"),
            key_prefix: "gloamfall_".to_string(),
            slot_count: 3,
        }
    }
}

impl SaveConfig {
    /// Slot ids offered by the load menu: "1" ..= slot_count
    pub fn slot_ids(&self) -> Vec<String> {
        (1..=self.slot_count).map(|n| n.to_string()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub size: f32,
    pub speed: f32,
    pub max_health: u32,
    pub inventory_capacity: usize,
    /// Ammo counter spent by the ranged attack
    pub ammo_kind: String,
    pub projectile_damage: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            size: hero::DEFAULT_PLAYER_SIZE,
            speed: hero::DEFAULT_PLAYER_SPEED,
            max_health: hero::DEFAULT_MAX_HEALTH,
            inventory_capacity: hero::DEFAULT_INVENTORY_CAPACITY,
            ammo_kind: "pebble".to_string(),
            projectile_damage: combat::constants::PROJECTILE_DAMAGE,
        }
    }
}

impl GameConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, GameError> {
        let config: Self =
            toml::from_str(source).map_err(|e| GameError::Config(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults when `path` does not exist, an error when it exists but is
    /// malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&source)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    fn validate(&self) -> Result<(), GameError> {
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(GameError::Config("tile_size must be positive".into()));
        }
        if self.save.slot_count == 0 {
            return Err(GameError::Config("save.slot_count must be at least 1".into()));
        }
        if self.player.inventory_capacity == 0 {
            return Err(GameError::Config(
                "player.inventory_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = GameConfig::from_toml_str(
            r#"
            tile_size = 16.0

            [interaction]
            npc_radius = 50.0

            [save]
            slot_count = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.tile_size, 16.0);
        assert_eq!(config.interaction.npc_radius, 50.0);
        assert_eq!(config.interaction.gate_radius, 26.0);
        assert_eq!(config.interaction.switch_tiles, 1);
        assert_eq!(config.save.slot_ids().len(), 5);
        assert_eq!(config.player, PlayerConfig::default());
    }

    #[test]
    fn bad_values_are_config_errors() {
        assert!(matches!(
            GameConfig::from_toml_str("tile_size = -1.0"),
            Err(GameError::Config(_))
        ));
        assert!(matches!(
            GameConfig::from_toml_str("tile_size = \"big\""),
            Err(GameError::Config(_))
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GameConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, GameConfig::default());
    }
}
