//! Level content: the JSON level format and the library of levels.

use anyhow::{Context, Result};
use combat::NpcPlacement;
use error::LevelError;
use quests::QuestConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::info;
use world::{
    Dimensions, GateConfig, LevelBlueprint, LevelMeta, LightSwitchConfig, LightingConfig,
    TileLayers,
};

use crate::actions::{Action, RewardContext};
use crate::dialogue::NpcScript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePoint {
    pub tx: i32,
    pub ty: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeConfig {
    pub id: String,
    pub tx: i32,
    pub ty: i32,
    #[serde(default)]
    pub required_item: Option<String>,
    #[serde(default)]
    pub required_flag: Option<String>,
    /// Take the required item when the safe opens
    #[serde(default)]
    pub consume_item: bool,
    /// Reward id run when the safe opens
    pub reward: String,
    #[serde(default)]
    pub locked_prompt: Option<String>,
    #[serde(default)]
    pub opened_line: Option<String>,
}

/// A floor plate that runs its actions the first time it is stepped on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressureSwitchConfig {
    pub id: String,
    pub tx: i32,
    pub ty: i32,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl PressureSwitchConfig {
    /// Flag recording that the plate has fired
    pub fn fired_flag(&self) -> String {
        format!("pressureSwitch:{}", self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interactables {
    #[serde(default)]
    pub gate: Option<GateConfig>,
    /// Light switches placed as interactables; merged with `lighting.switches`
    #[serde(default)]
    pub switches: Vec<LightSwitchConfig>,
    #[serde(default)]
    pub safes: Vec<SafeConfig>,
    #[serde(default)]
    pub pressure_switches: Vec<PressureSwitchConfig>,
}

/// Decorative actor for the renderer; no gameplay behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropPlacement {
    pub id: String,
    pub sprite: String,
    pub tx: i32,
    pub ty: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actors {
    pub player_start: TilePoint,
    #[serde(default)]
    pub npcs: Vec<NpcPlacement>,
    #[serde(default)]
    pub props: Vec<PropPlacement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupConfig {
    pub id: String,
    pub tx: i32,
    pub ty: i32,
    pub item: String,
    #[serde(default = "default_amount")]
    pub amount: u32,
    /// Counts towards the level's objective counter
    #[serde(default)]
    pub objective: bool,
    #[serde(default = "default_true")]
    pub store_in_inventory: bool,
}

fn default_amount() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Named action list with fallbacks shown when it is withheld
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub blocked_dialogue: Option<String>,
    #[serde(default)]
    pub blocked_note: Option<String>,
}

impl Reward {
    pub fn context(&self) -> RewardContext<'_> {
        RewardContext {
            blocked_dialogue: self.blocked_dialogue.as_deref(),
            blocked_note: self.blocked_note.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelConfig {
    pub meta: LevelMeta,
    pub dimensions: Dimensions,
    pub tile_layers: TileLayers,
    #[serde(default)]
    pub lighting: LightingConfig,
    #[serde(default)]
    pub interactables: Interactables,
    pub actors: Actors,
    #[serde(default)]
    pub pickups: Vec<PickupConfig>,
    #[serde(default)]
    pub rewards: BTreeMap<String, Reward>,
    #[serde(default)]
    pub quests: Vec<QuestConfig>,
    /// Scripts keyed by NPC template id
    #[serde(default)]
    pub npc_scripts: BTreeMap<String, NpcScript>,
}

impl LevelConfig {
    /// Parse and validate. Parse errors carry the JSON path of the fault.
    pub fn from_json_str(json: &str) -> Result<Self, LevelError> {
        let de = &mut serde_json::Deserializer::from_str(json);
        let config: Self = serde_path_to_error::deserialize(de).map_err(|err| LevelError::Parse {
            path: err.path().to_string(),
            message: err.inner().to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    /// Geometry, lighting (with interactable switches merged in) and gate
    pub fn blueprint(&self) -> LevelBlueprint {
        let mut lighting = self.lighting.clone();
        lighting
            .switches
            .extend(self.interactables.switches.iter().cloned());
        LevelBlueprint {
            meta: self.meta.clone(),
            dimensions: self.dimensions,
            tile_layers: self.tile_layers.clone(),
            lighting,
            gate: self.interactables.gate.clone(),
        }
    }

    pub fn reward(&self, id: &str) -> Option<&Reward> {
        self.rewards.get(id)
    }

    pub fn safe(&self, id: &str) -> Option<&SafeConfig> {
        self.interactables.safes.iter().find(|s| s.id == id)
    }

    pub fn objective_total(&self) -> u32 {
        self.pickups.iter().filter(|p| p.objective).count() as u32
    }

    pub fn validate(&self) -> Result<(), LevelError> {
        self.blueprint().validate()?;
        let dims = self.dimensions;

        let in_bounds = |what: String, tx: i32, ty: i32| {
            if dims.contains(tx, ty) {
                Ok(())
            } else {
                Err(LevelError::OutOfBounds { what, tx, ty })
            }
        };
        let start = self.actors.player_start;
        in_bounds("player start".into(), start.tx, start.ty)?;

        unique("npc", self.actors.npcs.iter().map(|n| n.id.as_str()))?;
        for npc in &self.actors.npcs {
            in_bounds(format!("npc `{}`", npc.id), npc.tx, npc.ty)?;
        }
        unique("pickup", self.pickups.iter().map(|p| p.id.as_str()))?;
        for pickup in &self.pickups {
            in_bounds(format!("pickup `{}`", pickup.id), pickup.tx, pickup.ty)?;
        }
        unique("safe", self.interactables.safes.iter().map(|s| s.id.as_str()))?;
        for safe in &self.interactables.safes {
            in_bounds(format!("safe `{}`", safe.id), safe.tx, safe.ty)?;
        }
        unique(
            "pressure switch",
            self.interactables.pressure_switches.iter().map(|p| p.id.as_str()),
        )?;
        for plate in &self.interactables.pressure_switches {
            in_bounds(format!("pressure switch `{}`", plate.id), plate.tx, plate.ty)?;
        }
        unique("quest", self.quests.iter().map(|q| q.id.as_str()))?;
        Ok(())
    }
}

fn unique<'a>(kind: &'static str, ids: impl Iterator<Item = &'a str>) -> Result<(), LevelError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(LevelError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

/// All levels of the game, in play order
#[derive(Debug, Clone, Default)]
pub struct LevelLibrary {
    levels: Vec<LevelConfig>,
}

impl LevelLibrary {
    /// Order by `meta.levelNumber` (unnumbered last), then id
    pub fn from_levels(mut levels: Vec<LevelConfig>) -> Result<Self, LevelError> {
        unique("level", levels.iter().map(|l| l.id()))?;
        levels.sort_by(|a, b| {
            let key = |l: &LevelConfig| (l.meta.level_number.unwrap_or(u32::MAX), l.id().to_string());
            key(a).cmp(&key(b))
        });
        Ok(Self { levels })
    }

    /// Load every `*.json` file in `dir`
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read level directory {}", dir.display()))?;
        let mut levels = Vec::new();
        for entry in entries {
            let path = entry.context("Failed to read directory entry")?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let level = LevelConfig::from_path(&path)
                    .with_context(|| format!("Invalid level file {}", path.display()))?;
                levels.push(level);
            }
        }
        let library = Self::from_levels(levels)?;
        info!(dir = %dir.display(), count = library.len(), "levels_loaded");
        Ok(library)
    }

    pub fn get(&self, id: &str) -> Option<&LevelConfig> {
        self.levels.iter().find(|l| l.id() == id)
    }

    pub fn first(&self) -> Option<&LevelConfig> {
        self.levels.first()
    }

    pub fn next_after(&self, id: &str) -> Option<&LevelConfig> {
        let index = self.levels.iter().position(|l| l.id() == id)?;
        self.levels.get(index + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelConfig> {
        self.levels.iter()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) const YARD: &str = r#"{
        "meta": { "id": "yard", "name": "Yard", "levelNumber": 2 },
        "dimensions": { "width": 3, "height": 1 },
        "tileLayers": { "collision": [2, 1, 1], "decor": [0, 0, 0] },
        "actors": { "playerStart": { "tx": 1, "ty": 0 } }
    }"#;

    fn with_id(json: &str, id: &str, number: Option<u32>) -> LevelConfig {
        let mut level = LevelConfig::from_json_str(json).unwrap();
        level.meta.id = id.into();
        level.meta.level_number = number;
        level
    }

    #[test]
    fn parses_minimal_level() {
        let level = LevelConfig::from_json_str(YARD).unwrap();
        assert_eq!(level.id(), "yard");
        assert_eq!(level.meta.level_number, Some(2));
        assert!(level.interactables.gate.is_none());
        assert_eq!(level.objective_total(), 0);
    }

    #[test]
    fn layer_mismatch_is_fatal() {
        let json = YARD.replace("[0, 0, 0]", "[0, 0]");
        let err = LevelConfig::from_json_str(&json).unwrap_err();
        assert!(matches!(
            err,
            LevelError::DimensionMismatch {
                layer: "decor",
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn parse_error_reports_path() {
        let json = YARD.replace("\"width\": 3", "\"width\": \"three\"");
        match LevelConfig::from_json_str(&json).unwrap_err() {
            LevelError::Parse { path, .. } => assert_eq!(path, "dimensions.width"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn player_start_must_be_inside() {
        let json = YARD.replace("\"tx\": 1", "\"tx\": 9");
        assert!(matches!(
            LevelConfig::from_json_str(&json),
            Err(LevelError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn interactable_switches_join_lighting() {
        let json = YARD.replace(
            "\"actors\"",
            r#""interactables": { "switches": [ { "id": "lamp", "tx": 2, "ty": 0, "lights": [] } ] },
            "actors""#,
        );
        let level = LevelConfig::from_json_str(&json).unwrap();
        let blueprint = level.blueprint();
        assert_eq!(blueprint.lighting.switches.len(), 1);
        assert_eq!(blueprint.lighting.switches[0].id, "lamp");
    }

    #[test]
    fn library_orders_by_level_number() {
        let library = LevelLibrary::from_levels(vec![
            with_id(YARD, "c", None),
            with_id(YARD, "b", Some(2)),
            with_id(YARD, "a", Some(1)),
        ])
        .unwrap();
        let ids: Vec<&str> = library.iter().map(|l| l.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(library.first().map(|l| l.id()), Some("a"));
        assert_eq!(library.next_after("b").map(|l| l.id()), Some("c"));
        assert!(library.next_after("c").is_none());
    }

    #[test]
    fn library_rejects_duplicate_ids() {
        let result = LevelLibrary::from_levels(vec![with_id(YARD, "a", None), with_id(YARD, "a", None)]);
        assert!(matches!(result, Err(LevelError::DuplicateId { kind: "level", .. })));
    }
}
