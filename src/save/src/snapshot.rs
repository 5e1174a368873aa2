//! Persisted save schema.

use combat::{NpcState, Projectile};
use hero::{Inventory, PlayerState, PlayerVitals};
use quests::PersistentState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use world::LevelStateSnapshot;

/// Current save format version
pub const SAVE_VERSION: u32 = 3;

/// Keys every persisted level snapshot must carry
pub const EXPECTED_SNAPSHOT_KEYS: [&str; 12] = [
    "objectivesCollected",
    "inventory",
    "levelState",
    "playerState",
    "playerVitals",
    "projectiles",
    "pickups",
    "npcs",
    "safes",
    "sessionState",
    "persistentState",
    "savedAt",
];

/// Progress through an NPC's quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizProgress {
    pub npc_id: String,
    pub question: usize,
}

/// Session bookkeeping. Dialogue, quiz and timer fields are presentation
/// state and never survive a load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionStateData {
    pub area: String,
    pub subtitle: Option<String>,
    pub level_number: Option<u32>,
    pub level_advance_queued: bool,
    pub pending_cutscenes: Vec<String>,
    pub active_npc: Option<String>,
    pub active_speaker: String,
    pub active_line: Option<String>,
    pub dialogue_time: f32,
    pub active_quiz: Option<QuizProgress>,
}

impl SessionStateData {
    pub fn clear_transient(&mut self) {
        self.active_npc = None;
        self.active_speaker.clear();
        self.active_line = None;
        self.dialogue_time = 0.0;
        self.active_quiz = None;
    }

    pub fn has_open_dialogue(&self) -> bool {
        self.active_line.is_some()
    }
}

/// An uncollected pickup still lying in the level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupData {
    pub id: String,
    pub item: String,
    #[serde(default = "default_amount")]
    pub amount: u32,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub objective: bool,
    #[serde(default = "default_store")]
    pub store_in_inventory: bool,
}

fn default_amount() -> u32 {
    1
}

fn default_store() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeData {
    pub id: String,
    #[serde(default)]
    pub opened: bool,
}

/// Everything needed to resume one level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSnapshot {
    pub objectives_collected: u32,
    pub inventory: Inventory,
    pub level_state: LevelStateSnapshot,
    pub player_state: PlayerState,
    pub player_vitals: PlayerVitals,
    pub projectiles: Vec<Projectile>,
    pub pickups: Vec<PickupData>,
    pub npcs: Vec<NpcState>,
    pub safes: Vec<SafeData>,
    pub session_state: SessionStateData,
    pub persistent_state: PersistentState,
    /// Unix millis
    pub saved_at: u64,
}

/// One slot's worth of progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    pub version: u32,
    #[serde(default)]
    pub progress: BTreeMap<String, LevelSnapshot>,
    #[serde(default)]
    pub current_level_id: Option<String>,
    pub slot_id: String,
    #[serde(default)]
    pub saved_at: u64,
}

impl SavePayload {
    pub fn empty(slot_id: &str) -> Self {
        Self {
            version: SAVE_VERSION,
            progress: BTreeMap::new(),
            current_level_id: None,
            slot_id: slot_id.to_string(),
            saved_at: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.progress.is_empty()
    }

    pub fn current_snapshot(&self) -> Option<&LevelSnapshot> {
        self.current_level_id
            .as_ref()
            .and_then(|id| self.progress.get(id))
    }
}

/// Listing entry for the load menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSummary {
    pub slot_id: String,
    pub current_level_id: Option<String>,
    pub saved_at: u64,
    pub level_count: usize,
}

impl From<&SavePayload> for SlotSummary {
    fn from(payload: &SavePayload) -> Self {
        Self {
            slot_id: payload.slot_id.clone(),
            current_level_id: payload.current_level_id.clone(),
            saved_at: payload.saved_at,
            level_count: payload.progress.len(),
        }
    }
}
