//! ActionEngine: ordered, short-circuiting side effects attached to
//! dialogue lines, rewards, safes and pressure switches.
//!
//! Sequences are not transactional. When an action fails, the actions before
//! it stay applied and the rest are skipped.

use hero::{Inventory, InventoryError};
use quests::{FlagValue, PersistentState};
use save::SessionStateData;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, warn};
use world::LevelInstance;

/// Item handed out by `giveItem`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemGrant {
    pub id: String,
    #[serde(default = "default_amount")]
    pub amount: u32,
    /// `false` routes the grant to the ammo counter of the same id
    #[serde(default = "default_true")]
    pub store_in_inventory: bool,
}

fn default_amount() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    GiveItem {
        item: ItemGrant,
    },
    ConsumeItem {
        item: String,
        #[serde(default = "default_amount")]
        amount: u32,
    },
    Unlock {
        target: String,
    },
    ClearObjectives,
    SetFlag {
        flag: String,
        value: FlagValue,
    },
    SetArea {
        area: String,
    },
    SetLevelNumber {
        level_number: u32,
    },
    SetSubtitle {
        subtitle: String,
    },
    PlayCutscene {
        cutscene: String,
    },
}

/// Handler key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum ActionKind {
    GiveItem,
    ConsumeItem,
    Unlock,
    ClearObjectives,
    SetFlag,
    SetArea,
    SetLevelNumber,
    SetSubtitle,
    PlayCutscene,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::GiveItem { .. } => ActionKind::GiveItem,
            Action::ConsumeItem { .. } => ActionKind::ConsumeItem,
            Action::Unlock { .. } => ActionKind::Unlock,
            Action::ClearObjectives => ActionKind::ClearObjectives,
            Action::SetFlag { .. } => ActionKind::SetFlag,
            Action::SetArea { .. } => ActionKind::SetArea,
            Action::SetLevelNumber { .. } => ActionKind::SetLevelNumber,
            Action::SetSubtitle { .. } => ActionKind::SetSubtitle,
            Action::PlayCutscene { .. } => ActionKind::PlayCutscene,
        }
    }
}

/// Mutable session state an action may touch
pub struct ActionContext<'a> {
    pub inventory: &'a mut Inventory,
    pub level: &'a mut LevelInstance,
    pub persistent: &'a mut PersistentState,
    pub session: &'a mut SessionStateData,
    pub objectives_collected: &'a mut u32,
}

/// What a single handler reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub success: bool,
    pub note: Option<String>,
    pub blocked_dialogue: Option<String>,
    pub blocked_note: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            note: None,
            blocked_dialogue: None,
            blocked_note: None,
        }
    }

    pub fn noted(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Self::ok()
        }
    }

    pub fn blocked(note: impl Into<String>) -> Self {
        Self {
            success: false,
            blocked_note: Some(note.into()),
            ..Self::ok()
        }
    }
}

/// Reward-level fallbacks used when a failing handler gives no reason
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardContext<'a> {
    pub blocked_dialogue: Option<&'a str>,
    pub blocked_note: Option<&'a str>,
}

/// Result of a whole sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    pub note: Option<String>,
    pub blocked_dialogue: Option<String>,
    pub blocked_note: Option<String>,
}

pub type ActionHandler = fn(&Action, &mut ActionContext<'_>) -> ActionResult;

/// Action kind → handler table, built once at startup
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<ActionKind, ActionHandler>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    pub fn register_defaults(&mut self) {
        self.register(ActionKind::GiveItem, give_item);
        self.register(ActionKind::ConsumeItem, consume_item);
        self.register(ActionKind::Unlock, unlock);
        self.register(ActionKind::ClearObjectives, clear_objectives);
        self.register(ActionKind::SetFlag, set_flag);
        self.register(ActionKind::SetArea, set_area);
        self.register(ActionKind::SetLevelNumber, set_level_number);
        self.register(ActionKind::SetSubtitle, set_subtitle);
        self.register(ActionKind::PlayCutscene, play_cutscene);
    }

    pub fn register(&mut self, kind: ActionKind, handler: ActionHandler) {
        self.handlers.insert(kind, handler);
    }

    pub fn has(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Run `actions` in order, stopping at the first failure.
    pub fn run_actions(
        &self,
        actions: &[Action],
        ctx: &mut ActionContext<'_>,
        reward: RewardContext<'_>,
    ) -> ActionOutcome {
        let mut notes = Vec::new();

        for action in actions {
            let Some(handler) = self.handlers.get(&action.kind()) else {
                warn!(kind = %action.kind(), "action_handler_missing");
                continue;
            };
            let result = handler(action, ctx);
            if let Some(note) = result.note {
                notes.push(note);
            }
            if !result.success {
                debug!(kind = %action.kind(), "action_sequence_blocked");
                return ActionOutcome {
                    success: false,
                    note: join_notes(notes),
                    blocked_dialogue: result
                        .blocked_dialogue
                        .or_else(|| reward.blocked_dialogue.map(str::to_string)),
                    blocked_note: result
                        .blocked_note
                        .or_else(|| reward.blocked_note.map(str::to_string)),
                };
            }
        }

        ActionOutcome {
            success: true,
            note: join_notes(notes),
            blocked_dialogue: None,
            blocked_note: None,
        }
    }
}

fn join_notes(notes: Vec<String>) -> Option<String> {
    if notes.is_empty() {
        None
    } else {
        Some(notes.join("\n"))
    }
}

fn give_item(action: &Action, ctx: &mut ActionContext<'_>) -> ActionResult {
    let Action::GiveItem { item } = action else {
        return ActionResult::ok();
    };
    if !item.store_in_inventory {
        ctx.inventory.add_ammo(&item.id, item.amount);
        return ActionResult::noted(format!("+{} {}", item.amount, item.id));
    }
    match ctx.inventory.add(&item.id, item.amount) {
        Ok(_) => ActionResult::noted(format!("Received {} x{}", item.id, item.amount)),
        Err(InventoryError::Full) => ActionResult::blocked("Inventory full"),
        Err(err) => ActionResult::blocked(err.to_string()),
    }
}

fn consume_item(action: &Action, ctx: &mut ActionContext<'_>) -> ActionResult {
    let Action::ConsumeItem { item, amount } = action else {
        return ActionResult::ok();
    };
    match ctx.inventory.remove(item, *amount) {
        Ok(_) => ActionResult::ok(),
        Err(_) => ActionResult::blocked(format!("Requires {item}")),
    }
}

fn unlock(action: &Action, ctx: &mut ActionContext<'_>) -> ActionResult {
    let Action::Unlock { target } = action else {
        return ActionResult::ok();
    };
    if ctx.level.unlock_gate(target) {
        ActionResult::noted("The gate swings open")
    } else {
        warn!(target = %target, level = %ctx.level.id(), "unlock_target_missing");
        ActionResult::blocked(format!("Nothing named `{target}` to unlock"))
    }
}

fn clear_objectives(_: &Action, ctx: &mut ActionContext<'_>) -> ActionResult {
    *ctx.objectives_collected = 0;
    ActionResult::ok()
}

fn set_flag(action: &Action, ctx: &mut ActionContext<'_>) -> ActionResult {
    if let Action::SetFlag { flag, value } = action {
        ctx.persistent.set_flag(flag, value.clone());
    }
    ActionResult::ok()
}

fn set_area(action: &Action, ctx: &mut ActionContext<'_>) -> ActionResult {
    if let Action::SetArea { area } = action {
        ctx.session.area = area.clone();
    }
    ActionResult::ok()
}

fn set_level_number(action: &Action, ctx: &mut ActionContext<'_>) -> ActionResult {
    if let Action::SetLevelNumber { level_number } = action {
        ctx.session.level_number = Some(*level_number);
    }
    ActionResult::ok()
}

fn set_subtitle(action: &Action, ctx: &mut ActionContext<'_>) -> ActionResult {
    if let Action::SetSubtitle { subtitle } = action {
        ctx.session.subtitle = Some(subtitle.clone());
    }
    ActionResult::ok()
}

fn play_cutscene(action: &Action, ctx: &mut ActionContext<'_>) -> ActionResult {
    if let Action::PlayCutscene { cutscene } = action {
        ctx.session.pending_cutscenes.push(cutscene.clone());
    }
    ActionResult::ok()
}
