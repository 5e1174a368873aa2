//! HUD collaborator: everything the core tells the presentation layer.

use quests::QuestLog;
use std::collections::BTreeMap;
use tracing::info;

/// Extra data attached to a dialogue box
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogueMeta {
    pub npc_id: Option<String>,
    /// Answer options while a quiz question is shown
    pub options: Vec<String>,
    /// Reward or action note shown under the line
    pub note: Option<String>,
}

pub type PromptParams = BTreeMap<String, String>;

/// Trait for the on-screen HUD
pub trait Hud {
    /// Open or replace the dialogue box
    fn show_dialogue(&mut self, speaker: &str, line: &str, meta: &DialogueMeta);

    /// Short prompt anchored at a world position
    fn show_world_prompt(&mut self, text_id: &str, x: f32, y: f32, params: &PromptParams);

    /// Close the dialogue box and any prompt
    fn hide_interaction(&mut self);

    fn set_objectives(&mut self, current: u32, total: u32);

    fn set_health(&mut self, current: u32, max: u32);

    fn set_quest_log(&mut self, log: &QuestLog);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHud;

impl Hud for NullHud {
    fn show_dialogue(&mut self, _: &str, _: &str, _: &DialogueMeta) {}
    fn show_world_prompt(&mut self, _: &str, _: f32, _: f32, _: &PromptParams) {}
    fn hide_interaction(&mut self) {}
    fn set_objectives(&mut self, _: u32, _: u32) {}
    fn set_health(&mut self, _: u32, _: u32) {}
    fn set_quest_log(&mut self, _: &QuestLog) {}
}

/// Writes HUD traffic to the log; used by the headless binary
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHud;

impl Hud for TracingHud {
    fn show_dialogue(&mut self, speaker: &str, line: &str, meta: &DialogueMeta) {
        info!(speaker, line, note = meta.note.as_deref().unwrap_or(""), "hud_dialogue");
        for (index, option) in meta.options.iter().enumerate() {
            info!(index, option = %option, "hud_dialogue_option");
        }
    }

    fn show_world_prompt(&mut self, text_id: &str, x: f32, y: f32, params: &PromptParams) {
        info!(text_id, x, y, ?params, "hud_prompt");
    }

    fn hide_interaction(&mut self) {}

    fn set_objectives(&mut self, current: u32, total: u32) {
        info!(current, total, "hud_objectives");
    }

    fn set_health(&mut self, current: u32, max: u32) {
        info!(current, max, "hud_health");
    }

    fn set_quest_log(&mut self, log: &QuestLog) {
        info!(log = %log, "hud_quest_log");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HudEvent {
    Dialogue {
        speaker: String,
        line: String,
        meta: DialogueMeta,
    },
    Prompt {
        text_id: String,
        params: PromptParams,
    },
    Hide,
    Objectives(u32, u32),
    Health(u32, u32),
    QuestLog(QuestLog),
}

/// Keeps every call, for tests and replays
#[derive(Debug, Clone, Default)]
pub struct RecordingHud {
    pub events: Vec<HudEvent>,
}

impl RecordingHud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_dialogue(&self) -> Option<(&str, &str)> {
        self.events.iter().rev().find_map(|e| match e {
            HudEvent::Dialogue { speaker, line, .. } => Some((speaker.as_str(), line.as_str())),
            _ => None,
        })
    }

    pub fn last_prompt(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|e| match e {
            HudEvent::Prompt { text_id, .. } => Some(text_id.as_str()),
            _ => None,
        })
    }

    pub fn dialogues(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, HudEvent::Dialogue { .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Hud for RecordingHud {
    fn show_dialogue(&mut self, speaker: &str, line: &str, meta: &DialogueMeta) {
        self.events.push(HudEvent::Dialogue {
            speaker: speaker.to_string(),
            line: line.to_string(),
            meta: meta.clone(),
        });
    }

    fn show_world_prompt(&mut self, text_id: &str, _: f32, _: f32, params: &PromptParams) {
        self.events.push(HudEvent::Prompt {
            text_id: text_id.to_string(),
            params: params.clone(),
        });
    }

    fn hide_interaction(&mut self) {
        self.events.push(HudEvent::Hide);
    }

    fn set_objectives(&mut self, current: u32, total: u32) {
        self.events.push(HudEvent::Objectives(current, total));
    }

    fn set_health(&mut self, current: u32, max: u32) {
        self.events.push(HudEvent::Health(current, max));
    }

    fn set_quest_log(&mut self, log: &QuestLog) {
        self.events.push(HudEvent::QuestLog(log.clone()));
    }
}
