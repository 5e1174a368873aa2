//! Quest definitions and per-session quest state.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Evaluator key for a quest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum QuestType {
    Collect,
    Defeat,
    Escort,
}

/// Type-specific quest parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum QuestKind {
    /// Either a fixed list of items that must be held, or a count of
    /// collected objective pickups
    Collect {
        #[serde(default)]
        objective_item_ids: Option<Vec<String>>,
        #[serde(default)]
        objective_count: u32,
    },
    /// Driven by an integer flag bumped on every defeat
    Defeat {
        progress_flag: String,
        objective_count: u32,
    },
    /// Done once `completed_flag` is set
    Escort { completed_flag: String },
}

impl QuestKind {
    pub fn quest_type(&self) -> QuestType {
        match self {
            QuestKind::Collect { .. } => QuestType::Collect,
            QuestKind::Defeat { .. } => QuestType::Defeat,
            QuestKind::Escort { .. } => QuestType::Escort,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestConfig {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Shown once when the quest completes
    #[serde(default)]
    pub completion_note: Option<String>,
    #[serde(flatten)]
    pub kind: QuestKind,
}

impl QuestConfig {
    pub fn quest_type(&self) -> QuestType {
        self.kind.quest_type()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestProgress {
    pub current: u32,
    pub total: u32,
}

impl QuestProgress {
    pub fn new(current: u32, total: u32) -> Self {
        Self { current, total }
    }
}

/// Mutable quest state. `completed` only ever goes from false to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestState {
    pub id: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub progress: QuestProgress,
}

impl QuestState {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            completed: false,
            progress: QuestProgress::default(),
        }
    }
}

/// Result of running one evaluator
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub completed: bool,
    pub progress: QuestProgress,
    pub note: Option<String>,
}

impl Evaluation {
    pub fn new(completed: bool, current: u32, total: u32) -> Self {
        Self {
            completed,
            progress: QuestProgress::new(current, total),
            note: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_tagged_kinds() {
        let quest: QuestConfig = serde_json::from_str(
            r#"{"id":"bats","title":"Clear the bats","type":"defeat","progressFlag":"batsDefeated","objectiveCount":3}"#,
        )
        .unwrap();
        assert_eq!(quest.quest_type(), QuestType::Defeat);
        assert_eq!(
            quest.kind,
            QuestKind::Defeat {
                progress_flag: "batsDefeated".into(),
                objective_count: 3
            }
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<QuestConfig, _> =
            serde_json::from_str(r#"{"id":"x","title":"X","type":"dance"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn quest_type_strings() {
        assert_eq!(QuestType::Escort.to_string(), "escort");
        assert_eq!(QuestType::from_str("collect").unwrap(), QuestType::Collect);
    }
}
