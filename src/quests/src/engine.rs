//! Batch quest evaluation and the quest log summary.

use hero::Inventory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::evaluator::{QuestContext, QuestRegistry};
use crate::flags::PersistentState;
use crate::quest::{QuestConfig, QuestProgress, QuestState};

/// A quest that completed during this batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestCompletion {
    pub quest_id: String,
    pub note: String,
}

/// Evaluate every quest against the context and fold the results into
/// `states`. Completion is one-way: a completed entry is never re-evaluated
/// and each quest reports its completion exactly once.
pub fn evaluate_quest_batch(
    registry: &QuestRegistry,
    quests: &[QuestConfig],
    ctx: &QuestContext<'_>,
    states: &mut BTreeMap<String, QuestState>,
) -> Vec<QuestCompletion> {
    let mut completions = Vec::new();

    for quest in quests {
        let entry = states
            .entry(quest.id.clone())
            .or_insert_with(|| QuestState::new(&quest.id));
        if entry.completed {
            continue;
        }

        let evaluation = registry.evaluate(quest, ctx);
        entry.progress = evaluation.progress;
        if evaluation.completed {
            entry.completed = true;
            let note = evaluation
                .note
                .or_else(|| quest.completion_note.clone())
                .unwrap_or_else(|| format!("Quest complete: {}", quest.title));
            info!(quest = %quest.id, "quest_completed");
            completions.push(QuestCompletion {
                quest_id: quest.id.clone(),
                note,
            });
        }
    }

    completions
}

/// The quests of one level bound to a shared registry
#[derive(Debug, Clone)]
pub struct QuestEngine {
    registry: Arc<QuestRegistry>,
    quests: Vec<QuestConfig>,
}

impl QuestEngine {
    pub fn new(registry: Arc<QuestRegistry>, quests: Vec<QuestConfig>) -> Self {
        Self { registry, quests }
    }

    pub fn quests(&self) -> &[QuestConfig] {
        &self.quests
    }

    pub fn quest(&self, id: &str) -> Option<&QuestConfig> {
        self.quests.iter().find(|q| q.id == id)
    }

    /// Run the batch against the session's flags and inventory
    pub fn evaluate(
        &self,
        state: &mut PersistentState,
        inventory: &Inventory,
        objectives_collected: u32,
    ) -> Vec<QuestCompletion> {
        let PersistentState { flags, quests } = state;
        let ctx = QuestContext {
            inventory,
            flags: &*flags,
            objectives_collected,
        };
        evaluate_quest_batch(&self.registry, &self.quests, &ctx, quests)
    }

    pub fn log(&self, state: &PersistentState) -> QuestLog {
        QuestLog::build(&self.quests, &state.quests)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestLogEntry {
    pub id: String,
    pub title: String,
    pub progress: QuestProgress,
}

/// What the HUD shows in its quest panel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestLog {
    pub active: Vec<QuestLogEntry>,
    pub completed: Vec<QuestLogEntry>,
}

impl QuestLog {
    pub fn build(quests: &[QuestConfig], states: &BTreeMap<String, QuestState>) -> Self {
        let mut log = QuestLog::default();
        for quest in quests {
            let state = states.get(&quest.id);
            let entry = QuestLogEntry {
                id: quest.id.clone(),
                title: quest.title.clone(),
                progress: state.map(|s| s.progress).unwrap_or_default(),
            };
            if state.is_some_and(|s| s.completed) {
                log.completed.push(entry);
            } else {
                log.active.push(entry);
            }
        }
        log
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.completed.is_empty()
    }
}

impl fmt::Display for QuestLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.active {
            writeln!(
                f,
                "[ ] {} ({}/{})",
                entry.title, entry.progress.current, entry.progress.total
            )?;
        }
        for entry in &self.completed {
            writeln!(f, "[x] {}", entry.title)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::QuestKind;
    use pretty_assertions::assert_eq;

    fn engine() -> QuestEngine {
        QuestEngine::new(
            Arc::new(QuestRegistry::with_defaults()),
            vec![
                QuestConfig {
                    id: "shards".into(),
                    title: "Gather shards".into(),
                    description: None,
                    completion_note: Some("The shards hum together.".into()),
                    kind: QuestKind::Collect {
                        objective_item_ids: None,
                        objective_count: 2,
                    },
                },
                QuestConfig {
                    id: "guide".into(),
                    title: "Guide the lantern bearer".into(),
                    description: None,
                    completion_note: None,
                    kind: QuestKind::Escort {
                        completed_flag: "bearerSafe".into(),
                    },
                },
            ],
        )
    }

    #[test]
    fn completion_note_emitted_once() {
        let engine = engine();
        let inventory = Inventory::new(4);
        let mut state = PersistentState::default();

        assert!(engine.evaluate(&mut state, &inventory, 1).is_empty());
        let done = engine.evaluate(&mut state, &inventory, 2);
        assert_eq!(
            done,
            vec![QuestCompletion {
                quest_id: "shards".into(),
                note: "The shards hum together.".into()
            }]
        );
        assert!(engine.evaluate(&mut state, &inventory, 2).is_empty());
        assert!(state.is_quest_complete("shards"));
    }

    #[test]
    fn completion_survives_regression() {
        let engine = engine();
        let inventory = Inventory::new(4);
        let mut state = PersistentState::default();
        state.set_flag("bearerSafe", true);
        let done = engine.evaluate(&mut state, &inventory, 0);
        assert_eq!(done[0].note, "Quest complete: Guide the lantern bearer");

        state.set_flag("bearerSafe", false);
        engine.evaluate(&mut state, &inventory, 0);
        assert!(state.is_quest_complete("guide"));
    }

    #[test]
    fn log_splits_active_and_completed() {
        let engine = engine();
        let inventory = Inventory::new(4);
        let mut state = PersistentState::default();
        state.set_flag("bearerSafe", true);
        engine.evaluate(&mut state, &inventory, 1);

        let log = engine.log(&state);
        assert_eq!(log.active.len(), 1);
        assert_eq!(log.active[0].progress, QuestProgress::new(1, 2));
        assert_eq!(log.completed[0].id, "guide");
        assert_eq!(
            log.to_string(),
            "[ ] Gather shards (1/2)\n[x] Guide the lantern bearer\n"
        );
    }
}
