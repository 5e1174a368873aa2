//! Quest evaluators and the registry that dispatches to them.

use hero::Inventory;
use std::collections::HashMap;
use tracing::warn;

use crate::flags::{FlagValue, Flags};
use crate::quest::{Evaluation, QuestConfig, QuestKind, QuestType};

/// Read-only view of the session an evaluator needs
#[derive(Debug, Clone, Copy)]
pub struct QuestContext<'a> {
    pub inventory: &'a Inventory,
    pub flags: &'a Flags,
    pub objectives_collected: u32,
}

/// Strategy deciding whether one quest type is complete
pub trait QuestEvaluator: Send + Sync {
    fn evaluate(&self, quest: &QuestConfig, ctx: &QuestContext<'_>) -> Evaluation;
}

impl<F> QuestEvaluator for F
where
    F: Fn(&QuestConfig, &QuestContext<'_>) -> Evaluation + Send + Sync,
{
    fn evaluate(&self, quest: &QuestConfig, ctx: &QuestContext<'_>) -> Evaluation {
        self(quest, ctx)
    }
}

pub struct CollectEvaluator;

impl QuestEvaluator for CollectEvaluator {
    fn evaluate(&self, quest: &QuestConfig, ctx: &QuestContext<'_>) -> Evaluation {
        let QuestKind::Collect {
            objective_item_ids,
            objective_count,
        } = &quest.kind
        else {
            return mismatched(quest, QuestType::Collect);
        };

        match objective_item_ids {
            Some(ids) if !ids.is_empty() => {
                let held = ids.iter().filter(|id| ctx.inventory.count(id) > 0).count() as u32;
                let total = ids.len() as u32;
                Evaluation::new(held >= total, held, total)
            }
            _ => {
                let total = *objective_count;
                let current = ctx.objectives_collected.min(total);
                Evaluation::new(total > 0 && current >= total, current, total)
            }
        }
    }
}

pub struct DefeatEvaluator;

impl QuestEvaluator for DefeatEvaluator {
    fn evaluate(&self, quest: &QuestConfig, ctx: &QuestContext<'_>) -> Evaluation {
        let QuestKind::Defeat {
            progress_flag,
            objective_count,
        } = &quest.kind
        else {
            return mismatched(quest, QuestType::Defeat);
        };
        let total = *objective_count;
        let current = ctx.flags.int(progress_flag).clamp(0, i64::from(total)) as u32;
        Evaluation::new(current >= total, current, total)
    }
}

pub struct EscortEvaluator;

impl QuestEvaluator for EscortEvaluator {
    fn evaluate(&self, quest: &QuestConfig, ctx: &QuestContext<'_>) -> Evaluation {
        let QuestKind::Escort { completed_flag } = &quest.kind else {
            return mismatched(quest, QuestType::Escort);
        };
        // Only a literal `true` counts; truthy ints or strings do not
        let done = matches!(ctx.flags.get(completed_flag), Some(FlagValue::Bool(true)));
        Evaluation::new(done, u32::from(done), 1)
    }
}

fn mismatched(quest: &QuestConfig, expected: QuestType) -> Evaluation {
    warn!(quest = %quest.id, expected = %expected, actual = %quest.quest_type(), "quest_evaluator_mismatch");
    Evaluation::new(false, 0, 0)
}

/// Quest type → evaluator table, built once and shared
#[derive(Default)]
pub struct QuestRegistry {
    evaluators: HashMap<QuestType, Box<dyn QuestEvaluator>>,
}

impl QuestRegistry {
    /// An empty registry; see [`QuestRegistry::with_defaults`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the collect, defeat and escort evaluators installed
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    pub fn register_defaults(&mut self) {
        self.register(QuestType::Collect, CollectEvaluator);
        self.register(QuestType::Defeat, DefeatEvaluator);
        self.register(QuestType::Escort, EscortEvaluator);
    }

    /// Install or replace the evaluator for `quest_type`
    pub fn register(&mut self, quest_type: QuestType, evaluator: impl QuestEvaluator + 'static) {
        self.evaluators.insert(quest_type, Box::new(evaluator));
    }

    pub fn has(&self, quest_type: QuestType) -> bool {
        self.evaluators.contains_key(&quest_type)
    }

    pub fn evaluate(&self, quest: &QuestConfig, ctx: &QuestContext<'_>) -> Evaluation {
        match self.evaluators.get(&quest.quest_type()) {
            Some(evaluator) => evaluator.evaluate(quest, ctx),
            None => {
                warn!(quest = %quest.id, quest_type = %quest.quest_type(), "quest_evaluator_missing");
                Evaluation {
                    note: Some(format!("No evaluator for {} quests", quest.quest_type())),
                    ..Evaluation::new(false, 0, 0)
                }
            }
        }
    }
}

impl std::fmt::Debug for QuestRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestRegistry")
            .field("types", &self.evaluators.keys().collect::<Vec<_>>())
            .finish()
    }
}
