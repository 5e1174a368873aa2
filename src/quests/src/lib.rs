//! Quest tracking
//!
//! Story flags, quest definitions, pluggable quest evaluators and the batch
//! evaluation that turns session state into monotonic quest progress.

pub mod engine;
pub mod evaluator;
pub mod flags;
pub mod quest;

pub use engine::{QuestCompletion, QuestEngine, QuestLog, QuestLogEntry, evaluate_quest_batch};
pub use evaluator::{
    CollectEvaluator, DefeatEvaluator, EscortEvaluator, QuestContext, QuestEvaluator,
    QuestRegistry,
};
pub use flags::{FlagValue, Flags, PersistentState};
pub use quest::{Evaluation, QuestConfig, QuestKind, QuestProgress, QuestState, QuestType};
