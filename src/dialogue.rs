//! NPC scripts: conditional dialogue lines and quizzes.

use hero::Inventory;
use quests::{FlagValue, PersistentState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::actions::Action;

/// A predicate over session state guarding a dialogue line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Condition {
    /// A missing flag only equals `false`
    FlagEquals { flag: String, value: FlagValue },
    QuestComplete { quest: String },
    QuestIncomplete { quest: String },
    HasItem {
        item: String,
        #[serde(default = "default_count")]
        count: u32,
    },
    /// The player has already spoken to this NPC
    Spoken,
}

fn default_count() -> u32 {
    1
}

/// What conditions are evaluated against
#[derive(Debug, Clone, Copy)]
pub struct DialogueFacts<'a> {
    pub persistent: &'a PersistentState,
    pub inventory: &'a Inventory,
    pub has_spoken: bool,
}

impl Condition {
    pub fn holds(&self, facts: &DialogueFacts<'_>) -> bool {
        match self {
            Condition::FlagEquals { flag, value } => match facts.persistent.get_flag(flag) {
                Some(current) => current == value,
                None => *value == FlagValue::Bool(false),
            },
            Condition::QuestComplete { quest } => facts.persistent.is_quest_complete(quest),
            Condition::QuestIncomplete { quest } => !facts.persistent.is_quest_complete(quest),
            Condition::HasItem { item, count } => facts.inventory.has(item, *count),
            Condition::Spoken => facts.has_spoken,
        }
    }
}

/// Conjunction; an empty list always holds
pub fn conditions_hold(conditions: &[Condition], facts: &DialogueFacts<'_>) -> bool {
    conditions.iter().all(|c| c.holds(facts))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueLine {
    pub id: String,
    #[serde(default)]
    pub speaker: Option<String>,
    pub text: String,
    #[serde(default)]
    pub when: Vec<Condition>,
    /// Reward id from the level's reward table; claimed at most once
    #[serde(default)]
    pub reward: Option<String>,
    /// Run every time the line is shown, after the reward
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Flags written once the reward and actions succeed
    #[serde(default)]
    pub set_state: BTreeMap<String, FlagValue>,
}

impl DialogueLine {
    pub fn plain(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            speaker: None,
            text: text.to_string(),
            when: Vec::new(),
            reward: None,
            actions: Vec::new(),
            set_state: BTreeMap::new(),
        }
    }

    pub fn has_effects(&self) -> bool {
        self.reward.is_some() || !self.actions.is_empty() || !self.set_state.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub answer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub reward: Option<String>,
    pub fail_line: String,
    #[serde(default)]
    pub success_line: Option<String>,
    /// Set once the quiz is passed; a passed quiz never starts again
    #[serde(default)]
    pub completion_flag: Option<String>,
    #[serde(default)]
    pub start_when: Vec<Condition>,
}

/// Result of answering one question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStep {
    Next(usize),
    Passed,
    Failed,
}

impl Quiz {
    pub fn can_start(&self, facts: &DialogueFacts<'_>) -> bool {
        if self.questions.is_empty() {
            return false;
        }
        let passed = self
            .completion_flag
            .as_deref()
            .and_then(|flag| facts.persistent.get_flag(flag))
            .is_some_and(FlagValue::is_truthy);
        !passed && conditions_hold(&self.start_when, facts)
    }

    pub fn question(&self, index: usize) -> Option<&QuizQuestion> {
        self.questions.get(index)
    }

    pub fn answer(&self, index: usize, choice: usize) -> QuizStep {
        match self.questions.get(index) {
            Some(q) if q.answer == choice => {
                if index + 1 >= self.questions.len() {
                    QuizStep::Passed
                } else {
                    QuizStep::Next(index + 1)
                }
            }
            _ => QuizStep::Failed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcScript {
    #[serde(default)]
    pub lines: Vec<DialogueLine>,
    #[serde(default)]
    pub default_line: Option<DialogueLine>,
    #[serde(default)]
    pub quiz: Option<Quiz>,
}

impl NpcScript {
    /// First line whose conditions hold, else the default line
    pub fn select_line(&self, facts: &DialogueFacts<'_>) -> Option<&DialogueLine> {
        self.lines
            .iter()
            .find(|line| conditions_hold(&line.when, facts))
            .or(self.default_line.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quests::QuestState;

    fn script() -> NpcScript {
        serde_json::from_str(
            r#"{
                "lines": [
                    { "id": "thanks", "text": "You found it!",
                      "when": [ { "type": "questComplete", "quest": "lost-ring" } ] },
                    { "id": "again", "text": "Still looking?",
                      "when": [ { "type": "spoken" },
                                { "type": "flagEquals", "flag": "metMiller", "value": true } ] },
                    { "id": "ring", "text": "Is that my ring?",
                      "when": [ { "type": "hasItem", "item": "ring" } ] }
                ],
                "defaultLine": { "id": "hello", "text": "Lost my ring by the well.",
                                 "setState": { "metMiller": true } }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn falls_back_to_default_line() {
        let persistent = PersistentState::default();
        let inventory = Inventory::new(4);
        let facts = DialogueFacts {
            persistent: &persistent,
            inventory: &inventory,
            has_spoken: false,
        };
        let line = script().select_line(&facts).map(|l| l.id.clone());
        assert_eq!(line.as_deref(), Some("hello"));
    }

    #[test]
    fn first_matching_line_wins() {
        let mut persistent = PersistentState::default();
        persistent.set_flag("metMiller", true);
        let mut inventory = Inventory::new(4);
        inventory.add("ring", 1).unwrap();
        let facts = DialogueFacts {
            persistent: &persistent,
            inventory: &inventory,
            has_spoken: true,
        };
        let script = script();
        assert_eq!(script.select_line(&facts).unwrap().id, "again");

        let mut done = persistent.clone();
        let mut quest = QuestState::new("lost-ring");
        quest.completed = true;
        done.quests.insert("lost-ring".into(), quest);
        let facts = DialogueFacts {
            persistent: &done,
            ..facts
        };
        assert_eq!(script.select_line(&facts).unwrap().id, "thanks");
    }

    #[test]
    fn missing_flag_equals_only_false() {
        let persistent = PersistentState::default();
        let inventory = Inventory::new(1);
        let facts = DialogueFacts {
            persistent: &persistent,
            inventory: &inventory,
            has_spoken: false,
        };
        let is = |value: FlagValue| {
            Condition::FlagEquals {
                flag: "door".into(),
                value,
            }
            .holds(&facts)
        };
        assert!(is(FlagValue::Bool(false)));
        assert!(!is(FlagValue::Bool(true)));
        assert!(!is(FlagValue::Int(0)));
    }

    #[test]
    fn quiz_walks_questions_and_locks_after_pass() {
        let quiz: Quiz = serde_json::from_str(
            r#"{
                "questions": [
                    { "prompt": "Colour of the sky?", "options": ["red", "blue"], "answer": 1 },
                    { "prompt": "Legs on a cat?", "options": ["4", "3"], "answer": 0 }
                ],
                "failLine": "Wrong!",
                "completionFlag": "quizDone"
            }"#,
        )
        .unwrap();
        assert_eq!(quiz.answer(0, 1), QuizStep::Next(1));
        assert_eq!(quiz.answer(1, 1), QuizStep::Failed);
        assert_eq!(quiz.answer(1, 0), QuizStep::Passed);
        assert_eq!(quiz.answer(7, 0), QuizStep::Failed);

        let mut persistent = PersistentState::default();
        let inventory = Inventory::new(1);
        assert!(quiz.can_start(&DialogueFacts {
            persistent: &persistent,
            inventory: &inventory,
            has_spoken: false,
        }));
        persistent.set_flag("quizDone", true);
        assert!(!quiz.can_start(&DialogueFacts {
            persistent: &persistent,
            inventory: &inventory,
            has_spoken: false,
        }));
    }
}
