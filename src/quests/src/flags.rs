//! Story flags and the state that outlives a single interaction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::quest::QuestState;

/// A flag value as stored in content and saves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FlagValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Int(n) => *n != 0,
            FlagValue::Text(s) => !s.is_empty(),
        }
    }

    /// Integer view; booleans count as 0/1, numeric text is parsed
    pub fn as_int(&self) -> i64 {
        match self {
            FlagValue::Bool(b) => i64::from(*b),
            FlagValue::Int(n) => *n,
            FlagValue::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{b}"),
            FlagValue::Int(n) => write!(f, "{n}"),
            FlagValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Int(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::Text(value.to_string())
    }
}

/// Flat name → value dictionary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags(BTreeMap<String, FlagValue>);

impl Flags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.0.get(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<FlagValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.0.get(name).is_some_and(FlagValue::is_truthy)
    }

    pub fn int(&self, name: &str) -> i64 {
        self.0.get(name).map_or(0, FlagValue::as_int)
    }

    /// Add `by` to an integer flag, creating it at zero. Returns the new value.
    pub fn increment(&mut self, name: &str, by: i64) -> i64 {
        let next = self.int(name).saturating_add(by);
        self.0.insert(name.to_string(), FlagValue::Int(next));
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Flags plus quest states, persisted with every level snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentState {
    #[serde(default)]
    pub flags: Flags,
    #[serde(default)]
    pub quests: BTreeMap<String, QuestState>,
}

impl PersistentState {
    pub fn get_flag(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name)
    }

    pub fn set_flag(&mut self, name: &str, value: impl Into<FlagValue>) {
        self.flags.set(name, value);
    }

    pub fn quest(&self, id: &str) -> Option<&QuestState> {
        self.quests.get(id)
    }

    pub fn is_quest_complete(&self, id: &str) -> bool {
        self.quests.get(id).is_some_and(|q| q.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_values_round_trip() {
        let json = r#"{"door":true,"kills":3,"mood":"calm"}"#;
        let flags: Flags = serde_json::from_str(json).unwrap();
        assert_eq!(flags.get("door"), Some(&FlagValue::Bool(true)));
        assert_eq!(flags.int("kills"), 3);
        assert_eq!(flags.get("mood"), Some(&FlagValue::Text("calm".into())));
        assert_eq!(serde_json::to_string(&flags).unwrap(), json);
    }

    #[test]
    fn increment_starts_at_zero() {
        let mut flags = Flags::new();
        assert_eq!(flags.increment("bats", 1), 1);
        assert_eq!(flags.increment("bats", 2), 3);
        flags.set("bats", "7");
        assert_eq!(flags.increment("bats", 1), 8);
    }

    #[test]
    fn truthiness() {
        let mut flags = Flags::new();
        flags.set("a", false);
        flags.set("b", 0_i64);
        flags.set("c", "");
        flags.set("d", 2_i64);
        assert!(!flags.is_set("a"));
        assert!(!flags.is_set("b"));
        assert!(!flags.is_set("c"));
        assert!(flags.is_set("d"));
        assert!(!flags.is_set("missing"));
    }
}
