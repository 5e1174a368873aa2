//! The save game store: multi-slot persistence with migration, validation
//! and repair on load.

use anyhow::{Context, Result};
use error::{SaveError, handle_save_error};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

use crate::migrate::MigrationRegistry;
use crate::sanitize::{sanitize_snapshot, validate_snapshot};
use crate::snapshot::{LevelSnapshot, SavePayload, SlotSummary};
use crate::storage::SaveStorage;

/// A slot was reset; surfaced to the player as a toast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotNotice {
    pub slot: String,
    pub reason: String,
}

pub struct SaveGameStore {
    storage: Box<dyn SaveStorage>,
    migrations: MigrationRegistry,
    slots: BTreeMap<String, SavePayload>,
    notices: Vec<SlotNotice>,
}

impl SaveGameStore {
    pub fn new(storage: impl SaveStorage + 'static) -> Self {
        Self::with_migrations(storage, MigrationRegistry::with_defaults())
    }

    pub fn with_migrations(storage: impl SaveStorage + 'static, migrations: MigrationRegistry) -> Self {
        Self {
            storage: Box::new(storage),
            migrations,
            slots: BTreeMap::new(),
            notices: Vec::new(),
        }
    }

    /// Load a slot through the full pipeline. `None` when the slot is empty
    /// or had to be reset. Never fails: corruption resets the slot.
    pub fn load_slot(&mut self, slot: &str) -> Option<&SavePayload> {
        if let Err(err) = validate_slot_id(slot) {
            warn!(slot = %slot, error = %err, "save_slot_rejected");
            return None;
        }

        let raw = match self.storage.read(slot) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.slots.insert(slot.to_string(), SavePayload::empty(slot));
                return None;
            }
            Err(err) => {
                warn!(slot = %slot, error = %err, "save_read_failed");
                return None;
            }
        };

        match self.decode(slot, &raw) {
            Ok((payload, dirty)) => {
                self.slots.insert(slot.to_string(), payload);
                if dirty {
                    info!(slot = %slot, "save_repaired");
                    if let Err(err) = self.persist(slot) {
                        warn!(slot = %slot, error = %err, "save_rewrite_failed");
                    }
                }
                self.slots.get(slot).filter(|p| !p.is_empty())
            }
            Err(reason) => {
                self.reset_slot(slot, &reason);
                None
            }
        }
    }

    /// parse → migrate → validate keys → sanitize fields
    fn decode(&self, slot: &str, raw: &str) -> Result<(SavePayload, bool), SaveError> {
        let value: Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(SaveError::NotAnObject);
        }
        let (value, migrated) = self.migrations.apply(value)?;

        let version = crate::migrate::read_version(&value)?;
        let empty = serde_json::Map::new();
        let levels = match value.get("progress") {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(levels)) => levels,
            Some(_) => return Err(SaveError::Corrupted("`progress` is not an object".into())),
        };

        let mut repaired = false;
        let mut progress = BTreeMap::new();
        for (level_id, level) in levels {
            let object = validate_snapshot(level_id, level)?;
            let sanitized = sanitize_snapshot(level_id, object);
            repaired |= sanitized.repaired;
            progress.insert(level_id.clone(), sanitized.snapshot);
        }

        let mut current_level_id = value
            .get("currentLevelId")
            .and_then(Value::as_str)
            .map(str::to_string);
        if current_level_id
            .as_ref()
            .is_some_and(|id| !progress.contains_key(id))
        {
            warn!(slot = %slot, "save_current_level_dangling");
            current_level_id = None;
            repaired = true;
        }

        let payload = SavePayload {
            version,
            progress,
            current_level_id,
            slot_id: slot.to_string(),
            saved_at: value.get("savedAt").and_then(Value::as_u64).unwrap_or(0),
        };
        Ok((payload, migrated || repaired))
    }

    /// Drop the slot from storage and memory and queue a notice
    pub fn reset_slot(&mut self, slot: &str, reason: &SaveError) {
        warn!(slot = %slot, reason = %reason, "save_slot_reset");
        if let Err(err) = self.storage.remove(slot) {
            warn!(slot = %slot, error = %err, "save_slot_remove_failed");
        }
        self.slots.insert(slot.to_string(), SavePayload::empty(slot));
        self.notices.push(SlotNotice {
            slot: slot.to_string(),
            reason: handle_save_error(reason),
        });
    }

    /// In-memory payload, loaded lazily
    pub fn payload(&mut self, slot: &str) -> Option<&SavePayload> {
        if !self.slots.contains_key(slot) {
            return self.load_slot(slot);
        }
        self.slots.get(slot).filter(|p| !p.is_empty())
    }

    pub fn level_snapshot(&mut self, slot: &str, level_id: &str) -> Option<&LevelSnapshot> {
        self.payload(slot)?.progress.get(level_id)
    }

    /// Upsert one level snapshot, mark it current and persist the slot
    pub fn save_level(&mut self, slot: &str, level_id: &str, mut snapshot: LevelSnapshot) -> Result<()> {
        validate_slot_id(slot)?;
        if !self.slots.contains_key(slot) {
            self.load_slot(slot);
        }
        let now = unix_millis();
        snapshot.saved_at = now;

        let payload = self
            .slots
            .entry(slot.to_string())
            .or_insert_with(|| SavePayload::empty(slot));
        payload.version = self.migrations.target();
        payload.progress.insert(level_id.to_string(), snapshot);
        payload.current_level_id = Some(level_id.to_string());
        payload.saved_at = now;

        self.persist(slot)
            .with_context(|| format!("Failed to save slot `{slot}`"))?;
        info!(slot = %slot, level = %level_id, "save_level_written");
        Ok(())
    }

    fn persist(&mut self, slot: &str) -> Result<()> {
        let payload = self
            .slots
            .get(slot)
            .ok_or_else(|| SaveError::InvalidSlot(slot.to_string()))?;
        let json = serde_json::to_string(payload).context("Failed to serialize save data")?;
        self.storage.write(slot, &json)
    }

    pub fn delete_slot(&mut self, slot: &str) -> Result<()> {
        validate_slot_id(slot)?;
        self.storage.remove(slot)?;
        self.slots.remove(slot);
        info!(slot = %slot, "save_slot_deleted");
        Ok(())
    }

    /// Summaries of every intact slot in storage
    pub fn list_slots(&mut self) -> Vec<SlotSummary> {
        let ids = match self.storage.slots() {
            Ok(ids) => ids,
            Err(err) => {
                warn!(error = %err, "save_list_failed");
                return Vec::new();
            }
        };
        ids.iter()
            .filter_map(|id| self.load_slot(id).map(SlotSummary::from))
            .collect()
    }

    pub fn take_notices(&mut self) -> Vec<SlotNotice> {
        std::mem::take(&mut self.notices)
    }
}

fn validate_slot_id(slot: &str) -> Result<(), SaveError> {
    let valid = !slot.is_empty()
        && slot.len() <= 64
        && slot
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SaveError::InvalidSlot(slot.to_string()))
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::snapshot::SAVE_VERSION;
    use pretty_assertions::assert_eq;

    fn store_with(slot: &str, raw: &str) -> SaveGameStore {
        let mut storage = MemoryStorage::new();
        storage.insert_raw(slot, raw);
        SaveGameStore::new(storage)
    }

    #[test]
    fn empty_slot_loads_as_none_without_notice() {
        let mut store = SaveGameStore::new(MemoryStorage::new());
        assert!(store.load_slot("1").is_none());
        assert!(store.take_notices().is_empty());
    }

    #[test]
    fn garbage_resets_slot() {
        let mut store = store_with("1", "{ not json");
        assert!(store.load_slot("1").is_none());
        let notices = store.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].slot, "1");
        assert!(notices[0].reason.contains("corrupted"));
        assert!(store.take_notices().is_empty());
        assert!(store.list_slots().is_empty());
    }

    #[test]
    fn missing_keys_reset_slot() {
        let raw = r#"{"version":3,"slotId":"1","currentLevelId":"a","progress":{"a":{"inventory":{"capacity":4}}}}"#;
        let mut store = store_with("1", raw);
        assert!(store.load_slot("1").is_none());
        assert!(store.take_notices()[0].reason.contains("incomplete"));
    }

    #[test]
    fn save_then_load_round_trip() {
        let mut store = SaveGameStore::new(MemoryStorage::new());
        let mut snapshot = LevelSnapshot::default();
        snapshot.objectives_collected = 3;
        snapshot.persistent_state.set_flag("bellRung", true);
        store.save_level("1", "belfry", snapshot.clone()).unwrap();

        // Fresh store over the same bytes
        let mut storage = MemoryStorage::new();
        let raw = serde_json::to_string(store.payload("1").unwrap()).unwrap();
        storage.insert_raw("1", &raw);
        let mut reloaded = SaveGameStore::new(storage);

        let payload = reloaded.load_slot("1").unwrap().clone();
        assert_eq!(payload.version, SAVE_VERSION);
        assert_eq!(payload.current_level_id.as_deref(), Some("belfry"));
        let loaded = &payload.progress["belfry"];
        snapshot.saved_at = loaded.saved_at;
        assert_eq!(loaded, &snapshot);
        assert!(reloaded.take_notices().is_empty());
    }

    #[test]
    fn invalid_slot_ids_are_rejected() {
        let mut store = SaveGameStore::new(MemoryStorage::new());
        assert!(store.save_level("../etc", "a", LevelSnapshot::default()).is_err());
        assert!(store.load_slot("").is_none());
    }

    #[test]
    fn delete_slot_forgets_progress() {
        let mut store = SaveGameStore::new(MemoryStorage::new());
        store.save_level("2", "a", LevelSnapshot::default()).unwrap();
        assert_eq!(store.list_slots().len(), 1);
        store.delete_slot("2").unwrap();
        assert!(store.list_slots().is_empty());
        assert!(store.load_slot("2").is_none());
    }
}
