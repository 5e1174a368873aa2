//! Save format migrations.
//!
//! Migrators operate on raw JSON so old payloads never need to deserialize
//! into the current types. Each migrator upgrades a payload from one version
//! and is responsible for bumping `version`.

use error::SaveError;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::snapshot::SAVE_VERSION;

pub type Migrator = fn(Value) -> Result<Value, SaveError>;

/// Linear chain of migrators keyed by the version they upgrade from
#[derive(Debug, Clone)]
pub struct MigrationRegistry {
    target: u32,
    migrators: BTreeMap<u32, Migrator>,
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl MigrationRegistry {
    /// Empty chain ending at `target`
    pub fn new(target: u32) -> Self {
        Self {
            target,
            migrators: BTreeMap::new(),
        }
    }

    /// The built-in chain up to [`SAVE_VERSION`]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new(SAVE_VERSION);
        registry.register(1, migrate_v1_to_v2);
        registry.register(2, migrate_v2_to_v3);
        registry
    }

    pub fn register(&mut self, from: u32, migrator: Migrator) {
        self.migrators.insert(from, migrator);
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    /// Upgrade `payload` to the target version. Returns the payload and
    /// whether anything was migrated. Fails on a missing migrator, a
    /// revisited version or a payload newer than the target; never loops
    /// more than `target` times.
    pub fn apply(&self, mut payload: Value) -> Result<(Value, bool), SaveError> {
        let mut version = read_version(&payload)?;
        if version > self.target {
            return Err(SaveError::UnsupportedVersion {
                found: version,
                supported: self.target,
            });
        }

        let mut visited = BTreeSet::new();
        let mut migrated = false;
        while version < self.target {
            if !visited.insert(version) || visited.len() > self.target as usize {
                return Err(SaveError::MigrationCycle { version });
            }
            let migrator = self
                .migrators
                .get(&version)
                .ok_or(SaveError::MissingMigrator { from: version })?;
            payload = migrator(payload)?;
            let next = read_version(&payload)?;
            debug!(from = version, to = next, "save_migrated");
            if next > self.target {
                return Err(SaveError::UnsupportedVersion {
                    found: next,
                    supported: self.target,
                });
            }
            version = next;
            migrated = true;
        }
        Ok((payload, migrated))
    }
}

pub fn read_version(payload: &Value) -> Result<u32, SaveError> {
    payload
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or(SaveError::MissingVersion)
}

fn set_version(payload: &mut Value, version: u32) -> Result<(), SaveError> {
    payload
        .as_object_mut()
        .ok_or(SaveError::NotAnObject)?
        .insert("version".into(), json!(version));
    Ok(())
}

/// Apply `f` to every level snapshot object in `progress`
fn for_each_level(
    payload: &mut Value,
    mut f: impl FnMut(&mut Map<String, Value>),
) -> Result<(), SaveError> {
    let Some(progress) = payload.get_mut("progress") else {
        return Ok(());
    };
    let levels = progress
        .as_object_mut()
        .ok_or_else(|| SaveError::Corrupted("`progress` is not an object".into()))?;
    for level in levels.values_mut() {
        if let Some(level) = level.as_object_mut() {
            f(level);
        }
    }
    Ok(())
}

/// v1 kept health on the player state; v2 moved it into `playerVitals`.
fn migrate_v1_to_v2(mut payload: Value) -> Result<Value, SaveError> {
    for_each_level(&mut payload, |level| {
        if level.contains_key("playerVitals") {
            return;
        }
        let health = level
            .get_mut("playerState")
            .and_then(Value::as_object_mut)
            .and_then(|player| player.remove("health"))
            .and_then(|h| h.as_u64())
            .unwrap_or(u64::from(hero::DEFAULT_MAX_HEALTH));
        let max_health = health.max(u64::from(hero::DEFAULT_MAX_HEALTH));
        level.insert(
            "playerVitals".into(),
            json!({ "health": health, "maxHealth": max_health, "invulnerableFor": 0.0 }),
        );
    })?;
    set_version(&mut payload, 2)?;
    Ok(payload)
}

/// v3 added safes and the level advance guard.
fn migrate_v2_to_v3(mut payload: Value) -> Result<Value, SaveError> {
    for_each_level(&mut payload, |level| {
        level.entry("safes").or_insert_with(|| json!([]));
        let session = level
            .entry("sessionState")
            .or_insert_with(|| json!({}));
        if let Some(session) = session.as_object_mut() {
            session
                .entry("levelAdvanceQueued")
                .or_insert(Value::Bool(false));
        }
    })?;
    set_version(&mut payload, 3)?;
    Ok(payload)
}
