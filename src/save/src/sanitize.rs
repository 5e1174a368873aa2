//! Structural validation and field-level repair of loaded snapshots.

use error::SaveError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::snapshot::{EXPECTED_SNAPSHOT_KEYS, LevelSnapshot};

/// Outcome of sanitizing one level snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized {
    pub snapshot: LevelSnapshot,
    /// Some field had to be coerced or clamped
    pub repaired: bool,
}

/// Every expected key must be present, otherwise the slot is corrupt.
pub fn validate_snapshot<'a>(
    level_id: &str,
    value: &'a Value,
) -> Result<&'a Map<String, Value>, SaveError> {
    let object = value.as_object().ok_or_else(|| {
        SaveError::Corrupted(format!("level `{level_id}` snapshot is not an object"))
    })?;
    let missing: Vec<String> = EXPECTED_SNAPSHOT_KEYS
        .iter()
        .filter(|key| !object.contains_key(**key))
        .map(|key| key.to_string())
        .collect();
    if missing.is_empty() {
        Ok(object)
    } else {
        Err(SaveError::MissingKeys {
            level: level_id.to_string(),
            missing,
        })
    }
}

fn field<T: DeserializeOwned + Default>(
    level_id: &str,
    object: &Map<String, Value>,
    key: &'static str,
    repaired: &mut bool,
) -> T {
    let Some(value) = object.get(key) else {
        *repaired = true;
        return T::default();
    };
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(level = %level_id, field = key, error = %err, "save_field_coerced");
            *repaired = true;
            T::default()
        }
    }
}

/// Type-check each field, coercing bad ones to defaults, then re-establish
/// runtime invariants and drop presentation-only session state.
pub fn sanitize_snapshot(level_id: &str, object: &Map<String, Value>) -> Sanitized {
    let mut repaired = false;
    let mut snapshot = LevelSnapshot {
        objectives_collected: field(level_id, object, "objectivesCollected", &mut repaired),
        inventory: field(level_id, object, "inventory", &mut repaired),
        level_state: field(level_id, object, "levelState", &mut repaired),
        player_state: field(level_id, object, "playerState", &mut repaired),
        player_vitals: field(level_id, object, "playerVitals", &mut repaired),
        projectiles: field(level_id, object, "projectiles", &mut repaired),
        pickups: field(level_id, object, "pickups", &mut repaired),
        npcs: field(level_id, object, "npcs", &mut repaired),
        safes: field(level_id, object, "safes", &mut repaired),
        session_state: field(level_id, object, "sessionState", &mut repaired),
        persistent_state: field(level_id, object, "persistentState", &mut repaired),
        saved_at: field(level_id, object, "savedAt", &mut repaired),
    };

    let vitals = snapshot.player_vitals.clone().sanitized();
    let player = snapshot.player_state.clone().sanitized();
    if vitals != snapshot.player_vitals || player != snapshot.player_state {
        warn!(level = %level_id, "save_player_clamped");
        repaired = true;
    }
    snapshot.player_vitals = vitals;
    snapshot.player_state = player;

    for npc in &mut snapshot.npcs {
        let before = npc.clone();
        npc.enforce_invariants();
        if *npc != before {
            warn!(level = %level_id, npc = %npc.id, "save_npc_invariants_restored");
            repaired = true;
        }
    }

    let projectile_count = snapshot.projectiles.len();
    snapshot.projectiles.retain(|p| p.is_valid());
    if snapshot.projectiles.len() != projectile_count {
        repaired = true;
    }

    snapshot.session_state.clear_transient();

    Sanitized { snapshot, repaired }
}
