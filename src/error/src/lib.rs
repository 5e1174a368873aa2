//! Error types shared across the game crates
//!
//! Error taxonomy shared by every crate in the workspace. Level construction
//! failures are fatal, persistence problems are recovered by the save store,
//! and scene hook failures are reported to whoever requested the transition.

use thiserror::Error;

/// Fatal level construction errors. A level that produces one of these is
/// unplayable and must not be instantiated.
#[derive(Debug, Error)]
pub enum LevelError {
    /// A tile layer does not cover exactly `width * height` tiles
    #[error("tile layer `{layer}` has {actual} tiles, expected {expected}")]
    DimensionMismatch {
        layer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("level dimensions must be non-zero (got {width}x{height})")]
    EmptyDimensions { width: u32, height: u32 },

    /// A configured interactable sits outside the tile grid
    #[error("{what} at tile ({tx}, {ty}) is outside the level bounds")]
    OutOfBounds { what: String, tx: i32, ty: i32 },

    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },

    /// Level JSON could not be parsed; `path` is the JSON path of the fault
    #[error("failed to parse level config at `{path}`: {message}")]
    Parse { path: String, message: String },

    #[error("IO error while reading level: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence errors. These never escape the save store's load path: the
/// store resets the affected slot instead.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("save payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// No such save slot
    #[error("invalid save slot `{0}`")]
    InvalidSlot(String),

    #[error("save payload is not a JSON object")]
    NotAnObject,

    #[error("save payload has no usable version field")]
    MissingVersion,

    #[error("save version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("no migrator registered for save version {from}")]
    MissingMigrator { from: u32 },

    #[error("migration chain revisited version {version}")]
    MigrationCycle { version: u32 },

    #[error("migrator for version {from} failed: {message}")]
    MigratorFailed { from: u32, message: String },

    /// Slot data could not be read back
    #[error("level `{level}` snapshot is missing keys: {missing:?}")]
    MissingKeys { level: String, missing: Vec<String> },

    #[error("corrupted save data: {0}")]
    Corrupted(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("no scene registered for `{0}`")]
    UnknownScene(String),

    #[error("resume requested but no scene is paused")]
    NotPaused,

    /// A scene lifecycle hook reported a failure
    #[error("scene `{scene}` failed during {hook}: {message}")]
    Hook {
        scene: String,
        hook: &'static str,
        message: String,
    },
}

impl SceneError {
    pub fn hook(scene: impl Into<String>, hook: &'static str, message: impl Into<String>) -> Self {
        SceneError::Hook {
            scene: scene.into(),
            hook,
            message: message.into(),
        }
    }
}

/// Errors raised while the game runs
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Level error: {0}")]
    Level(#[from] LevelError),

    #[error("Save error: {0}")]
    Save(#[from] SaveError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown level `{0}`")]
    UnknownLevel(String),

    /// Game reached an inconsistent state
    #[error("Invalid game state: {0}")]
    InvalidGameState(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Turn an error into a short message for the player
pub fn handle_error(error: &GameError) -> String {
    match error {
        GameError::Level(LevelError::Io(e)) | GameError::Save(SaveError::Io(e)) => match e.kind()
        {
            std::io::ErrorKind::NotFound => "File not found".to_string(),
            std::io::ErrorKind::PermissionDenied => "Permission denied".to_string(),
            _ => format!("IO error: {e}"),
        },
        GameError::Save(save) => handle_save_error(save),
        GameError::Level(_) => "This level is damaged and cannot be played".to_string(),
        GameError::UnknownLevel(id) => format!("Level `{id}` does not exist"),
        _ => error.to_string(),
    }
}

/// Player-facing text for a save problem, used by the slot reset toast.
pub fn handle_save_error(error: &SaveError) -> String {
    match error {
        SaveError::Json(_) | SaveError::NotAnObject | SaveError::Corrupted(_) => {
            "Save data was corrupted and has been reset".to_string()
        }
        SaveError::MissingVersion
        | SaveError::UnsupportedVersion { .. }
        | SaveError::MissingMigrator { .. }
        | SaveError::MigrationCycle { .. }
        | SaveError::MigratorFailed { .. } => {
            "Save data came from an incompatible version and has been reset".to_string()
        }
        SaveError::MissingKeys { .. } => "Save data was incomplete and has been reset".to_string(),
        SaveError::InvalidSlot(slot) => format!("Invalid save slot `{slot}`"),
        SaveError::Io(e) => format!("Could not access save storage: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_errors_map_to_reset_messages() {
        let msg = handle_error(&GameError::Save(SaveError::MissingMigrator { from: 1 }));
        assert!(msg.contains("incompatible"));

        let msg = handle_error(&GameError::Save(SaveError::MissingKeys {
            level: "cellar".into(),
            missing: vec!["npcs".into()],
        }));
        assert!(msg.contains("incomplete"));
    }

    #[test]
    fn io_not_found_is_friendly() {
        let err = GameError::Level(LevelError::Io(std::io::Error::from(
            std::io::ErrorKind::NotFound,
        )));
        assert_eq!(handle_error(&err), "File not found");
    }

    #[test]
    fn dimension_mismatch_names_layer() {
        let err = LevelError::DimensionMismatch {
            layer: "decor",
            expected: 9,
            actual: 8,
        };
        assert_eq!(err.to_string(), "tile layer `decor` has 8 tiles, expected 9");
    }
}
