//! Save slots
//!
//! Versioned, multi-slot save games. A slot holds one [`SavePayload`] with a
//! [`LevelSnapshot`] per visited level. Loading runs parse, migration,
//! structural validation and field repair; a slot that fails any hard step
//! is reset and a [`SlotNotice`] is queued for the player.

pub mod migrate;
pub mod sanitize;
pub mod snapshot;
pub mod storage;
pub mod store;

pub use migrate::{MigrationRegistry, Migrator};
pub use sanitize::{Sanitized, sanitize_snapshot, validate_snapshot};
pub use snapshot::{
    EXPECTED_SNAPSHOT_KEYS, LevelSnapshot, PickupData, QuizProgress, SAVE_VERSION, SafeData,
    SavePayload, SessionStateData, SlotSummary,
};
pub use storage::{FileStorage, MemoryStorage, SaveStorage};
pub use store::{SaveGameStore, SlotNotice};
