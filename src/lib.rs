//! Gloamfall: the runtime core of a top-down narrative adventure.
//!
//! Level geometry lives in the `world` crate, player state in `hero`, light
//! combat in `combat`, quests and flags in `quests` and persistence in
//! `save`. This crate ties them together: level content, the action engine,
//! dialogue, interaction, the HUD interface, scenes and the game loop.

pub mod actions;
pub mod config;
pub mod content;
pub mod dialogue;
pub mod game;
pub mod hud;
pub mod interaction;
pub mod logging;
pub mod scene;
pub mod session;

pub use actions::{Action, ActionOutcome, ActionRegistry, RewardContext};
pub use config::GameConfig;
pub use content::{LevelConfig, LevelLibrary};
pub use game::{Game, GameContext};
pub use hud::{Hud, NullHud, RecordingHud};
pub use interaction::{InteractionOutcome, InteractionSystem};
pub use scene::{Scene, SceneCommand, SceneKey, SceneManager};
pub use session::{FrameInput, GameSession, LevelRuntime, Registries, SessionEvent};
