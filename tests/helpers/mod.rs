//! Shared setup for the integration tests: bundled levels, a seeded
//! configuration and player placement.

#![allow(dead_code)]

use gloamfall::{GameConfig, GameSession, LevelConfig, LevelLibrary, Registries};
use std::path::PathBuf;
use std::sync::Arc;

pub fn levels_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("levels")
}

pub fn library() -> LevelLibrary {
    LevelLibrary::load_dir(levels_dir()).expect("bundled levels load")
}

/// Defaults with a fixed seed so wandering NPCs are reproducible
pub fn config() -> GameConfig {
    GameConfig {
        seed: Some(7),
        ..GameConfig::default()
    }
}

pub fn level(id: &str) -> Arc<LevelConfig> {
    Arc::new(library().get(id).expect("level exists").clone())
}

pub fn session(content: Arc<LevelConfig>) -> GameSession {
    GameSession::bootstrap(content, &Registries::init(), &config()).expect("level bootstraps")
}

pub fn session_from_json(json: &str) -> GameSession {
    let content = LevelConfig::from_json_str(json).expect("inline level parses");
    session(Arc::new(content))
}

/// Put the player on the centre of a tile
pub fn place_on_tile(session: &mut GameSession, tx: i32, ty: i32) {
    let rt = session.runtime_mut();
    let (x, y) = rt.level.tile_center(tx, ty);
    rt.player.x = x;
    rt.player.y = y;
}

pub fn place_at(session: &mut GameSession, x: f32, y: f32) {
    let rt = session.runtime_mut();
    rt.player.x = x;
    rt.player.y = y;
}

pub const FRAME: f32 = 1.0 / 60.0;
