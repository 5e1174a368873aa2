use anyhow::{Context, Result, bail};
use gloamfall::hud::TracingHud;
use gloamfall::logging::init_tracing;
use gloamfall::{FrameInput, Game, GameConfig, LevelLibrary, SceneKey};
use save::FileStorage;
use std::env;
use tracing::info;

const FRAME_DT: f32 = 1.0 / 60.0;
const DEFAULT_FRAMES: u32 = 600;

/// Headless runner: boots the game into the first level, idles the session
/// for a number of frames (pressing interact once a second) and saves.
///
/// Usage: `gloamfall [config.toml] [frames]`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "gloamfall.toml".to_string());
    let frames = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("Invalid frame count `{raw}`"))?,
        None => DEFAULT_FRAMES,
    };

    let config = GameConfig::load(&config_path)?;
    init_tracing(&config.log_level);

    let library = LevelLibrary::load_dir(&config.levels_dir)?;
    let storage = FileStorage::new(&config.save.directory, &config.save.key_prefix)
        .context("Failed to open save directory")?;
    let mut game = Game::new(config, library, storage, TracingHud);

    game.start()?;
    let confirm = FrameInput {
        confirm: true,
        ..FrameInput::default()
    };
    // menu -> prologue -> loading -> in game
    for _ in 0..4 {
        if game.scene() == Some(&SceneKey::InGame) {
            break;
        }
        game.tick(FRAME_DT, confirm)?;
    }
    if game.scene() != Some(&SceneKey::InGame) {
        bail!("No playable level found in the level directory");
    }

    for frame in 0..frames {
        let input = FrameInput {
            interact: frame % 60 == 0,
            ..FrameInput::default()
        };
        game.tick(FRAME_DT, input)?;
        if game.is_finished() {
            break;
        }
    }

    game.save()?;
    if let Some(session) = game.session() {
        let rt = session.runtime();
        info!(
            level = %session.level_id(),
            health = rt.vitals.health,
            objectives = rt.objectives_collected,
            "headless_run_finished"
        );
    }
    Ok(())
}
