//! End-to-end runs through `Game`: menu, prologue, loading, play, pause,
//! level advance, defeat and continuing from a save.

mod helpers;

use gloamfall::{FrameInput, Game, NullHud, SceneKey};
use helpers::*;
use pretty_assertions::assert_eq;
use save::{FileStorage, MemoryStorage, SaveStorage};
use tempfile::tempdir;

fn confirm() -> FrameInput {
    FrameInput {
        confirm: true,
        ..FrameInput::default()
    }
}

fn pause() -> FrameInput {
    FrameInput {
        pause: true,
        ..FrameInput::default()
    }
}

fn interact() -> FrameInput {
    FrameInput {
        interact: true,
        ..FrameInput::default()
    }
}

fn new_game(storage: impl SaveStorage + 'static) -> Game {
    let mut game = Game::new(config(), library(), storage, NullHud);
    game.start().unwrap();
    game
}

/// Unlock the current level's gate and stand in the doorway
fn stand_in_open_gate(game: &mut Game) {
    let session = game.session_mut().unwrap();
    let rt = session.runtime_mut();
    let gate_id = rt.level.gate().unwrap().id.clone();
    assert!(rt.level.unlock_gate(&gate_id));
    let (gx, gy) = rt.level.gate_world_center().unwrap();
    rt.player.x = gx;
    rt.player.y = gy;
}

#[test]
fn new_game_walks_through_the_prologue() {
    let mut game = new_game(MemoryStorage::new());
    assert_eq!(game.scene(), Some(&SceneKey::Menu));
    assert!(game.session().is_none());

    game.tick(FRAME, FrameInput::default()).unwrap();
    assert_eq!(game.scene(), Some(&SceneKey::Menu));

    game.tick(FRAME, confirm()).unwrap();
    assert_eq!(game.scene(), Some(&SceneKey::Prologue));

    game.tick(FRAME, confirm()).unwrap();
    assert_eq!(game.scene(), Some(&SceneKey::Loading));
    assert_eq!(game.session().map(|s| s.level_id()), Some("cellar"));

    game.tick(FRAME, FrameInput::default()).unwrap();
    assert_eq!(game.scene(), Some(&SceneKey::InGame));

    // Entering a level autosaves it
    let saves = &mut game.context_mut().saves;
    let payload = saves.payload("1").unwrap();
    assert_eq!(payload.current_level_id.as_deref(), Some("cellar"));
}

#[test]
fn pause_freezes_and_resumes_the_level() {
    let mut game = new_game(MemoryStorage::new());
    for input in [confirm(), confirm(), FrameInput::default()] {
        game.tick(FRAME, input).unwrap();
    }
    assert_eq!(game.scene(), Some(&SceneKey::InGame));

    game.tick(FRAME, pause()).unwrap();
    assert_eq!(game.scene(), Some(&SceneKey::Pause));
    let before = game.session().unwrap().runtime().player.clone();

    let walk = FrameInput {
        move_x: 1.0,
        ..FrameInput::default()
    };
    game.tick(FRAME, walk).unwrap();
    assert_eq!(game.session().unwrap().runtime().player, before);

    game.tick(FRAME, confirm()).unwrap();
    assert_eq!(game.scene(), Some(&SceneKey::InGame));
    game.tick(FRAME, walk).unwrap();
    assert!(game.session().unwrap().runtime().player.x > before.x);
}

#[test]
fn completing_a_level_carries_progress_forward() {
    let mut game = new_game(MemoryStorage::new());
    for input in [confirm(), confirm(), FrameInput::default()] {
        game.tick(FRAME, input).unwrap();
    }

    {
        let rt = game.session_mut().unwrap().runtime_mut();
        rt.inventory.add("lamp-oil", 1).unwrap();
        rt.persistent.set_flag("metMiller", true);
    }
    stand_in_open_gate(&mut game);

    game.tick(FRAME, interact()).unwrap();
    assert_eq!(game.scene(), Some(&SceneKey::Loading));
    let session = game.session().unwrap();
    assert_eq!(session.level_id(), "mill");
    let rt = session.runtime();
    assert_eq!(rt.inventory.count("lamp-oil"), 1);
    assert!(rt.persistent.get_flag("metMiller").is_some());
    assert_eq!(rt.objectives_collected, 0);

    game.tick(FRAME, FrameInput::default()).unwrap();
    assert_eq!(game.scene(), Some(&SceneKey::InGame));

    let payload = game.context_mut().saves.payload("1").unwrap();
    assert_eq!(payload.current_level_id.as_deref(), Some("mill"));
    assert!(payload.progress.contains_key("cellar"));
    assert!(payload.progress.contains_key("mill"));
}

#[test]
fn defeat_reloads_the_last_save() {
    let mut game = new_game(MemoryStorage::new());
    for input in [confirm(), confirm(), FrameInput::default()] {
        game.tick(FRAME, input).unwrap();
    }
    let max = game.session().unwrap().runtime().vitals.max_health;

    game.session_mut().unwrap().runtime_mut().vitals.health = 0;
    game.tick(FRAME, FrameInput::default()).unwrap();
    assert_eq!(game.scene(), Some(&SceneKey::Loading));

    let session = game.session().unwrap();
    assert_eq!(session.level_id(), "cellar");
    assert_eq!(session.runtime().vitals.health, max);
}

#[test]
fn finishing_the_last_level_returns_to_the_menu() {
    let mut game = new_game(MemoryStorage::new());
    for input in [confirm(), confirm(), FrameInput::default()] {
        game.tick(FRAME, input).unwrap();
    }
    stand_in_open_gate(&mut game);
    game.tick(FRAME, interact()).unwrap();
    game.tick(FRAME, FrameInput::default()).unwrap();
    assert_eq!(game.session().map(|s| s.level_id()), Some("mill"));

    stand_in_open_gate(&mut game);
    game.tick(FRAME, interact()).unwrap();
    assert!(game.is_finished());
    assert_eq!(game.scene(), Some(&SceneKey::Menu));
    assert!(game.session().is_none());
}

#[test]
fn continuing_skips_the_prologue_and_restores_state() {
    let dir = tempdir().unwrap();
    let storage = || FileStorage::new(dir.path(), "gloamfall_").unwrap();

    let mut game = new_game(storage());
    for input in [confirm(), confirm(), FrameInput::default()] {
        game.tick(FRAME, input).unwrap();
    }
    {
        let rt = game.session_mut().unwrap().runtime_mut();
        rt.inventory.add("cog", 1).unwrap();
        rt.objectives_collected = 1;
    }
    game.save().unwrap();
    drop(game);

    let mut game = new_game(storage());
    game.tick(FRAME, confirm()).unwrap();
    assert_eq!(game.scene(), Some(&SceneKey::Loading));
    let rt = game.session().unwrap().runtime();
    assert_eq!(rt.inventory.count("cog"), 1);
    assert_eq!(rt.objectives_collected, 1);
}

#[test]
fn unmigratable_slot_is_reset_with_a_notice() {
    let mut storage = MemoryStorage::new();
    storage.insert_raw("1", r#"{"version":0,"progress":{}}"#);
    let mut game = new_game(storage);

    // Slots are read lazily, on the first confirm in the menu
    assert!(game.context_mut().saves.take_notices().is_empty());

    game.tick(FRAME, confirm()).unwrap();
    // A reset slot starts a new game
    assert_eq!(game.scene(), Some(&SceneKey::Prologue));
    assert!(game.context_mut().saves.payload("1").is_none());
}
