mod helpers;

use gloamfall::{GameConfig, LevelConfig, LevelLibrary};
use helpers::*;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::tempdir;
use world::tiles;

#[test]
fn bundled_levels_load_in_order() {
    let library = library();
    let ids: Vec<&str> = library.iter().map(|l| l.id()).collect();
    assert_eq!(ids, vec!["cellar", "mill"]);
    assert_eq!(library.next_after("cellar").map(|l| l.id()), Some("mill"));
    assert!(library.next_after("mill").is_none());
}

#[test]
fn cellar_sets_up_its_level_state() {
    let session = session(level("cellar"));
    let rt = session.runtime();
    let level = &rt.level;

    assert!(level.is_gate_locked());
    assert_eq!(level.collision_at_tile(9, 3), Some(tiles::DOOR_LOCKED));
    assert_eq!(level.destructible_count(), 1);
    assert_eq!(level.light_switches().len(), 1);
    let (x, y) = level.tile_center(1, 3);
    assert!(level.is_lit_at(x, y));
    assert_eq!((rt.player.x, rt.player.y), (x, y));

    assert_eq!(rt.npcs().len(), 1);
    assert_eq!(rt.pickups().len(), 3);
    assert_eq!(rt.safes().len(), 1);
    assert_eq!(session.content().objective_total(), 2);
    assert_eq!(rt.session.area, "Mill Cellar");
}

#[test]
fn bad_level_file_fails_the_directory_load() {
    let dir = tempdir().unwrap();
    fs::copy(levels_dir().join("01_cellar.json"), dir.path().join("01_cellar.json")).unwrap();
    fs::write(dir.path().join("02_broken.json"), r#"{ "meta": { "id": "x" } }"#).unwrap();
    fs::write(dir.path().join("notes.txt"), "not a level").unwrap();

    let err = LevelLibrary::load_dir(dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains("02_broken.json"));

    fs::remove_file(dir.path().join("02_broken.json")).unwrap();
    let library = LevelLibrary::load_dir(dir.path()).unwrap();
    assert_eq!(library.len(), 1);
}

#[test]
fn unknown_quest_type_is_a_parse_error() {
    let source = fs::read_to_string(levels_dir().join("02_mill.json")).unwrap();
    let broken = source.replace(r#""type": "escort""#, r#""type": "race""#);
    assert_ne!(source, broken);
    let err = LevelConfig::from_json_str(&broken).unwrap_err();
    assert!(err.to_string().contains("quests"));
}

#[test]
fn sample_config_parses() {
    let source = fs::read_to_string(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("gloamfall.toml"),
    )
    .unwrap();
    let config = GameConfig::from_toml_str(&source).unwrap();
    assert_eq!(config.levels_dir, std::path::PathBuf::from("levels"));
    assert_eq!(config.interaction.gate_radius, 26.0);
}
