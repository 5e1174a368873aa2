mod helpers;

use gloamfall::hud::HudEvent;
use gloamfall::{FrameInput, GameSession, RecordingHud, SessionEvent};
use helpers::*;
use hero::Facing;
use pretty_assertions::assert_eq;
use quests::FlagValue;

fn step(session: &mut GameSession, hud: &mut RecordingHud, input: FrameInput) -> SessionEvent {
    session.update(FRAME, &input, hud)
}

fn press() -> FrameInput {
    FrameInput {
        interact: true,
        ..FrameInput::default()
    }
}

fn answer(choice: usize) -> FrameInput {
    FrameInput {
        answer: Some(choice),
        ..FrameInput::default()
    }
}

fn last_options(hud: &RecordingHud) -> Vec<String> {
    hud.events
        .iter()
        .rev()
        .find_map(|e| match e {
            HudEvent::Dialogue { meta, .. } => Some(meta.options.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn at_sparrow() -> GameSession {
    let mut session = session(level("mill"));
    place_on_tile(&mut session, 3, 2);
    session
}

#[test]
fn passing_the_quiz_pays_out_and_opens_the_gate() {
    let mut session = at_sparrow();
    let mut hud = RecordingHud::new();

    step(&mut session, &mut hud, press());
    assert_eq!(
        hud.last_dialogue().map(|(_, line)| line),
        Some("What turns but never moves?")
    );
    assert_eq!(last_options(&hud), vec!["A millstone", "A key"]);
    assert_eq!(
        session.runtime().session.active_quiz.as_ref().map(|q| q.question),
        Some(0)
    );

    step(&mut session, &mut hud, answer(1));
    assert_eq!(
        hud.last_dialogue().map(|(_, line)| line),
        Some("What grows when fed and dies when watered?")
    );

    step(&mut session, &mut hud, answer(0));
    assert_eq!(
        hud.last_dialogue(),
        Some(("Sparrow", "Right both times."))
    );
    let rt = session.runtime();
    assert_eq!(rt.session.active_quiz, None);
    assert_eq!(rt.inventory.ammo("pebble"), 10);
    assert_eq!(
        rt.persistent.get_flag("sparrowQuizPassed"),
        Some(&FlagValue::Bool(true))
    );
    assert!(rt.persistent.is_quest_complete("riddles"));

    // A passed quiz never restarts
    step(&mut session, &mut hud, press());
    assert_eq!(
        hud.last_dialogue().map(|(_, line)| line),
        Some("Clever one. The door is yours.")
    );

    let (gx, gy) = session.runtime().level.gate_world_center().unwrap();
    place_at(&mut session, gx - 24.0, gy);
    step(&mut session, &mut hud, press());
    assert_eq!(hud.last_prompt(), Some("gate_unlocked"));
    assert!(!session.runtime().level.is_gate_locked());
}

#[test]
fn wrong_answer_ends_the_quiz_until_asked_again() {
    let mut session = at_sparrow();
    let mut hud = RecordingHud::new();

    step(&mut session, &mut hud, press());
    step(&mut session, &mut hud, answer(0));
    assert_eq!(
        hud.last_dialogue().map(|(_, line)| line),
        Some("Wrong! Come back when you are wiser.")
    );
    let rt = session.runtime();
    assert_eq!(rt.session.active_quiz, None);
    assert_eq!(rt.inventory.ammo("pebble"), 0);
    assert_eq!(rt.persistent.get_flag("sparrowQuizPassed"), None);

    step(&mut session, &mut hud, press());
    assert_eq!(
        hud.last_dialogue().map(|(_, line)| line),
        Some("What turns but never moves?")
    );
}

#[test]
fn interact_during_quiz_repeats_the_question() {
    let mut session = at_sparrow();
    let mut hud = RecordingHud::new();

    step(&mut session, &mut hud, press());
    step(&mut session, &mut hud, answer(1));
    hud.clear();
    step(&mut session, &mut hud, press());
    assert_eq!(hud.dialogues(), 1);
    assert_eq!(last_options(&hud), vec!["Fire", "Bread"]);
}

const RAT_CORRIDOR: &str = r#"{
    "meta": { "id": "corridor", "name": "Corridor" },
    "dimensions": { "width": 7, "height": 3 },
    "tileLayers": {
        "collision": [2,2,2,2,2,2,2, 2,1,1,1,1,1,2, 2,2,2,2,2,2,2],
        "decor":     [0,0,0,0,0,0,0, 0,0,0,0,0,0,0, 0,0,0,0,0,0,0]
    },
    "actors": {
        "playerStart": { "tx": 1, "ty": 1 },
        "npcs": [ { "id": "rat", "name": "Rat", "tx": 4, "ty": 1, "health": 1,
                    "lethal": true, "contactDamage": 2, "defeatFlag": "ratsDefeated",
                    "wanders": false } ]
    },
    "quests": [
        { "id": "rats", "type": "defeat", "title": "Rats", "progressFlag": "ratsDefeated",
          "objectiveCount": 1 }
    ]
}"#;

#[test]
fn projectile_defeats_the_rat_and_completes_the_quest() {
    let mut session = session_from_json(RAT_CORRIDOR);
    let mut hud = RecordingHud::new();
    let rt = session.runtime_mut();
    rt.player.facing = Facing::Right;
    rt.inventory.add_ammo("pebble", 1);

    let attack = FrameInput {
        attack: true,
        ..FrameInput::default()
    };
    step(&mut session, &mut hud, attack);
    assert_eq!(session.runtime().inventory.ammo("pebble"), 0);
    assert_eq!(session.runtime().projectiles().len(), 1);

    for _ in 0..60 {
        step(&mut session, &mut hud, FrameInput::default());
    }

    let rt = session.runtime();
    let npcs = rt.npcs();
    let rat = &npcs[0];
    assert!(rat.defeated);
    assert!(!rat.lethal);
    assert!(rt.projectiles().is_empty());
    assert_eq!(rt.persistent.get_flag("ratsDefeated"), Some(&FlagValue::Int(1)));
    assert!(rt.persistent.is_quest_complete("rats"));

    step(&mut session, &mut hud, attack);
    assert_eq!(hud.last_prompt(), Some("no_ammo"));
}

#[test]
fn touching_a_lethal_npc_hurts_and_can_kill() {
    let mut session = session_from_json(RAT_CORRIDOR);
    let mut hud = RecordingHud::new();
    let (rx, ry) = session.runtime().level.tile_center(4, 1);
    place_at(&mut session, rx, ry);

    assert_eq!(step(&mut session, &mut hud, FrameInput::default()), SessionEvent::None);
    let max = session.runtime().vitals.max_health;
    assert_eq!(session.runtime().vitals.health, max - 2);
    assert!(hud.events.contains(&HudEvent::Health(max - 2, max)));

    // Invulnerable right after a hit
    step(&mut session, &mut hud, FrameInput::default());
    assert_eq!(session.runtime().vitals.health, max - 2);

    let rt = session.runtime_mut();
    rt.vitals.health = 2;
    rt.vitals.invulnerable_for = 0.0;
    assert_eq!(
        step(&mut session, &mut hud, FrameInput::default()),
        SessionEvent::PlayerDefeated
    );
    assert_eq!(
        step(&mut session, &mut hud, FrameInput::default()),
        SessionEvent::PlayerDefeated
    );
}
