//! InteractionSystem: resolves an interact press against whatever is in
//! reach, and keeps open dialogue tied to NPC proximity.
//!
//! Priority when several candidates are in range:
//! active quiz > light switch > safe > locked gate > NPC dialogue > open gate.
//! Pickups in reach are collected on every press regardless of the outcome.

use combat::NpcState;
use combat::constants::TALK_HOLD_SECS;
use hecs::Entity;
use quests::{FlagValue, QuestEngine};
use save::{PickupData, QuizProgress, SafeData};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::actions::{Action, ActionOutcome, ActionRegistry, RewardContext};
use crate::config::InteractionConfig;
use crate::content::LevelConfig;
use crate::dialogue::{DialogueFacts, DialogueLine, QuizStep};
use crate::hud::{DialogueMeta, Hud, PromptParams};
use crate::session::{LevelRuntime, WorldPos};

/// What an interact press resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionOutcome {
    Nothing,
    Quiz { npc_id: String },
    Switch { id: String },
    Safe { id: String, opened: bool },
    GateLocked,
    GateUnlocked,
    Dialogue { npc_id: String, line_id: String },
    /// The open gate was used; fires once per level
    LevelAdvance,
}

/// Nearest interactables within their radii, computed before resolving
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub npc: Option<Entity>,
    pub switch: Option<String>,
    pub safe: Option<Entity>,
    /// `Some(locked)` when the gate is in reach
    pub gate: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct InteractionSystem {
    content: Arc<LevelConfig>,
    actions: Arc<ActionRegistry>,
    quests: QuestEngine,
    radii: InteractionConfig,
}

fn succeeded() -> ActionOutcome {
    ActionOutcome {
        success: true,
        ..ActionOutcome::default()
    }
}

fn merge_notes(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(format!("{a}\n{b}")),
        (a, b) => a.or(b),
    }
}

fn params<const N: usize>(pairs: [(&str, String); N]) -> PromptParams {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Flag recording that a reward id has been handed out
pub fn reward_claimed_flag(reward_id: &str) -> String {
    format!("rewardClaimed:{reward_id}")
}

impl InteractionSystem {
    pub fn new(
        content: Arc<LevelConfig>,
        actions: Arc<ActionRegistry>,
        quests: QuestEngine,
        radii: InteractionConfig,
    ) -> Self {
        Self {
            content,
            actions,
            quests,
            radii,
        }
    }

    pub fn quests(&self) -> &QuestEngine {
        &self.quests
    }

    pub fn candidates(&self, rt: &LevelRuntime) -> Candidates {
        let (px, py) = (rt.player.x, rt.player.y);
        let distance = |x: f32, y: f32| rt.player.distance_to(x, y);

        let npc = rt
            .actors
            .query::<&NpcState>()
            .iter()
            .filter(|(_, npc)| !npc.defeated)
            .map(|(entity, npc)| (entity, distance(npc.x, npc.y)))
            .filter(|(_, d)| *d <= self.radii.npc_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(entity, _)| entity);

        let (ptx, pty) = rt.level.world_to_tile(px, py);
        let switch = rt
            .level
            .light_switches()
            .iter()
            .filter(|s| !s.activated)
            .map(|s| (s, (s.tx - ptx).abs().max((s.ty - pty).abs())))
            .filter(|(_, d)| *d <= self.radii.switch_tiles)
            .min_by_key(|(_, d)| *d)
            .map(|(s, _)| s.id.clone());

        let safe = rt
            .actors
            .query::<(&SafeData, &WorldPos)>()
            .iter()
            .map(|(entity, (_, pos))| (entity, distance(pos.x, pos.y)))
            .filter(|(_, d)| *d <= self.radii.safe_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(entity, _)| entity);

        let gate = rt.level.gate_world_center().and_then(|(gx, gy)| {
            (distance(gx, gy) <= self.radii.gate_radius).then(|| rt.level.is_gate_locked())
        });

        Candidates {
            npc,
            switch,
            safe,
            gate,
        }
    }

    /// Resolve one interact press.
    pub fn interact(&self, rt: &mut LevelRuntime, hud: &mut dyn Hud) -> InteractionOutcome {
        self.collect_pickups(rt, hud);

        if let Some(progress) = rt.session.active_quiz.clone() {
            self.show_question(rt, &progress, hud);
            return InteractionOutcome::Quiz {
                npc_id: progress.npc_id,
            };
        }

        let candidates = self.candidates(rt);
        if let Some(id) = candidates.switch {
            return self.use_switch(rt, id, hud);
        }
        if let Some(entity) = candidates.safe {
            return self.use_safe(rt, entity, hud);
        }
        if candidates.gate == Some(true) {
            return self.use_locked_gate(rt, hud);
        }
        if let Some(entity) = candidates.npc {
            return self.talk(rt, entity, hud);
        }
        if candidates.gate == Some(false) {
            return self.use_open_gate(rt, hud);
        }
        InteractionOutcome::Nothing
    }

    /// Pick up everything within reach.
    pub fn collect_pickups(&self, rt: &mut LevelRuntime, hud: &mut dyn Hud) -> usize {
        let in_reach: Vec<(Entity, PickupData)> = rt
            .actors
            .query::<&PickupData>()
            .iter()
            .filter(|(_, p)| rt.player.distance_to(p.x, p.y) <= self.radii.pickup_radius)
            .map(|(entity, p)| (entity, p.clone()))
            .collect();

        let mut collected = 0;
        for (entity, pickup) in in_reach {
            if pickup.store_in_inventory {
                if let Err(err) = rt.inventory.add(&pickup.item, pickup.amount) {
                    debug!(item = %pickup.item, %err, "pickup_refused");
                    hud.show_world_prompt(
                        "inventory_full",
                        pickup.x,
                        pickup.y,
                        &params([("item", pickup.item.clone())]),
                    );
                    continue;
                }
            } else {
                rt.inventory.add_ammo(&pickup.item, pickup.amount);
            }
            // Despawn cannot fail: the entity came from the query above
            let _ = rt.actors.despawn(entity);
            collected += 1;
            info!(pickup = %pickup.id, item = %pickup.item, amount = pickup.amount, "pickup_collected");
            hud.show_world_prompt(
                "pickup",
                pickup.x,
                pickup.y,
                &params([
                    ("item", pickup.item.clone()),
                    ("amount", pickup.amount.to_string()),
                ]),
            );
            if pickup.objective {
                rt.objectives_collected += 1;
                hud.set_objectives(rt.objectives_collected, self.content.objective_total());
            }
        }

        if collected > 0 {
            self.refresh_quests(rt, hud);
        }
        collected
    }

    /// Re-run every quest and announce fresh completions.
    pub fn refresh_quests(&self, rt: &mut LevelRuntime, hud: &mut dyn Hud) -> usize {
        let completions =
            self.quests
                .evaluate(&mut rt.persistent, &rt.inventory, rt.objectives_collected);
        for completion in &completions {
            hud.show_world_prompt(
                "quest_complete",
                rt.player.x,
                rt.player.y,
                &params([
                    ("quest", completion.quest_id.clone()),
                    ("note", completion.note.clone()),
                ]),
            );
        }
        hud.set_quest_log(&self.quests.log(&rt.persistent));
        completions.len()
    }

    fn use_switch(&self, rt: &mut LevelRuntime, id: String, hud: &mut dyn Hud) -> InteractionOutcome {
        if let Some(toggle) = rt.level.toggle_light_switch(&id) {
            let (x, y) = rt
                .level
                .light_switch(&id)
                .map(|s| rt.level.tile_center(s.tx, s.ty))
                .unwrap_or((rt.player.x, rt.player.y));
            let text_id = if toggle.activated { "switch_on" } else { "switch_off" };
            hud.show_world_prompt(text_id, x, y, &PromptParams::new());
        }
        InteractionOutcome::Switch { id }
    }

    fn use_safe(&self, rt: &mut LevelRuntime, entity: Entity, hud: &mut dyn Hud) -> InteractionOutcome {
        let (data, pos) = match rt.actors.query_one_mut::<(&SafeData, &WorldPos)>(entity) {
            Ok((data, pos)) => (data.clone(), *pos),
            Err(_) => return InteractionOutcome::Nothing,
        };
        let Some(config) = self.content.safe(&data.id) else {
            warn!(safe = %data.id, "safe_config_missing");
            return InteractionOutcome::Nothing;
        };

        if data.opened {
            hud.show_world_prompt("safe_empty", pos.x, pos.y, &PromptParams::new());
            return InteractionOutcome::Safe {
                id: data.id,
                opened: true,
            };
        }

        let has_item = config
            .required_item
            .as_deref()
            .is_none_or(|item| rt.inventory.has(item, 1));
        let has_flag = config
            .required_flag
            .as_deref()
            .is_none_or(|flag| rt.persistent.get_flag(flag).is_some_and(FlagValue::is_truthy));
        if !has_item || !has_flag {
            let text_id = config.locked_prompt.as_deref().unwrap_or("safe_locked");
            let mut prompt = PromptParams::new();
            if let Some(item) = &config.required_item {
                prompt.insert("item".into(), item.clone());
            }
            hud.show_world_prompt(text_id, pos.x, pos.y, &prompt);
            return InteractionOutcome::Safe {
                id: data.id,
                opened: false,
            };
        }

        let reward = self.content.reward(&config.reward);
        if reward.is_none() {
            warn!(safe = %config.id, reward = %config.reward, "reward_missing");
        }
        let mut actions = Vec::new();
        if let (true, Some(item)) = (config.consume_item, &config.required_item) {
            actions.push(Action::ConsumeItem {
                item: item.clone(),
                amount: 1,
            });
        }
        actions.extend(reward.iter().flat_map(|r| r.actions.iter().cloned()));
        let context = reward.map(|r| r.context()).unwrap_or_default();
        let outcome = self
            .actions
            .run_actions(&actions, &mut rt.action_context(), context);

        if !outcome.success {
            self.show_blocked(&outcome, "", hud);
            return InteractionOutcome::Safe {
                id: data.id,
                opened: false,
            };
        }

        if let Ok(mut safe) = rt.actors.get::<&mut SafeData>(entity) {
            safe.opened = true;
        }
        info!(safe = %config.id, "safe_opened");
        let line = config.opened_line.as_deref().unwrap_or("The safe clicks open.");
        hud.show_dialogue(
            "",
            line,
            &DialogueMeta {
                note: outcome.note,
                ..DialogueMeta::default()
            },
        );
        self.refresh_quests(rt, hud);
        InteractionOutcome::Safe {
            id: data.id,
            opened: true,
        }
    }

    /// Key consumed and flag set, then the gate opens. Without the key the
    /// locked prompt is shown.
    fn use_locked_gate(&self, rt: &mut LevelRuntime, hud: &mut dyn Hud) -> InteractionOutcome {
        let Some(config) = self.content.interactables.gate.as_ref() else {
            return InteractionOutcome::Nothing;
        };
        let (x, y) = rt
            .level
            .gate_world_center()
            .unwrap_or((rt.player.x, rt.player.y));

        let mut actions = Vec::new();
        let can_open = match (&config.required_item, &config.unlock_flag) {
            (Some(item), _) if rt.inventory.has(item, 1) => {
                actions.push(Action::ConsumeItem {
                    item: item.clone(),
                    amount: 1,
                });
                true
            }
            (Some(_), _) => false,
            (None, Some(flag)) => rt.persistent.get_flag(flag).is_some_and(FlagValue::is_truthy),
            (None, None) => false,
        };

        if !can_open {
            let text_id = config.locked_prompt.as_deref().unwrap_or("gate_locked");
            let mut prompt = PromptParams::new();
            if let Some(item) = &config.required_item {
                prompt.insert("item".into(), item.clone());
            }
            hud.show_world_prompt(text_id, x, y, &prompt);
            return InteractionOutcome::GateLocked;
        }

        if let Some(flag) = &config.unlock_flag {
            actions.push(Action::SetFlag {
                flag: flag.clone(),
                value: FlagValue::Bool(true),
            });
        }
        actions.push(Action::Unlock {
            target: config.id.clone(),
        });
        let outcome =
            self.actions
                .run_actions(&actions, &mut rt.action_context(), RewardContext::default());
        if !outcome.success {
            self.show_blocked(&outcome, "", hud);
            return InteractionOutcome::GateLocked;
        }

        hud.show_world_prompt("gate_unlocked", x, y, &PromptParams::new());
        self.refresh_quests(rt, hud);
        InteractionOutcome::GateUnlocked
    }

    fn use_open_gate(&self, rt: &mut LevelRuntime, hud: &mut dyn Hud) -> InteractionOutcome {
        self.refresh_quests(rt, hud);
        if rt.session.level_advance_queued {
            return InteractionOutcome::Nothing;
        }
        rt.session.level_advance_queued = true;
        info!(level = %rt.level.id(), "level_advance_queued");
        InteractionOutcome::LevelAdvance
    }

    fn talk(&self, rt: &mut LevelRuntime, entity: Entity, hud: &mut dyn Hud) -> InteractionOutcome {
        let mut npc = match rt.actors.get::<&NpcState>(entity) {
            Ok(npc) => (*npc).clone(),
            Err(_) => return InteractionOutcome::Nothing,
        };
        let script = self.content.npc_scripts.get(&npc.template_id);
        let facts = DialogueFacts {
            persistent: &rt.persistent,
            inventory: &rt.inventory,
            has_spoken: npc.has_spoken,
        };

        if let Some(quiz) = script.and_then(|s| s.quiz.as_ref()) {
            if quiz.can_start(&facts) {
                let progress = QuizProgress {
                    npc_id: npc.id.clone(),
                    question: 0,
                };
                rt.session.active_npc = Some(npc.id.clone());
                rt.session.active_speaker = npc.name.clone();
                rt.session.active_line = Some(format!("quiz:{}", progress.question));
                rt.session.dialogue_time = 0.0;
                rt.session.active_quiz = Some(progress.clone());
                self.show_question(rt, &progress, hud);
                npc.has_spoken = true;
                npc.hold(TALK_HOLD_SECS);
                self.store_npc(rt, entity, npc.clone());
                return InteractionOutcome::Quiz { npc_id: npc.id };
            }
        }

        let fallback = DialogueLine::plain("silent", "...");
        let line = script
            .and_then(|s| s.select_line(&facts))
            .unwrap_or(&fallback)
            .clone();
        let speaker = line.speaker.clone().unwrap_or_else(|| npc.name.clone());

        let outcome = self.apply_line(rt, &line);
        let shown = if outcome.success {
            line.text.clone()
        } else {
            outcome.blocked_dialogue.clone().unwrap_or_else(|| line.text.clone())
        };
        let note = if outcome.success {
            outcome.note.clone()
        } else {
            merge_notes(outcome.note.clone(), outcome.blocked_note.clone())
        };
        hud.show_dialogue(
            &speaker,
            &shown,
            &DialogueMeta {
                npc_id: Some(npc.id.clone()),
                options: Vec::new(),
                note,
            },
        );
        debug!(npc = %npc.id, line = %line.id, success = outcome.success, "dialogue_line");

        rt.session.active_npc = Some(npc.id.clone());
        rt.session.active_speaker = speaker;
        rt.session.active_line = Some(line.id.clone());
        rt.session.dialogue_time = 0.0;

        npc.has_spoken = true;
        npc.hold(TALK_HOLD_SECS);
        let npc_id = npc.id.clone();
        self.store_npc(rt, entity, npc);

        if outcome.success && line.has_effects() {
            self.refresh_quests(rt, hud);
        }
        InteractionOutcome::Dialogue {
            npc_id,
            line_id: line.id,
        }
    }

    /// Reward, then the line's own actions, then `setState` when both
    /// succeeded.
    fn apply_line(&self, rt: &mut LevelRuntime, line: &DialogueLine) -> ActionOutcome {
        let reward = match &line.reward {
            Some(id) => self.claim_reward(rt, id),
            None => succeeded(),
        };
        if !reward.success {
            return reward;
        }

        let mut outcome =
            self.actions
                .run_actions(&line.actions, &mut rt.action_context(), RewardContext::default());
        outcome.note = merge_notes(reward.note, outcome.note);
        if outcome.success {
            for (flag, value) in &line.set_state {
                rt.persistent.set_flag(flag, value.clone());
            }
        }
        outcome
    }

    /// Run a reward from the level's table at most once per save.
    pub fn claim_reward(&self, rt: &mut LevelRuntime, reward_id: &str) -> ActionOutcome {
        let flag = reward_claimed_flag(reward_id);
        if rt.persistent.get_flag(&flag).is_some_and(FlagValue::is_truthy) {
            return succeeded();
        }
        let Some(reward) = self.content.reward(reward_id) else {
            warn!(reward = %reward_id, level = %rt.level.id(), "reward_missing");
            return succeeded();
        };
        let outcome =
            self.actions
                .run_actions(&reward.actions, &mut rt.action_context(), reward.context());
        if outcome.success {
            rt.persistent.set_flag(&flag, true);
        }
        outcome
    }

    fn show_question(&self, rt: &LevelRuntime, progress: &QuizProgress, hud: &mut dyn Hud) {
        let Some(quiz) = self.quiz_for(rt, &progress.npc_id) else {
            return;
        };
        if let Some(question) = quiz.question(progress.question) {
            hud.show_dialogue(
                &rt.session.active_speaker,
                &question.prompt,
                &DialogueMeta {
                    npc_id: Some(progress.npc_id.clone()),
                    options: question.options.clone(),
                    note: None,
                },
            );
        }
    }

    fn quiz_for(&self, rt: &LevelRuntime, npc_id: &str) -> Option<&crate::dialogue::Quiz> {
        let template = rt
            .actors
            .query::<&NpcState>()
            .iter()
            .find(|(_, npc)| npc.id == npc_id)
            .map(|(_, npc)| npc.template_id.clone())?;
        self.content.npc_scripts.get(&template)?.quiz.as_ref()
    }

    /// Answer the open quiz question with option `choice`.
    pub fn answer_quiz(
        &self,
        rt: &mut LevelRuntime,
        choice: usize,
        hud: &mut dyn Hud,
    ) -> InteractionOutcome {
        let Some(progress) = rt.session.active_quiz.clone() else {
            return InteractionOutcome::Nothing;
        };
        let Some(quiz) = self.quiz_for(rt, &progress.npc_id).cloned() else {
            rt.session.active_quiz = None;
            return InteractionOutcome::Nothing;
        };
        let speaker = rt.session.active_speaker.clone();
        let meta = |note: Option<String>| DialogueMeta {
            npc_id: Some(progress.npc_id.clone()),
            options: Vec::new(),
            note,
        };

        match quiz.answer(progress.question, choice) {
            QuizStep::Next(question) => {
                let next = QuizProgress {
                    npc_id: progress.npc_id.clone(),
                    question,
                };
                rt.session.active_line = Some(format!("quiz:{question}"));
                rt.session.active_quiz = Some(next.clone());
                self.show_question(rt, &next, hud);
            }
            QuizStep::Failed => {
                rt.session.active_quiz = None;
                rt.session.active_line = Some("quiz:failed".into());
                hud.show_dialogue(&speaker, &quiz.fail_line, &meta(None));
            }
            QuizStep::Passed => {
                rt.session.active_quiz = None;
                rt.session.active_line = Some("quiz:passed".into());
                let outcome = match &quiz.reward {
                    Some(id) => self.claim_reward(rt, id),
                    None => succeeded(),
                };
                if !outcome.success {
                    self.show_blocked(&outcome, &speaker, hud);
                    return InteractionOutcome::Quiz {
                        npc_id: progress.npc_id,
                    };
                }
                if let Some(flag) = &quiz.completion_flag {
                    rt.persistent.set_flag(flag, true);
                }
                info!(npc = %progress.npc_id, "quiz_passed");
                let line = quiz.success_line.as_deref().unwrap_or("Correct!");
                hud.show_dialogue(&speaker, line, &meta(outcome.note));
                self.refresh_quests(rt, hud);
            }
        }
        InteractionOutcome::Quiz {
            npc_id: progress.npc_id,
        }
    }

    /// Keep the talking NPC frozen while the player stays close; close the
    /// dialogue and release the NPC once they part.
    pub fn update_dialogue(&self, rt: &mut LevelRuntime, dt: f32, hud: &mut dyn Hud) {
        let Some(npc_id) = rt.session.active_npc.clone() else {
            return;
        };
        rt.session.dialogue_time += dt;

        let (px, py) = (rt.player.x, rt.player.y);
        let mut in_range = false;
        for (_, npc) in rt.actors.query_mut::<&mut NpcState>() {
            if npc.id != npc_id {
                continue;
            }
            let distance = ((npc.x - px).powi(2) + (npc.y - py).powi(2)).sqrt();
            if !npc.defeated && distance <= self.radii.dialogue_close_radius {
                npc.hold(TALK_HOLD_SECS);
                in_range = true;
            } else {
                npc.release();
            }
        }

        if !in_range {
            debug!(npc = %npc_id, "dialogue_closed");
            rt.session.clear_transient();
            hud.hide_interaction();
        }
    }

    /// Fire pressure plates under the player. Each plate fires once.
    pub fn step_on_plates(&self, rt: &mut LevelRuntime, hud: &mut dyn Hud) -> usize {
        let tile = rt.level.world_to_tile(rt.player.x, rt.player.y);
        let mut fired = 0;
        for plate in &self.content.interactables.pressure_switches {
            if (plate.tx, plate.ty) != tile {
                continue;
            }
            let flag = plate.fired_flag();
            if rt.persistent.get_flag(&flag).is_some_and(FlagValue::is_truthy) {
                continue;
            }
            let outcome = self.actions.run_actions(
                &plate.actions,
                &mut rt.action_context(),
                RewardContext::default(),
            );
            if outcome.success {
                rt.persistent.set_flag(&flag, true);
                fired += 1;
                info!(plate = %plate.id, "pressure_switch_fired");
                if let Some(note) = outcome.note {
                    let (x, y) = rt.level.tile_center(plate.tx, plate.ty);
                    hud.show_world_prompt("pressure_switch", x, y, &params([("note", note)]));
                }
            } else {
                self.show_blocked(&outcome, "", hud);
            }
        }
        if fired > 0 {
            self.refresh_quests(rt, hud);
        }
        fired
    }

    fn show_blocked(&self, outcome: &ActionOutcome, speaker: &str, hud: &mut dyn Hud) {
        let line = outcome.blocked_dialogue.as_deref().unwrap_or("");
        hud.show_dialogue(
            speaker,
            line,
            &DialogueMeta {
                note: outcome.blocked_note.clone(),
                ..DialogueMeta::default()
            },
        );
    }

    fn store_npc(&self, rt: &mut LevelRuntime, entity: Entity, npc: NpcState) {
        if let Ok(mut slot) = rt.actors.get::<&mut NpcState>(entity) {
            *slot = npc;
        }
    }
}
