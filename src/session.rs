//! One level's live runtime and the per-frame update that drives it.

use combat::constants::{NPC_SIZE, PROJECTILE_SIZE};
use combat::{Combatant, NpcState, Projectile, ProjectileEvent, boxes_overlap};
use error::LevelError;
use hecs::{Entity, World};
use hero::{Inventory, PlayerState, PlayerVitals};
use quests::{PersistentState, QuestEngine, QuestRegistry};
use rand::SeedableRng;
use rand::rngs::StdRng;
use save::{LevelSnapshot, PickupData, SafeData, SessionStateData};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use world::{LevelInstance, TileRegistry};

use crate::actions::{ActionContext, ActionRegistry};
use crate::config::{GameConfig, PlayerConfig};
use crate::content::LevelConfig;
use crate::hud::{Hud, PromptParams};
use crate::interaction::{InteractionOutcome, InteractionSystem};

/// Registries built once at startup and shared by every session
#[derive(Debug, Clone)]
pub struct Registries {
    pub tiles: Arc<TileRegistry>,
    pub actions: Arc<ActionRegistry>,
    pub quests: Arc<QuestRegistry>,
}

impl Registries {
    /// Built-in tiles plus the default action handlers and quest evaluators
    pub fn init() -> Self {
        Self {
            tiles: Arc::new(TileRegistry::builtin()),
            actions: Arc::new(ActionRegistry::with_defaults()),
            quests: Arc::new(QuestRegistry::with_defaults()),
        }
    }
}

/// World position of a static interactable (safes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
}

/// Mutable state of the level being played
pub struct LevelRuntime {
    pub level: LevelInstance,
    pub player: PlayerState,
    pub vitals: PlayerVitals,
    pub inventory: Inventory,
    /// NPC, pickup, safe and projectile entities
    pub actors: World,
    pub persistent: PersistentState,
    pub session: SessionStateData,
    pub objectives_collected: u32,
}

impl LevelRuntime {
    pub fn action_context(&mut self) -> ActionContext<'_> {
        ActionContext {
            inventory: &mut self.inventory,
            level: &mut self.level,
            persistent: &mut self.persistent,
            session: &mut self.session,
            objectives_collected: &mut self.objectives_collected,
        }
    }

    pub fn npc_entity(&self, id: &str) -> Option<Entity> {
        self.actors
            .query::<&NpcState>()
            .iter()
            .find(|(_, npc)| npc.id == id)
            .map(|(entity, _)| entity)
    }

    /// NPC states ordered by id
    pub fn npcs(&self) -> Vec<NpcState> {
        let mut npcs: Vec<NpcState> = self
            .actors
            .query::<&NpcState>()
            .iter()
            .map(|(_, npc)| npc.clone())
            .collect();
        npcs.sort_by(|a, b| a.id.cmp(&b.id));
        npcs
    }

    pub fn pickups(&self) -> Vec<PickupData> {
        let mut pickups: Vec<PickupData> = self
            .actors
            .query::<&PickupData>()
            .iter()
            .map(|(_, p)| p.clone())
            .collect();
        pickups.sort_by(|a, b| a.id.cmp(&b.id));
        pickups
    }

    pub fn safes(&self) -> Vec<SafeData> {
        let mut safes: Vec<SafeData> = self
            .actors
            .query::<&SafeData>()
            .iter()
            .map(|(_, s)| s.clone())
            .collect();
        safes.sort_by(|a, b| a.id.cmp(&b.id));
        safes
    }

    pub fn projectiles(&self) -> Vec<Projectile> {
        self.actors
            .query::<&Projectile>()
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }
}

/// Input sampled for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    pub move_x: f32,
    pub move_y: f32,
    pub interact: bool,
    pub attack: bool,
    /// Quiz option picked this frame
    pub answer: Option<usize>,
    pub pause: bool,
    pub confirm: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    None,
    LevelComplete,
    PlayerDefeated,
}

pub struct GameSession {
    content: Arc<LevelConfig>,
    player_config: PlayerConfig,
    runtime: LevelRuntime,
    interaction: InteractionSystem,
    rng: StdRng,
}

impl GameSession {
    /// Build a fresh session for `content`. Fails when the level geometry is
    /// malformed.
    pub fn bootstrap(
        content: Arc<LevelConfig>,
        registries: &Registries,
        config: &GameConfig,
    ) -> Result<Self, LevelError> {
        let level = LevelInstance::new(content.blueprint(), registries.tiles.clone(), config.tile_size)?;
        let start = content.actors.player_start;
        let (x, y) = level.tile_center(start.tx, start.ty);
        let player = PlayerState::new(x, y, config.player.speed, config.player.size);

        let session = SessionStateData {
            area: content.meta.name.clone(),
            subtitle: content.meta.subtitle.clone(),
            level_number: content.meta.level_number,
            ..SessionStateData::default()
        };

        let quests = QuestEngine::new(registries.quests.clone(), content.quests.clone());
        let interaction = InteractionSystem::new(
            content.clone(),
            registries.actions.clone(),
            quests,
            config.interaction.clone(),
        );
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut runtime = LevelRuntime {
            level,
            player,
            vitals: PlayerVitals::new(config.player.max_health),
            inventory: Inventory::new(config.player.inventory_capacity),
            actors: World::new(),
            persistent: PersistentState::default(),
            session,
            objectives_collected: 0,
        };
        spawn_actors(&mut runtime, &content, None);
        info!(level = %content.id(), "session_bootstrapped");

        Ok(Self {
            content,
            player_config: config.player.clone(),
            runtime,
            interaction,
            rng,
        })
    }

    pub fn content(&self) -> &LevelConfig {
        &self.content
    }

    pub fn level_id(&self) -> &str {
        self.content.id()
    }

    pub fn runtime(&self) -> &LevelRuntime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut LevelRuntime {
        &mut self.runtime
    }

    pub fn interaction(&self) -> &InteractionSystem {
        &self.interaction
    }

    /// Carry inventory, health and flags over from the previous level.
    pub fn inherit(&mut self, previous: &LevelRuntime) {
        self.runtime.inventory = previous.inventory.clone();
        self.runtime.vitals = previous.vitals.clone();
        self.runtime.vitals.invulnerable_for = 0.0;
        self.runtime.persistent = previous.persistent.clone();
    }

    /// Push the full HUD state, e.g. after entering or loading a level.
    pub fn sync_hud(&mut self, hud: &mut dyn Hud) {
        let rt = &mut self.runtime;
        hud.set_health(rt.vitals.health, rt.vitals.max_health);
        hud.set_objectives(rt.objectives_collected, self.content.objective_total());
        self.interaction.refresh_quests(rt, hud);
    }

    /// Advance one frame.
    pub fn update(&mut self, dt: f32, input: &FrameInput, hud: &mut dyn Hud) -> SessionEvent {
        if self.runtime.vitals.is_dead() {
            return SessionEvent::PlayerDefeated;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.runtime.vitals.tick(dt);

        self.move_player(dt, input);
        if input.attack {
            self.fire(hud);
        }
        self.update_npcs(dt);
        self.update_projectiles(dt, hud);
        if self.contact_damage(hud) {
            info!(level = %self.level_id(), "player_defeated");
            return SessionEvent::PlayerDefeated;
        }

        let rt = &mut self.runtime;
        self.interaction.step_on_plates(rt, hud);
        self.interaction.update_dialogue(rt, dt, hud);

        if let Some(choice) = input.answer {
            if rt.session.active_quiz.is_some() {
                self.interaction.answer_quiz(rt, choice, hud);
                return SessionEvent::None;
            }
        }
        if input.interact
            && self.interaction.interact(rt, hud) == InteractionOutcome::LevelAdvance
        {
            return SessionEvent::LevelComplete;
        }
        SessionEvent::None
    }

    fn move_player(&mut self, dt: f32, input: &FrameInput) {
        let LevelRuntime { player, level, .. } = &mut self.runtime;
        let (dx, dy) = (input.move_x, input.move_y);
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        player.step(dx, dy, dt, |size, x, y| level.can_move(size, x, y));
    }

    fn fire(&mut self, hud: &mut dyn Hud) {
        let rt = &mut self.runtime;
        let ammo = &self.player_config.ammo_kind;
        if !rt.inventory.spend_ammo(ammo) {
            let params: PromptParams = [("ammo".to_string(), ammo.clone())].into();
            hud.show_world_prompt("no_ammo", rt.player.x, rt.player.y, &params);
            return;
        }
        let projectile = Projectile::fire(
            rt.player.x,
            rt.player.y,
            rt.player.facing.vector(),
            self.player_config.projectile_damage,
            ammo,
        );
        rt.actors.spawn((projectile,));
        debug!(ammo = %ammo, left = rt.inventory.ammo(ammo), "projectile_fired");
    }

    fn update_npcs(&mut self, dt: f32) {
        let LevelRuntime {
            level,
            actors,
            session,
            ..
        } = &mut self.runtime;
        for (_, npc) in actors.query_mut::<&mut NpcState>() {
            if session.active_npc.as_deref() == Some(npc.id.as_str()) {
                npc.hold(combat::constants::TALK_HOLD_SECS);
            }
            npc.update(dt, &mut self.rng, level);
        }
    }

    fn update_projectiles(&mut self, dt: f32, hud: &mut dyn Hud) {
        let rt = &mut self.runtime;
        let mut spent = Vec::new();
        let mut flying = Vec::new();
        for (entity, projectile) in rt.actors.query_mut::<&mut Projectile>() {
            match projectile.step(dt, &mut rt.level) {
                ProjectileEvent::Flying => {
                    flying.push((entity, projectile.x, projectile.y, projectile.damage))
                }
                _ => spent.push(entity),
            }
        }

        let mut defeated = 0;
        for (entity, x, y, damage) in flying {
            let target = rt
                .actors
                .query_mut::<&mut NpcState>()
                .into_iter()
                .find(|(_, npc)| !npc.defeated && boxes_overlap(x, y, PROJECTILE_SIZE, npc.x, npc.y, NPC_SIZE));
            let Some((_, npc)) = target else {
                continue;
            };
            spent.push(entity);
            if npc.take_damage(damage) {
                info!(npc = %npc.id, "npc_defeated");
                if let Some(flag) = npc.defeat_flag.clone() {
                    rt.persistent.flags.increment(&flag, 1);
                }
                if rt.session.active_npc.as_deref() == Some(npc.id.as_str()) {
                    rt.session.clear_transient();
                    hud.hide_interaction();
                }
                defeated += 1;
            }
        }

        for entity in spent {
            // Entities come from the queries above
            let _ = rt.actors.despawn(entity);
        }
        if defeated > 0 {
            self.interaction.refresh_quests(rt, hud);
        }
    }

    /// Returns whether the player died.
    fn contact_damage(&mut self, hud: &mut dyn Hud) -> bool {
        let rt = &mut self.runtime;
        let player = &rt.player;
        let hit = rt
            .actors
            .query::<&NpcState>()
            .iter()
            .filter(|(_, npc)| npc.lethal && !npc.defeated && npc.contact_damage > 0)
            .find(|(_, npc)| boxes_overlap(player.x, player.y, player.size, npc.x, npc.y, NPC_SIZE))
            .map(|(_, npc)| npc.contact_damage);
        if let Some(damage) = hit {
            if rt.vitals.apply_damage(damage) > 0 {
                hud.set_health(rt.vitals.health, rt.vitals.max_health);
            }
        }
        rt.vitals.is_dead()
    }

    pub fn snapshot(&self) -> LevelSnapshot {
        let rt = &self.runtime;
        LevelSnapshot {
            objectives_collected: rt.objectives_collected,
            inventory: rt.inventory.clone(),
            level_state: rt.level.serialize_state(),
            player_state: rt.player.clone(),
            player_vitals: rt.vitals.clone(),
            projectiles: rt.projectiles(),
            pickups: rt.pickups(),
            npcs: rt.npcs(),
            safes: rt.safes(),
            session_state: rt.session.clone(),
            persistent_state: rt.persistent.clone(),
            saved_at: 0,
        }
    }

    /// Replace the runtime with a saved snapshot of this level.
    pub fn restore(&mut self, snapshot: &LevelSnapshot) {
        let rt = &mut self.runtime;
        rt.level.restore_state(&snapshot.level_state);

        let mut player = snapshot.player_state.clone().sanitized();
        if !rt.level.can_move(player.size, player.x, player.y) {
            let start = self.content.actors.player_start;
            let (x, y) = rt.level.tile_center(start.tx, start.ty);
            warn!(level = %self.content.id(), x = player.x, y = player.y, "saved_position_blocked");
            player.x = x;
            player.y = y;
        }
        rt.player = player;
        rt.vitals = snapshot.player_vitals.clone().sanitized();
        rt.inventory = snapshot.inventory.clone();
        rt.persistent = snapshot.persistent_state.clone();
        rt.session = snapshot.session_state.clone();
        rt.session.clear_transient();
        rt.objectives_collected = snapshot.objectives_collected;

        rt.actors.clear();
        spawn_actors(rt, &self.content, Some(snapshot));
        info!(level = %self.content.id(), "session_restored");
    }
}

/// Populate the actor world from content, overlaid with saved state when
/// restoring.
fn spawn_actors(rt: &mut LevelRuntime, content: &LevelConfig, saved: Option<&LevelSnapshot>) {
    let saved_npcs: BTreeMap<&str, &NpcState> = saved
        .map(|s| s.npcs.iter().map(|n| (n.id.as_str(), n)).collect())
        .unwrap_or_default();
    for placement in &content.actors.npcs {
        let npc = match saved_npcs.get(placement.id.as_str()) {
            Some(npc) => {
                let mut npc = (*npc).clone();
                npc.enforce_invariants();
                npc
            }
            None => NpcState::from_placement(placement, &rt.level),
        };
        rt.actors.spawn((npc,));
    }
    if let Some(snapshot) = saved {
        for npc in &snapshot.npcs {
            if !content.actors.npcs.iter().any(|p| p.id == npc.id) {
                warn!(npc = %npc.id, "saved_npc_unknown");
            }
        }
    }

    match saved {
        Some(snapshot) => {
            for pickup in &snapshot.pickups {
                rt.actors.spawn((pickup.clone(),));
            }
            for projectile in &snapshot.projectiles {
                rt.actors.spawn((projectile.clone(),));
            }
        }
        None => {
            for pickup in &content.pickups {
                let (x, y) = rt.level.tile_center(pickup.tx, pickup.ty);
                rt.actors.spawn((PickupData {
                    id: pickup.id.clone(),
                    item: pickup.item.clone(),
                    amount: pickup.amount,
                    x,
                    y,
                    objective: pickup.objective,
                    store_in_inventory: pickup.store_in_inventory,
                },));
            }
        }
    }

    for safe in &content.interactables.safes {
        let opened = saved
            .and_then(|s| s.safes.iter().find(|d| d.id == safe.id))
            .is_some_and(|d| d.opened);
        let (x, y) = rt.level.tile_center(safe.tx, safe.ty);
        rt.actors.spawn((
            SafeData {
                id: safe.id.clone(),
                opened,
            },
            WorldPos { x, y },
        ));
    }
}
