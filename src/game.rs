//! Game orchestration: scenes over a shared context, level loading and
//! advancement, and autosaves.

use anyhow::Result;
use error::{GameError, SceneError, handle_error};
use save::{SaveGameStore, SaveStorage};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::GameConfig;
use crate::content::LevelLibrary;
use crate::hud::{DialogueMeta, Hud, PromptParams};
use crate::scene::{Scene, SceneCommand, SceneKey, SceneManager};
use crate::session::{FrameInput, GameSession, Registries, SessionEvent};

/// Level the loading scene should bring up next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub level_id: String,
    /// Keep inventory, health and flags from the level being left
    pub carry_over: bool,
}

/// Everything the scenes share
pub struct GameContext {
    pub config: GameConfig,
    pub registries: Registries,
    pub library: LevelLibrary,
    pub saves: SaveGameStore,
    pub session: Option<GameSession>,
    pub hud: Box<dyn Hud>,
    pub slot: String,
    pub pending: Option<LoadRequest>,
    /// Input for the current tick
    pub input: FrameInput,
    /// Set once the last level has been completed
    pub finished: bool,
}

impl GameContext {
    /// Persist the live level into the active slot.
    pub fn save_current(&mut self) -> Result<()> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        self.saves
            .save_level(&self.slot, session.level_id(), session.snapshot())
    }

    fn autosave(&mut self) {
        if let Err(err) = self.save_current() {
            warn!(slot = %self.slot, error = %err, "autosave_failed");
        }
    }

    /// Level a new or continued game starts on
    fn resume_level(&mut self) -> Option<String> {
        let slot = self.slot.clone();
        if let Some(id) = self
            .saves
            .payload(&slot)
            .and_then(|payload| payload.current_level_id.clone())
        {
            if self.library.get(&id).is_some() {
                return Some(id);
            }
            warn!(slot = %slot, level = %id, "saved_level_missing");
        }
        self.config
            .start_level
            .clone()
            .filter(|id| self.library.get(id).is_some())
            .or_else(|| self.library.first().map(|l| l.id().to_string()))
    }

    /// Tear down the live session and bring up `request.level_id`. A level
    /// instance is never reused across levels.
    pub fn enter_level(&mut self, request: &LoadRequest) -> Result<(), GameError> {
        let content = self
            .library
            .get(&request.level_id)
            .cloned()
            .ok_or_else(|| GameError::UnknownLevel(request.level_id.clone()))?;
        let mut session = GameSession::bootstrap(Arc::new(content), &self.registries, &self.config)?;
        let previous = self.session.take();

        let saved = self
            .saves
            .level_snapshot(&self.slot, &request.level_id)
            .cloned();
        match (saved, previous) {
            (Some(snapshot), _) => session.restore(&snapshot),
            (None, Some(previous)) if request.carry_over => session.inherit(previous.runtime()),
            _ => {}
        }
        session.sync_hud(self.hud.as_mut());
        self.session = Some(session);
        info!(level = %request.level_id, slot = %self.slot, "level_entered");
        self.autosave();
        Ok(())
    }

    fn show_notices(&mut self) {
        for notice in self.saves.take_notices() {
            warn!(slot = %notice.slot, reason = %notice.reason, "slot_reset_notice");
            let params: PromptParams = [
                ("slot".to_string(), notice.slot),
                ("reason".to_string(), notice.reason),
            ]
            .into();
            self.hud.show_world_prompt("slot_reset", 0.0, 0.0, &params);
        }
    }
}

/// Title menu. Confirm starts or continues the active slot.
#[derive(Debug, Default)]
pub struct MenuScene;

impl Scene<GameContext> for MenuScene {
    fn on_enter(&mut self, ctx: &mut GameContext, _from: Option<&SceneKey>) -> Result<(), SceneError> {
        ctx.hud.hide_interaction();
        ctx.session = None;
        ctx.show_notices();
        Ok(())
    }

    fn update(&mut self, ctx: &mut GameContext, _dt: f32) -> SceneCommand {
        if !ctx.input.confirm {
            return SceneCommand::None;
        }
        let slot = ctx.slot.clone();
        let fresh = ctx.saves.load_slot(&slot).is_none();
        ctx.show_notices();
        let Some(level_id) = ctx.resume_level() else {
            warn!("no_levels_available");
            return SceneCommand::None;
        };
        ctx.finished = false;
        ctx.pending = Some(LoadRequest {
            level_id,
            carry_over: false,
        });
        if fresh {
            SceneCommand::SwitchTo(SceneKey::Prologue)
        } else {
            SceneCommand::SwitchTo(SceneKey::Loading)
        }
    }
}

/// Intro card shown before a new game; waits for confirm.
#[derive(Debug, Default)]
pub struct PrologueScene;

impl Scene<GameContext> for PrologueScene {
    fn on_enter(&mut self, ctx: &mut GameContext, _from: Option<&SceneKey>) -> Result<(), SceneError> {
        let title = ctx
            .pending
            .as_ref()
            .and_then(|p| ctx.library.get(&p.level_id))
            .map(|l| l.meta.title.clone().unwrap_or_else(|| l.meta.name.clone()))
            .unwrap_or_default();
        ctx.hud.show_dialogue("", &title, &DialogueMeta::default());
        Ok(())
    }

    fn on_exit(&mut self, ctx: &mut GameContext, _to: &SceneKey) -> Result<(), SceneError> {
        ctx.hud.hide_interaction();
        Ok(())
    }

    fn update(&mut self, ctx: &mut GameContext, _dt: f32) -> SceneCommand {
        if ctx.input.confirm {
            SceneCommand::SwitchTo(SceneKey::Loading)
        } else {
            SceneCommand::None
        }
    }
}

/// Builds the pending level on entry, then hands over to the game.
#[derive(Debug, Default)]
pub struct LoadingScene;

impl Scene<GameContext> for LoadingScene {
    fn on_enter(&mut self, ctx: &mut GameContext, _from: Option<&SceneKey>) -> Result<(), SceneError> {
        let Some(request) = ctx.pending.take() else {
            return Err(SceneError::hook("loading", "enter", "no level requested"));
        };
        ctx.enter_level(&request)
            .map_err(|err| SceneError::hook("loading", "enter", handle_error(&err)))
    }

    fn update(&mut self, _ctx: &mut GameContext, _dt: f32) -> SceneCommand {
        SceneCommand::SwitchTo(SceneKey::InGame)
    }
}

/// Runs the live session.
#[derive(Debug, Default)]
pub struct InGameScene;

impl Scene<GameContext> for InGameScene {
    fn on_exit(&mut self, ctx: &mut GameContext, _to: &SceneKey) -> Result<(), SceneError> {
        ctx.autosave();
        Ok(())
    }

    fn on_pause(&mut self, ctx: &mut GameContext) -> Result<(), SceneError> {
        ctx.autosave();
        Ok(())
    }

    fn update(&mut self, ctx: &mut GameContext, dt: f32) -> SceneCommand {
        if ctx.input.pause {
            return SceneCommand::Pause;
        }
        let input = ctx.input;
        let GameContext { session, hud, .. } = ctx;
        let Some(session) = session.as_mut() else {
            return SceneCommand::SwitchTo(SceneKey::Menu);
        };
        let current = session.level_id().to_string();

        match session.update(dt, &input, hud.as_mut()) {
            SessionEvent::None => SceneCommand::None,
            SessionEvent::PlayerDefeated => {
                ctx.pending = Some(LoadRequest {
                    level_id: current,
                    carry_over: false,
                });
                ctx.session = None;
                SceneCommand::SwitchTo(SceneKey::Loading)
            }
            SessionEvent::LevelComplete => {
                ctx.autosave();
                match ctx.library.next_after(&current) {
                    Some(next) => {
                        info!(from = %current, to = %next.id(), "level_advance");
                        ctx.pending = Some(LoadRequest {
                            level_id: next.id().to_string(),
                            carry_over: true,
                        });
                        SceneCommand::SwitchTo(SceneKey::Loading)
                    }
                    None => {
                        info!(level = %current, "game_finished");
                        ctx.finished = true;
                        SceneCommand::SwitchTo(SceneKey::Menu)
                    }
                }
            }
        }
    }
}

/// Pause overlay. Pause or confirm resumes.
#[derive(Debug, Default)]
pub struct PauseScene;

impl Scene<GameContext> for PauseScene {
    fn update(&mut self, ctx: &mut GameContext, _dt: f32) -> SceneCommand {
        if ctx.input.pause || ctx.input.confirm {
            SceneCommand::Resume
        } else {
            SceneCommand::None
        }
    }
}

pub struct Game {
    scenes: SceneManager<GameContext>,
    ctx: GameContext,
}

impl Game {
    pub fn new(
        config: GameConfig,
        library: LevelLibrary,
        storage: impl SaveStorage + 'static,
        hud: impl Hud + 'static,
    ) -> Self {
        let slot = config
            .save
            .slot_ids()
            .into_iter()
            .next()
            .unwrap_or_else(|| "1".to_string());
        let ctx = GameContext {
            config,
            registries: Registries::init(),
            library,
            saves: SaveGameStore::new(storage),
            session: None,
            hud: Box::new(hud),
            slot,
            pending: None,
            input: FrameInput::default(),
            finished: false,
        };

        let mut scenes = SceneManager::new();
        scenes.register(SceneKey::Menu, MenuScene);
        scenes.register(SceneKey::Prologue, PrologueScene);
        scenes.register(SceneKey::Loading, LoadingScene);
        scenes.register(SceneKey::InGame, InGameScene);
        scenes.register(SceneKey::Pause, PauseScene);
        Self { scenes, ctx }
    }

    /// Enter the menu.
    pub fn start(&mut self) -> Result<(), SceneError> {
        self.scenes.start(&mut self.ctx, SceneKey::Menu)
    }

    pub fn select_slot(&mut self, slot: &str) {
        self.ctx.slot = slot.to_string();
    }

    /// Run one frame with `input`.
    pub fn tick(&mut self, dt: f32, input: FrameInput) -> Result<(), SceneError> {
        self.ctx.input = input;
        let result = self.scenes.update(&mut self.ctx, dt);
        self.ctx.input = FrameInput::default();
        result
    }

    pub fn save(&mut self) -> Result<()> {
        self.ctx.save_current()
    }

    pub fn scene(&self) -> Option<&SceneKey> {
        self.scenes.active()
    }

    pub fn context(&self) -> &GameContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut GameContext {
        &mut self.ctx
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.ctx.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut GameSession> {
        self.ctx.session.as_mut()
    }

    pub fn is_finished(&self) -> bool {
        self.ctx.finished
    }
}
