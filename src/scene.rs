//! Scene graph: menu, prologue, loading, in-game and pause.
//!
//! Entering `Pause` pauses the active scene instead of exiting it, and
//! `resume` hands control back without re-entering. Every other transition
//! runs `on_exit` on the old scene, then `on_enter` on the new one.

use error::SceneError;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SceneKey {
    Menu,
    Prologue,
    Loading,
    InGame,
    Pause,
    Custom(String),
}

impl fmt::Display for SceneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneKey::Menu => f.write_str("menu"),
            SceneKey::Prologue => f.write_str("prologue"),
            SceneKey::Loading => f.write_str("loading"),
            SceneKey::InGame => f.write_str("inGame"),
            SceneKey::Pause => f.write_str("pause"),
            SceneKey::Custom(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    SwitchTo(SceneKey),
    Pause,
    Resume,
}

/// A scene over a shared context `C`. Hooks default to doing nothing.
pub trait Scene<C> {
    fn on_enter(&mut self, _ctx: &mut C, _from: Option<&SceneKey>) -> Result<(), SceneError> {
        Ok(())
    }

    fn on_exit(&mut self, _ctx: &mut C, _to: &SceneKey) -> Result<(), SceneError> {
        Ok(())
    }

    fn on_pause(&mut self, _ctx: &mut C) -> Result<(), SceneError> {
        Ok(())
    }

    fn on_resume(&mut self, _ctx: &mut C) -> Result<(), SceneError> {
        Ok(())
    }

    fn update(&mut self, ctx: &mut C, dt: f32) -> SceneCommand;
}

pub struct SceneManager<C> {
    scenes: HashMap<SceneKey, Box<dyn Scene<C>>>,
    active: Option<SceneKey>,
    paused: Option<SceneKey>,
}

impl<C> Default for SceneManager<C> {
    fn default() -> Self {
        Self {
            scenes: HashMap::new(),
            active: None,
            paused: None,
        }
    }
}

impl<C> fmt::Debug for SceneManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneManager")
            .field("scenes", &self.scenes.keys().collect::<Vec<_>>())
            .field("active", &self.active)
            .field("paused", &self.paused)
            .finish()
    }
}

impl<C> SceneManager<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: SceneKey, scene: impl Scene<C> + 'static) {
        self.scenes.insert(key, Box::new(scene));
    }

    pub fn is_registered(&self, key: &SceneKey) -> bool {
        self.scenes.contains_key(key)
    }

    pub fn active(&self) -> Option<&SceneKey> {
        self.active.as_ref()
    }

    pub fn paused(&self) -> Option<&SceneKey> {
        self.paused.as_ref()
    }

    fn scene_mut(&mut self, key: &SceneKey) -> Result<&mut Box<dyn Scene<C>>, SceneError> {
        self.scenes
            .get_mut(key)
            .ok_or_else(|| SceneError::UnknownScene(key.to_string()))
    }

    /// Enter the first scene.
    pub fn start(&mut self, ctx: &mut C, key: SceneKey) -> Result<(), SceneError> {
        self.scene_mut(&key)?.on_enter(ctx, None)?;
        debug!(scene = %key, "scene_started");
        self.active = Some(key);
        self.paused = None;
        Ok(())
    }

    /// Transition to `key`. Returns `Ok(false)` when `key` is already active.
    pub fn set_scene(&mut self, ctx: &mut C, key: SceneKey) -> Result<bool, SceneError> {
        if !self.is_registered(&key) {
            return Err(SceneError::UnknownScene(key.to_string()));
        }
        let Some(from) = self.active.clone() else {
            self.start(ctx, key)?;
            return Ok(true);
        };
        if from == key {
            return Ok(false);
        }
        if key == SceneKey::Pause {
            return self.pause(ctx);
        }
        if self.paused.as_ref() == Some(&key) {
            self.resume(ctx)?;
            return Ok(true);
        }

        self.scene_mut(&from)?.on_exit(ctx, &key)?;
        // Leaving pause for anything but the paused scene abandons it
        if let Some(abandoned) = self.paused.take() {
            if let Err(err) = self.scene_mut(&abandoned)?.on_exit(ctx, &key) {
                warn!(scene = %abandoned, %err, "paused_scene_exit_failed");
            }
        }
        self.scene_mut(&key)?.on_enter(ctx, Some(&from))?;
        debug!(from = %from, to = %key, "scene_switched");
        self.active = Some(key);
        Ok(true)
    }

    /// Pause the active scene and enter `Pause`. No-op while already paused.
    pub fn pause(&mut self, ctx: &mut C) -> Result<bool, SceneError> {
        let Some(from) = self.active.clone() else {
            return Ok(false);
        };
        if from == SceneKey::Pause {
            return Ok(false);
        }
        if !self.is_registered(&SceneKey::Pause) {
            return Err(SceneError::UnknownScene(SceneKey::Pause.to_string()));
        }
        self.scene_mut(&from)?.on_pause(ctx)?;
        self.scene_mut(&SceneKey::Pause)?.on_enter(ctx, Some(&from))?;
        debug!(scene = %from, "scene_paused");
        self.paused = Some(from);
        self.active = Some(SceneKey::Pause);
        Ok(true)
    }

    /// Leave `Pause` and resume the paused scene without re-entering it.
    pub fn resume(&mut self, ctx: &mut C) -> Result<(), SceneError> {
        let Some(paused) = self.paused.clone() else {
            return Err(SceneError::NotPaused);
        };
        if let Some(active) = self.active.clone() {
            self.scene_mut(&active)?.on_exit(ctx, &paused)?;
        }
        self.scene_mut(&paused)?.on_resume(ctx)?;
        debug!(scene = %paused, "scene_resumed");
        self.paused = None;
        self.active = Some(paused);
        Ok(())
    }

    /// Update the active scene and apply the command it returns.
    pub fn update(&mut self, ctx: &mut C, dt: f32) -> Result<(), SceneError> {
        let Some(active) = self.active.clone() else {
            return Ok(());
        };
        let command = self.scene_mut(&active)?.update(ctx, dt);
        match command {
            SceneCommand::None => Ok(()),
            SceneCommand::SwitchTo(key) => self.set_scene(ctx, key).map(|_| ()),
            SceneCommand::Pause => self.pause(ctx).map(|_| ()),
            SceneCommand::Resume => self.resume(ctx),
        }
    }
}
