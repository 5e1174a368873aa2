//! Runtime NPC state.
//!
//! NPCs are created from level placements at bootstrap. Health and the
//! defeated flag persist across saves; wandering state does not.

use hero::Facing;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use world::LevelInstance;

use crate::combatant::Combatant;
use crate::constants;

/// Level content describing one NPC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcPlacement {
    pub id: String,
    /// Script / sprite template, defaults to `id`
    #[serde(default)]
    pub template: Option<String>,
    pub name: String,
    pub tx: i32,
    pub ty: i32,
    #[serde(default = "default_health")]
    pub health: u32,
    #[serde(default)]
    pub lethal: bool,
    #[serde(default)]
    pub contact_damage: u32,
    /// Integer flag incremented when this NPC is defeated
    #[serde(default)]
    pub defeat_flag: Option<String>,
    #[serde(default)]
    pub facing: Facing,
    #[serde(default = "default_wanders")]
    pub wanders: bool,
}

fn default_health() -> u32 {
    3
}

fn default_wanders() -> bool {
    true
}

impl NpcPlacement {
    pub fn template_id(&self) -> &str {
        self.template.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Wander {
    dx: f32,
    dy: f32,
    timer: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcState {
    pub id: String,
    pub template_id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub facing: Facing,
    pub health: u32,
    pub max_health: u32,
    #[serde(default)]
    pub defeated: bool,
    #[serde(default)]
    pub lethal: bool,
    #[serde(default)]
    pub contact_damage: u32,
    #[serde(default)]
    pub defeat_flag: Option<String>,
    #[serde(default)]
    pub has_spoken: bool,
    #[serde(default)]
    pub busy_timer: f32,
    #[serde(default)]
    pub wanders: bool,
    #[serde(skip)]
    wander: Wander,
}

impl NpcState {
    pub fn from_placement(placement: &NpcPlacement, level: &LevelInstance) -> Self {
        let (x, y) = level.tile_center(placement.tx, placement.ty);
        let max_health = placement.health.max(1);
        Self {
            id: placement.id.clone(),
            template_id: placement.template_id().to_string(),
            name: placement.name.clone(),
            x,
            y,
            facing: placement.facing,
            health: max_health,
            max_health,
            defeated: false,
            lethal: placement.lethal,
            contact_damage: placement.contact_damage,
            defeat_flag: placement.defeat_flag.clone(),
            has_spoken: false,
            busy_timer: 0.0,
            wanders: placement.wanders,
            wander: Wander::default(),
        }
    }

    /// Re-establish invariants on state read back from a save:
    /// health within bounds, and a defeated NPC is never lethal.
    pub fn enforce_invariants(&mut self) {
        self.max_health = self.max_health.max(1);
        self.health = self.health.min(self.max_health);
        if self.health == 0 {
            self.defeated = true;
        }
        if self.defeated {
            self.health = 0;
            self.lethal = false;
        }
        if !self.busy_timer.is_finite() || self.busy_timer < 0.0 {
            self.busy_timer = 0.0;
        }
    }

    /// Freeze the NPC (e.g. while talking)
    pub fn hold(&mut self, seconds: f32) {
        self.busy_timer = self.busy_timer.max(seconds);
        self.wander = Wander::default();
    }

    /// Hand movement back to the NPC
    pub fn release(&mut self) {
        self.busy_timer = 0.0;
    }

    pub fn is_busy(&self) -> bool {
        self.busy_timer > 0.0
    }

    /// Advance idle behaviour by `dt` seconds.
    pub fn update<R: Rng>(&mut self, dt: f32, rng: &mut R, level: &LevelInstance) {
        if self.defeated {
            return;
        }
        if self.busy_timer > 0.0 {
            self.busy_timer = (self.busy_timer - dt).max(0.0);
            return;
        }
        if !self.wanders {
            return;
        }

        self.wander.timer -= dt;
        if self.wander.timer <= 0.0 {
            self.pick_wander(rng);
        }
        if self.wander.dx == 0.0 && self.wander.dy == 0.0 {
            return;
        }

        let next_x = self.x + self.wander.dx * constants::NPC_SPEED * dt;
        let next_y = self.y + self.wander.dy * constants::NPC_SPEED * dt;
        if level.can_move(constants::NPC_SIZE, next_x, next_y) {
            self.x = next_x;
            self.y = next_y;
        } else {
            self.wander = Wander {
                timer: self.wander.timer,
                ..Wander::default()
            };
        }
    }

    fn pick_wander<R: Rng>(&mut self, rng: &mut R) {
        let timer = rng.random_range(constants::WANDER_MIN_SECS..constants::WANDER_MAX_SECS);
        let facing = match rng.random_range(0..6) {
            0 => Some(Facing::Up),
            1 => Some(Facing::Down),
            2 => Some(Facing::Left),
            3 => Some(Facing::Right),
            _ => None,
        };
        self.wander = match facing {
            Some(facing) => {
                self.facing = facing;
                let (dx, dy) = facing.vector();
                Wander { dx, dy, timer }
            }
            None => Wander {
                timer,
                ..Wander::default()
            },
        };
    }
}

impl Combatant for NpcState {
    fn hp(&self) -> u32 {
        self.health
    }

    fn max_hp(&self) -> u32 {
        self.max_health
    }

    fn is_alive(&self) -> bool {
        !self.defeated
    }

    fn take_damage(&mut self, amount: u32) -> bool {
        if self.defeated || amount == 0 {
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            debug!(npc = %self.id, was_lethal = self.lethal, "npc_defeated");
            self.defeated = true;
            self.lethal = false;
            self.busy_timer = 0.0;
            return true;
        }
        debug!(npc = %self.id, health = self.health, "npc_damaged");
        false
    }

    fn heal(&mut self, amount: u32) {
        if !self.defeated {
            self.health = self.health.saturating_add(amount).min(self.max_health);
        }
    }
}
