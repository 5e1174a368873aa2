// src/combat/src/lib.rs

//! Light real-time combat: NPC runtime state, wandering and projectiles.

pub mod combatant;
pub mod npc;
pub mod projectile;

pub use crate::combatant::{Combatant, boxes_overlap};
pub use crate::npc::{NpcPlacement, NpcState};
pub use crate::projectile::{Projectile, ProjectileEvent};

/// Combat tuning constants
pub mod constants {
    pub const NPC_SIZE: f32 = 24.0; // Collision box edge, world pixels
    pub const NPC_SPEED: f32 = 40.0; // Wander speed, pixels per second
    pub const WANDER_MIN_SECS: f32 = 0.8;
    pub const WANDER_MAX_SECS: f32 = 2.5;
    pub const PROJECTILE_SPEED: f32 = 260.0;
    pub const PROJECTILE_TTL: f32 = 1.5;
    pub const PROJECTILE_SIZE: f32 = 8.0;
    pub const PROJECTILE_DAMAGE: u32 = 1;
    pub const TALK_HOLD_SECS: f32 = 4.0; // How long an NPC stays put after being addressed
}
