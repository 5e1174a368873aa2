//! Player-fired projectiles.

use serde::{Deserialize, Serialize};
use world::LevelInstance;

use crate::combatant::boxes_overlap;
use crate::constants;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileEvent {
    /// Still in flight
    Flying,
    /// Time to live ran out
    Expired,
    /// Stopped by a solid tile; `damaged` when that tile was destructible
    HitTile { damaged: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projectile {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub ttl: f32,
    pub damage: u32,
    #[serde(default)]
    pub ammo: String,
}

impl Projectile {
    pub fn fire(x: f32, y: f32, direction: (f32, f32), damage: u32, ammo: &str) -> Self {
        Self {
            x,
            y,
            vx: direction.0 * constants::PROJECTILE_SPEED,
            vy: direction.1 * constants::PROJECTILE_SPEED,
            ttl: constants::PROJECTILE_TTL,
            damage,
            ammo: ammo.to_string(),
        }
    }

    /// Advance one frame against the level geometry.
    pub fn step(&mut self, dt: f32, level: &mut LevelInstance) -> ProjectileEvent {
        self.ttl -= dt;
        if self.ttl <= 0.0 {
            return ProjectileEvent::Expired;
        }

        let next_x = self.x + self.vx * dt;
        let next_y = self.y + self.vy * dt;
        let (tx, ty) = level.world_to_tile(next_x, next_y);
        if level.is_blocking_tile(tx, ty) {
            let damaged = level.damage_tile_at(next_x, next_y, self.damage);
            return ProjectileEvent::HitTile { damaged };
        }

        self.x = next_x;
        self.y = next_y;
        ProjectileEvent::Flying
    }

    pub fn touches(&self, x: f32, y: f32, size: f32) -> bool {
        boxes_overlap(self.x, self.y, constants::PROJECTILE_SIZE, x, y, size)
    }

    /// Sanity check for state read back from a save
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.vx, self.vy, self.ttl]
            .iter()
            .all(|v| v.is_finite())
            && self.ttl > 0.0
    }
}
