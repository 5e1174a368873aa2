//! Player position and movement.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    /// Unit vector in world space (y grows downward)
    pub fn vector(self) -> (f32, f32) {
        match self {
            Facing::Up => (0.0, -1.0),
            Facing::Down => (0.0, 1.0),
            Facing::Left => (-1.0, 0.0),
            Facing::Right => (1.0, 0.0),
        }
    }

    /// Dominant axis of a movement vector; `None` when not moving
    pub fn from_vector(dx: f32, dy: f32) -> Option<Self> {
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        Some(if dx.abs() > dy.abs() {
            if dx > 0.0 { Facing::Right } else { Facing::Left }
        } else if dy > 0.0 {
            Facing::Down
        } else {
            Facing::Up
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub facing: Facing,
    pub speed: f32,
    pub size: f32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new(0.0, 0.0, crate::DEFAULT_PLAYER_SPEED, crate::DEFAULT_PLAYER_SIZE)
    }
}

impl PlayerState {
    pub fn new(x: f32, y: f32, speed: f32, size: f32) -> Self {
        Self {
            x,
            y,
            facing: Facing::Down,
            speed,
            size,
        }
    }

    /// Move along `(dx, dy)` for `dt` seconds. Each axis is tried separately
    /// so the player slides along walls. `can_move(size, x, y)` is the
    /// collision query.
    pub fn step<F>(&mut self, dx: f32, dy: f32, dt: f32, can_move: F) -> bool
    where
        F: Fn(f32, f32, f32) -> bool,
    {
        let Some(facing) = Facing::from_vector(dx, dy) else {
            return false;
        };
        self.facing = facing;

        let length = (dx * dx + dy * dy).sqrt();
        let (ux, uy) = (dx / length, dy / length);
        let distance = self.speed * dt;
        let mut moved = false;

        let next_x = self.x + ux * distance;
        if ux != 0.0 && can_move(self.size, next_x, self.y) {
            self.x = next_x;
            moved = true;
        }
        let next_y = self.y + uy * distance;
        if uy != 0.0 && can_move(self.size, self.x, next_y) {
            self.y = next_y;
            moved = true;
        }
        moved
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }

    /// Replace non-finite or non-positive values read from a save
    pub fn sanitized(mut self) -> Self {
        let fallback = Self::default();
        if !self.x.is_finite() || !self.y.is_finite() {
            self.x = fallback.x;
            self.y = fallback.y;
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            self.speed = fallback.speed;
        }
        if !self.size.is_finite() || self.size <= 0.0 {
            self.size = fallback.size;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slides_along_blocked_axis() {
        let mut player = PlayerState::new(10.0, 10.0, 100.0, 8.0);
        // x beyond 12 is a wall
        let moved = player.step(1.0, 1.0, 0.1, |_, x, _| x < 12.0);
        assert!(moved);
        assert_eq!(player.x, 10.0);
        assert!(player.y > 10.0);
    }

    #[test]
    fn zero_input_keeps_facing() {
        let mut player = PlayerState::new(0.0, 0.0, 10.0, 8.0);
        player.facing = Facing::Left;
        assert!(!player.step(0.0, 0.0, 1.0, |_, _, _| true));
        assert_eq!(player.facing, Facing::Left);
    }

    #[test]
    fn facing_follows_dominant_axis() {
        assert_eq!(Facing::from_vector(0.2, -1.0), Some(Facing::Up));
        assert_eq!(Facing::from_vector(-3.0, 1.0), Some(Facing::Left));
    }
}
