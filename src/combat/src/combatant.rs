// src/combat/src/combatant.rs

/// Anything that can take part in a fight
pub trait Combatant {
    /// Current hit points
    fn hp(&self) -> u32;

    /// Maximum hit points
    fn max_hp(&self) -> u32;

    /// Still standing
    fn is_alive(&self) -> bool {
        self.hp() > 0
    }

    /// Apply damage; returns `true` if this hit took the combatant down.
    fn take_damage(&mut self, amount: u32) -> bool;

    fn heal(&mut self, amount: u32);
}

/// Axis-aligned overlap of two boxes given by centre and edge length
pub fn boxes_overlap(ax: f32, ay: f32, a_size: f32, bx: f32, by: f32, b_size: f32) -> bool {
    let reach = (a_size + b_size) / 2.0;
    (ax - bx).abs() < reach && (ay - by).abs() < reach
}
