use serde::{Deserialize, Serialize};

/// Seconds of invulnerability granted after taking a hit
pub const HIT_INVULNERABILITY: f32 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerVitals {
    pub health: u32,
    pub max_health: u32,
    #[serde(default)]
    pub invulnerable_for: f32,
}

impl Default for PlayerVitals {
    fn default() -> Self {
        Self::new(crate::DEFAULT_MAX_HEALTH)
    }
}

impl PlayerVitals {
    pub fn new(max_health: u32) -> Self {
        Self {
            health: max_health,
            max_health,
            invulnerable_for: 0.0,
        }
    }

    /// Returns the damage actually taken (0 while invulnerable).
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        if amount == 0 || self.invulnerable_for > 0.0 || self.is_dead() {
            return 0;
        }
        let taken = amount.min(self.health);
        self.health -= taken;
        self.invulnerable_for = HIT_INVULNERABILITY;
        taken
    }

    pub fn heal(&mut self, amount: u32) {
        self.health = self.health.saturating_add(amount).min(self.max_health);
    }

    pub fn tick(&mut self, dt: f32) {
        self.invulnerable_for = (self.invulnerable_for - dt).max(0.0);
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    /// Clamp values read from an untrusted source
    pub fn sanitized(mut self) -> Self {
        self.max_health = self.max_health.max(1);
        self.health = self.health.min(self.max_health);
        if !self.invulnerable_for.is_finite() || self.invulnerable_for < 0.0 {
            self.invulnerable_for = 0.0;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_grants_invulnerability() {
        let mut vitals = PlayerVitals::new(5);
        assert_eq!(vitals.apply_damage(2), 2);
        assert_eq!(vitals.apply_damage(2), 0);
        vitals.tick(1.0);
        assert_eq!(vitals.apply_damage(9), 3);
        assert!(vitals.is_dead());
    }

    #[test]
    fn heal_is_capped() {
        let mut vitals = PlayerVitals::new(5);
        vitals.health = 1;
        vitals.heal(10);
        assert_eq!(vitals.health, 5);
    }

    #[test]
    fn sanitized_clamps_health() {
        let vitals = PlayerVitals {
            health: 40,
            max_health: 0,
            invulnerable_for: f32::NAN,
        }
        .sanitized();
        assert_eq!(vitals.max_health, 1);
        assert_eq!(vitals.health, 1);
        assert_eq!(vitals.invulnerable_for, 0.0);
    }
}
