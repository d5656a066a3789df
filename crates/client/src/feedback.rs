//! The local player as seen by the avatar system.

use glam::Vec3;
use mirage_core::hits::BodyPart;

/// Screen effects, hit markers, kill feed.
pub trait LocalFeedback {
    fn on_local_damage(&mut self, report: &DamageReport);

    fn on_kill_confirmed(&mut self, victim_id: &str);
}

/// A hit that landed on the local player.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageReport {
    pub hit_id: String,
    pub shooter_id: String,
    pub damage: f32,
    pub body_part: BodyPart,
    /// Where the shot came from, when replicated.
    pub origin: Option<Vec3>,
    pub stealth: bool,
    pub health_after: f32,
}

/// Identity and health of the observing player.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalObserver {
    pub id: String,
    pub team_id: u32,
    health: f32,
    kills: u32,
    deaths: u32,
    death_counted: bool,
}

impl LocalObserver {
    pub fn new(id: impl Into<String>, team_id: u32) -> Self {
        Self {
            id: id.into(),
            team_id,
            health: 100.0,
            kills: 0,
            deaths: 0,
            death_counted: false,
        }
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    /// Set health directly (respawn, authoritative correction).
    pub fn set_health(&mut self, health: f32) {
        if health.is_finite() {
            self.health = health.max(0.0);
            if self.health > 0.0 {
                self.death_counted = false;
            }
        }
    }

    /// Apply damage and return the new health.
    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        if amount.is_finite() && amount > 0.0 {
            self.health = (self.health - amount).max(0.0);
        }
        self.health
    }

    pub fn kills(&self) -> u32 {
        self.kills
    }

    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    pub(crate) fn record_kill(&mut self) {
        self.kills += 1;
    }

    /// Count a death once until the next [`set_health`](Self::set_health)
    /// brings the player back.
    pub(crate) fn record_death(&mut self) -> bool {
        if self.death_counted {
            return false;
        }
        self.deaths += 1;
        self.death_counted = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_floors_at_zero() {
        let mut local = LocalObserver::new("me", 0);
        assert_eq!(local.apply_damage(30.0), 70.0);
        assert_eq!(local.apply_damage(f32::NAN), 70.0);
        assert_eq!(local.apply_damage(-10.0), 70.0);
        assert_eq!(local.apply_damage(500.0), 0.0);
        local.set_health(100.0);
        assert_eq!(local.health(), 100.0);
    }

    #[test]
    fn test_death_counted_until_respawn() {
        let mut local = LocalObserver::new("me", 1);
        assert!(local.record_death());
        assert!(!local.record_death());
        local.set_health(100.0);
        assert!(local.record_death());
        assert_eq!(local.deaths(), 2);
    }
}
