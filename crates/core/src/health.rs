//! Lagging health bar ("damage ghost").
//!
//! The displayed value freezes for a short grace window after any drop, then
//! eases down toward the real value. Increases (heals, respawns) snap
//! immediately.

use serde::{Deserialize, Serialize};

use crate::math::approach;

/// Tuning for the damage ghost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthBarConfig {
    /// Seconds the displayed value holds after a drop.
    pub grace_seconds: f32,
    /// Smoothing rate once the grace window has elapsed.
    pub ease_rate: f32,
    /// Gap below which the displayed value snaps to the real one.
    pub snap_epsilon: f32,
}

impl Default for HealthBarConfig {
    fn default() -> Self {
        Self {
            grace_seconds: 0.5,
            ease_rate: 4.0,
            snap_epsilon: 0.05,
        }
    }
}

/// Real and displayed health for one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthBar {
    current: f32,
    displayed: f32,
    grace_remaining: f32,
}

impl HealthBar {
    pub const FULL: f32 = 100.0;

    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            displayed: initial,
            grace_remaining: 0.0,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn displayed(&self) -> f32 {
        self.displayed
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    /// Feed the latest replicated health and advance the ghost by `dt`.
    pub fn update(&mut self, current: f32, dt: f32, config: &HealthBarConfig) {
        let previous = self.current;
        self.current = current;

        if current >= self.displayed {
            self.displayed = current;
            self.grace_remaining = 0.0;
            return;
        }

        if current < previous {
            // Fresh drop: (re)start the hold without consuming this frame.
            self.grace_remaining = config.grace_seconds;
            return;
        }

        if self.grace_remaining > 0.0 {
            self.grace_remaining -= dt;
            if self.grace_remaining > 0.0 {
                return;
            }
        }

        self.displayed = approach(self.displayed, current, dt, config.ease_rate);
        if (self.displayed - current).abs() < config.snap_epsilon {
            self.displayed = current;
        }
    }
}

impl Default for HealthBar {
    fn default() -> Self {
        Self::new(Self::FULL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ghost_holds_then_eases() {
        let config = HealthBarConfig::default();
        let mut bar = HealthBar::new(100.0);
        let dt = 0.05;

        // Drop to 60 at t = 0
        bar.update(60.0, dt, &config);
        assert_eq!(bar.displayed(), 100.0);
        assert_eq!(bar.current(), 60.0);

        let mut t = 0.0_f32;
        let mut last = bar.displayed();
        for _ in 0..200 {
            t += dt;
            bar.update(60.0, dt, &config);
            let shown = bar.displayed();
            if t < 0.5 - 1e-4 {
                assert_eq!(shown, 100.0, "moved during grace at t={t}");
            }
            assert!(shown <= last, "increased at t={t}");
            assert!(shown >= 60.0);
            last = shown;
        }
        assert_eq!(bar.displayed(), 60.0);
    }

    #[test]
    fn test_heal_snaps() {
        let config = HealthBarConfig::default();
        let mut bar = HealthBar::new(100.0);
        bar.update(40.0, 0.016, &config);
        bar.update(90.0, 0.016, &config);
        assert_eq!(bar.displayed(), 90.0);
        assert_eq!(bar.current(), 90.0);
    }

    #[test]
    fn test_second_drop_restarts_grace() {
        let config = HealthBarConfig::default();
        let mut bar = HealthBar::new(100.0);
        bar.update(80.0, 0.1, &config);
        for _ in 0..4 {
            bar.update(80.0, 0.1, &config);
        }
        bar.update(50.0, 0.1, &config);
        for _ in 0..4 {
            bar.update(50.0, 0.1, &config);
            assert_eq!(bar.displayed(), 100.0);
        }
    }

    #[test]
    fn test_dead() {
        let mut bar = HealthBar::default();
        assert!(!bar.is_dead());
        bar.update(0.0, 0.016, &HealthBarConfig::default());
        assert!(bar.is_dead());
    }
}
