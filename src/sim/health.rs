//! Boss health driven by shot reports
//!
//! Destroyed balls and combos hurt the boss; every ball that entered the
//! chain since the last shot heals it a little, so a slow player loses ground.

use serde::{Deserialize, Serialize};

use super::events::{ChainObserver, ShotReport};

/// Conversion from a shot report to damage and healing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRules {
    pub per_ball: u32,
    pub per_combo: u32,
    pub heal_per_entered: u32,
}

impl Default for DamageRules {
    fn default() -> Self {
        Self {
            per_ball: 1,
            per_combo: 1,
            heal_per_entered: 1,
        }
    }
}

impl DamageRules {
    pub fn damage(&self, report: &ShotReport) -> u32 {
        report
            .destroyed
            .saturating_mul(self.per_ball)
            .saturating_add(report.combos.saturating_mul(self.per_combo))
    }

    pub fn heal(&self, report: &ShotReport) -> u32 {
        (report.entered.len() as u32).saturating_mul(self.heal_per_entered)
    }
}

/// Result of applying one report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthChange {
    pub damage: u32,
    pub healed: u32,
    pub current: u32,
    pub died: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn is_dead(&self) -> bool {
        self.current == 0
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.current = self.current.saturating_sub(amount);
    }

    /// The dead stay dead
    pub fn heal(&mut self, amount: u32) {
        if !self.is_dead() {
            self.current = self.current.saturating_add(amount).min(self.max);
        }
    }

    /// Damage first, then heal
    pub fn apply_report(&mut self, rules: &DamageRules, report: &ShotReport) -> HealthChange {
        let was_dead = self.is_dead();
        let damage = rules.damage(report);
        let healed = rules.heal(report);
        self.take_damage(damage);
        self.heal(healed);
        HealthChange {
            damage,
            healed,
            current: self.current,
            died: !was_dead && self.is_dead(),
        }
    }
}

/// Observer that keeps a boss's health in sync with the chain
#[derive(Debug, Clone)]
pub struct BossHealth {
    pub health: Health,
    pub rules: DamageRules,
}

impl BossHealth {
    pub fn new(max: u32, rules: DamageRules) -> Self {
        Self {
            health: Health::new(max),
            rules,
        }
    }
}

impl ChainObserver for BossHealth {
    fn on_shot_report(&mut self, report: &ShotReport) {
        let change = self.health.apply_report(&self.rules, report);
        log::info!(
            "Destroyed:{} Combos:{} DamageTaken:{} Healed:{} Health:{}/{}",
            report.destroyed,
            report.combos,
            change.damage,
            change.healed,
            change.current,
            self.health.max
        );
        if change.died {
            log::info!("Boss died!");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(destroyed: u32, combos: u32, entered: usize) -> ShotReport {
        ShotReport {
            destroyed,
            combos,
            entered: vec![0; entered],
        }
    }

    #[test]
    fn test_damage_then_heal() {
        let rules = DamageRules {
            per_ball: 2,
            per_combo: 5,
            heal_per_entered: 1,
        };
        let mut health = Health::new(100);
        let change = health.apply_report(&rules, &report(6, 2, 3));
        assert_eq!(change.damage, 22);
        assert_eq!(change.healed, 3);
        assert_eq!(health.current, 81);
        assert!(!change.died);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut health = Health::new(10);
        health.apply_report(&DamageRules::default(), &report(0, 0, 25));
        assert_eq!(health.current, 10);
    }

    #[test]
    fn test_death_is_final() {
        let mut health = Health::new(5);
        let change = health.apply_report(&DamageRules::default(), &report(9, 1, 4));
        assert!(change.died);
        assert_eq!(health.current, 0);

        let change = health.apply_report(&DamageRules::default(), &report(0, 0, 4));
        assert!(!change.died);
        assert!(health.is_dead());
    }

    #[test]
    fn test_boss_observer() {
        let mut boss = BossHealth::new(50, DamageRules::default());
        boss.on_shot_report(&report(3, 1, 0));
        assert_eq!(boss.health.current, 46);
    }
}
