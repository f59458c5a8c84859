//! Fighting trial: a player grinding an endless queue of identical enemies.

use serde::{Deserialize, Serialize};

use crate::config::FightingConfig;
use crate::constants::{FIGHT_CEILING, RESPAWN_DELAY};
use crate::rng::RandomSource;
use crate::time::SimTime;

/// Outcome of one fighting trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    pub elapsed: SimTime,
    pub enemies_killed: u64,
}

/// Mutable state of a single fighting trial.
///
/// Each call to [`BattleTrial::step`] resolves one player attack. A kill
/// ends the step early: the clock only pays the respawn delay and the
/// player neither takes a counter-attack nor regenerates.
#[derive(Debug, Clone)]
pub struct BattleTrial<'a> {
    config: &'a FightingConfig,
    player_health: i64,
    enemy_health: i64,
    elapsed: SimTime,
    regen_accumulator: SimTime,
    enemies_killed: u64,
}

impl<'a> BattleTrial<'a> {
    #[must_use]
    pub const fn new(config: &'a FightingConfig) -> Self {
        let params = config.params();
        Self {
            config,
            player_health: params.player_health,
            enemy_health: params.enemy_health,
            elapsed: SimTime::ZERO,
            regen_accumulator: SimTime::ZERO,
            enemies_killed: 0,
        }
    }

    /// True once the player is dead or the ceiling is reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.player_health <= 0 || self.elapsed >= FIGHT_CEILING
    }

    #[must_use]
    pub const fn player_health(&self) -> i64 {
        self.player_health
    }

    #[must_use]
    pub const fn enemy_health(&self) -> i64 {
        self.enemy_health
    }

    pub fn step<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        let params = self.config.params();

        if rng.unit() <= params.player_hit_chance {
            let damage = rng.int_inclusive(params.player_damage_min, params.player_damage_max);
            self.enemy_health = self.enemy_health.saturating_sub(damage);
            if self.enemy_health <= 0 {
                self.enemy_health = params.enemy_health;
                self.elapsed = self.elapsed.saturating_add(RESPAWN_DELAY);
                self.enemies_killed += 1;
                return;
            }
        }

        if rng.unit() <= params.enemy_hit_chance {
            let damage = rng.int_inclusive(params.enemy_damage_min, params.enemy_damage_max);
            self.player_health = self.player_health.saturating_sub(damage);
        }

        self.regen_accumulator = self
            .regen_accumulator
            .saturating_add(params.player_attack_interval);
        while self.regen_accumulator >= params.player_regen_interval {
            self.player_health = self
                .player_health
                .saturating_add(params.player_health_regen);
            self.regen_accumulator = self
                .regen_accumulator
                .saturating_sub(params.player_regen_interval);
        }

        self.elapsed = self.elapsed.saturating_add(params.player_attack_interval);
        self.player_health = self.player_health.min(params.player_health);
    }

    /// Result at the current state. Elapsed time never exceeds the ceiling.
    #[must_use]
    pub fn result(&self) -> BattleResult {
        BattleResult {
            elapsed: self.elapsed.min(FIGHT_CEILING),
            enemies_killed: self.enemies_killed,
        }
    }
}

/// Run one fighting trial to termination.
pub fn simulate_battle<R: RandomSource + ?Sized>(
    config: &FightingConfig,
    rng: &mut R,
) -> BattleResult {
    let mut trial = BattleTrial::new(config);
    while !trial.is_finished() {
        trial.step(rng);
    }
    trial.result()
}
