//! Thieving trial: repeated pickpocket attempts on a fixed schedule.
//!
//! The clock ticks in 100 ms steps. Steal attempts and health regeneration
//! fire when the clock lands exactly on a multiple of their interval, which
//! is why the clock is a [`SimTime`] and never a float. A failed attempt
//! stuns the thief; the stun replaces the base tick for that iteration.

use serde::{Deserialize, Serialize};

use crate::config::ThievingConfig;
use crate::constants::{STUN_PENALTY, THEFT_CEILING, THEFT_TICK};
use crate::rng::RandomSource;
use crate::time::SimTime;

/// Outcome of one thieving trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TheftResult {
    pub elapsed: SimTime,
    pub money_earned: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub attempt_count: u64,
}

/// Mutable state of a single thieving trial.
#[derive(Debug, Clone)]
pub struct TheftTrial<'a> {
    config: &'a ThievingConfig,
    current_health: i64,
    elapsed: SimTime,
    money_earned: u64,
    success_count: u64,
    failure_count: u64,
}

impl<'a> TheftTrial<'a> {
    #[must_use]
    pub const fn new(config: &'a ThievingConfig) -> Self {
        Self {
            config,
            current_health: config.params().max_health,
            elapsed: SimTime::ZERO,
            money_earned: 0,
            success_count: 0,
            failure_count: 0,
        }
    }

    /// True once the thief is dead or the ceiling is reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current_health <= 0 || self.elapsed >= THEFT_CEILING
    }

    #[must_use]
    pub const fn current_health(&self) -> i64 {
        self.current_health
    }

    #[must_use]
    pub const fn elapsed(&self) -> SimTime {
        self.elapsed
    }

    pub fn step<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        let params = self.config.params();
        let mut stunned = false;

        if self.elapsed.is_multiple_of(params.steal_interval) {
            if rng.unit() > params.steal_success_chance {
                self.failure_count += 1;
                let damage = rng.int_inclusive(params.min_damage, params.max_damage);
                self.current_health = self.current_health.saturating_sub(damage);
                if self.current_health <= 0 {
                    return;
                }
                self.elapsed = self.elapsed.saturating_add(STUN_PENALTY);
                stunned = true;
            } else {
                self.success_count += 1;
                let gold = rng.int_inclusive(params.min_gold, params.max_gold);
                self.money_earned = self
                    .money_earned
                    .saturating_add(u64::try_from(gold).unwrap_or(0));
            }
        }

        if self
            .elapsed
            .is_multiple_of(params.health_regeneration_interval)
        {
            self.current_health = self
                .current_health
                .saturating_add(params.health_regeneration_amount)
                .min(params.max_health);
        }

        if !stunned {
            self.elapsed = self.elapsed.saturating_add(THEFT_TICK);
        }
    }

    /// Result at the current state. Elapsed time never exceeds the ceiling.
    #[must_use]
    pub fn result(&self) -> TheftResult {
        TheftResult {
            elapsed: self.elapsed.min(THEFT_CEILING),
            money_earned: self.money_earned,
            success_count: self.success_count,
            failure_count: self.failure_count,
            attempt_count: self.success_count + self.failure_count,
        }
    }
}

/// Run one thieving trial to termination.
pub fn simulate_theft<R: RandomSource + ?Sized>(
    config: &ThievingConfig,
    rng: &mut R,
) -> TheftResult {
    let mut trial = TheftTrial::new(config);
    while !trial.is_finished() {
        trial.step(rng);
    }
    trial.result()
}
