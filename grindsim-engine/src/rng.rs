//! Random draw abstraction and per-trial stream derivation.
//!
//! Every trial gets its own ChaCha stream whose seed is derived from the
//! run's master seed and the trial index, so results do not depend on
//! which worker picked a trial up or in what order trials finished.

use std::collections::VecDeque;

use hmac::{Hmac, Mac};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::Sha256;

/// Source of the two kinds of draws the simulators consume.
pub trait RandomSource {
    /// Uniform real in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform integer in `[low, high]`. Callers guarantee `low <= high`.
    fn int_inclusive(&mut self, low: i64, high: i64) -> i64;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn unit(&mut self) -> f64 {
        self.r#gen::<f64>()
    }

    fn int_inclusive(&mut self, low: i64, high: i64) -> i64 {
        self.gen_range(low..=high)
    }
}

/// Random stream handed to a single trial.
pub type TrialRng = CountingRng<ChaCha8Rng>;

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha8Rng> {
    /// Stream for trial `trial_index` of a run seeded with `master_seed`.
    #[must_use]
    pub fn for_trial(master_seed: u64, trial_index: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(derive_trial_seed(master_seed, trial_index)),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Fresh master seed for runs that did not ask for reproducibility.
#[must_use]
pub fn entropy_seed() -> u64 {
    rand::random()
}

/// HMAC-SHA256 keyed by the master seed over `"trial" || index`.
#[must_use]
pub fn derive_trial_seed(master_seed: u64, trial_index: u64) -> u64 {
    let mut mac = Hmac::<Sha256>::new_from_slice(&master_seed.to_le_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(b"trial");
    mac.update(&trial_index.to_le_bytes());
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Replays a fixed script of draws.
///
/// Useful for pinning a state machine to an exact path. Once a queue runs
/// dry it yields the lowest value of the requested range (`0.0` or `low`);
/// scripted integers are clamped into the requested range.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    units: VecDeque<f64>,
    ints: VecDeque<i64>,
}

impl ScriptedSource {
    #[must_use]
    pub fn new(
        units: impl IntoIterator<Item = f64>,
        ints: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            units: units.into_iter().collect(),
            ints: ints.into_iter().collect(),
        }
    }

    /// Draws still queued, as `(units, ints)`.
    #[must_use]
    pub fn remaining(&self) -> (usize, usize) {
        (self.units.len(), self.ints.len())
    }
}

impl RandomSource for ScriptedSource {
    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(0.0)
    }

    fn int_inclusive(&mut self, low: i64, high: i64) -> i64 {
        self.ints.pop_front().unwrap_or(low).clamp(low, high)
    }
}
