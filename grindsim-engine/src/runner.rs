//! Parallel trial execution.
//!
//! A run spawns a fixed pool of OS threads. Workers claim trial indices
//! from a shared atomic cursor, seed a private stream for each index and
//! send the outcome back over a bounded channel. The [`RunHandle`] is the
//! receiving side: iterate it for results, poll it for progress, and trip
//! its [`CancelToken`] to stop new trials from starting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, trace, warn};
use serde::Serialize;
use thiserror::Error;

use crate::batch::{TrialBatch, TrialOutcome};
use crate::config::{FightingConfig, ThievingConfig};
use crate::fighting::{BattleResult, simulate_battle};
use crate::numbers::usize_to_f64;
use crate::rng::{RandomSource, TrialRng, entropy_seed};
use crate::thieving::{TheftResult, simulate_theft};

/// Results buffered per worker before a slow consumer blocks the pool.
const CHANNEL_DEPTH_PER_WORKER: usize = 64;

/// One simulator, runnable many times against independent random streams.
pub trait Trial: Send + Sync + 'static {
    type Outcome: TrialOutcome;

    fn run_trial<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Self::Outcome;
}

impl Trial for FightingConfig {
    type Outcome = BattleResult;

    fn run_trial<R: RandomSource + ?Sized>(&self, rng: &mut R) -> BattleResult {
        simulate_battle(self, rng)
    }
}

impl Trial for ThievingConfig {
    type Outcome = TheftResult;

    fn run_trial<R: RandomSource + ?Sized>(&self, rng: &mut R) -> TheftResult {
        simulate_theft(self, rng)
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to spawn worker thread")]
    Spawn(#[from] std::io::Error),
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}

/// Available parallelism minus one, never less than one.
#[must_use]
pub fn default_worker_count() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get().saturating_sub(1).max(1))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub trials: usize,
    pub workers: usize,
    /// Master seed. A fresh one is drawn when absent.
    pub seed: Option<u64>,
}

impl RunOptions {
    #[must_use]
    pub fn new(trials: usize) -> Self {
        Self {
            trials,
            workers: default_worker_count(),
            seed: None,
        }
    }

    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn effective_workers(&self) -> usize {
        self.workers.min(self.trials).max(1)
    }
}

/// Shared cancellation flag. Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub requested: usize,
}

impl Progress {
    /// Completed share in `[0, 1]`; an empty run counts as done.
    #[must_use]
    pub fn fraction(self) -> f64 {
        if self.requested == 0 {
            return 1.0;
        }
        usize_to_f64(self.completed) / usize_to_f64(self.requested)
    }

    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.completed >= self.requested
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub requested: usize,
    pub completed: usize,
    pub cancelled: bool,
    pub seed: u64,
    pub total_draws: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cursor: AtomicUsize,
    completed: AtomicUsize,
    draws: AtomicU64,
}

/// Receiving side of a run. Yields results in completion order.
///
/// Dropping the handle cancels the run and joins its workers.
#[derive(Debug)]
pub struct RunHandle<O> {
    receiver: Option<Receiver<O>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
    cancel: CancelToken,
    requested: usize,
    received: usize,
    seed: u64,
}

impl<O: TrialOutcome> RunHandle<O> {
    /// Trials delivered to this handle so far.
    #[must_use]
    pub const fn progress(&self) -> Progress {
        Progress {
            completed: self.received,
            requested: self.requested,
        }
    }

    /// Trials finished by the workers, including ones not yet received.
    #[must_use]
    pub fn finished_trials(&self) -> usize {
        self.counters.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Drain results into `batch`, reporting progress and the partial batch
    /// after each one.
    pub fn drain_into<F>(&mut self, batch: &mut TrialBatch<O>, mut on_progress: F)
    where
        F: FnMut(Progress, &TrialBatch<O>),
    {
        while let Some(outcome) = self.next() {
            batch.push(outcome);
            on_progress(self.progress(), batch);
        }
    }

    /// Stop the pool and report what happened.
    ///
    /// Results that were produced but never received are discarded; a run
    /// that ends with fewer delivered results than requested is reported
    /// as cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::WorkerPanicked`] when a worker thread panicked.
    pub fn finish(mut self) -> Result<RunOutcome, RunError> {
        if self.received < self.requested {
            self.cancel.cancel();
        }
        drop(self.receiver.take());
        join_workers(std::mem::take(&mut self.workers))?;

        let outcome = RunOutcome {
            requested: self.requested,
            completed: self.received,
            cancelled: self.received < self.requested,
            seed: self.seed,
            total_draws: self.counters.draws.load(Ordering::Relaxed),
        };
        if outcome.cancelled {
            warn!(
                "{} run cancelled after {}/{} trials",
                O::FAMILY,
                outcome.completed,
                outcome.requested
            );
        } else {
            debug!(
                "{} run finished: {} trials, {} draws",
                O::FAMILY,
                outcome.completed,
                outcome.total_draws
            );
        }
        Ok(outcome)
    }
}

impl<O> Iterator for RunHandle<O> {
    type Item = O;

    fn next(&mut self) -> Option<O> {
        let outcome = self.receiver.as_ref()?.recv().ok()?;
        self.received += 1;
        Some(outcome)
    }
}

impl<O> Drop for RunHandle<O> {
    fn drop(&mut self) {
        if self.receiver.is_none() && self.workers.is_empty() {
            return;
        }
        self.cancel.cancel();
        drop(self.receiver.take());
        if join_workers(std::mem::take(&mut self.workers)).is_err() {
            warn!("worker panicked while an abandoned run was shutting down");
        }
    }
}

fn join_workers(workers: Vec<JoinHandle<()>>) -> Result<(), RunError> {
    let mut panicked = None;
    for (worker, handle) in workers.into_iter().enumerate() {
        if handle.join().is_err() && panicked.is_none() {
            panicked = Some(worker);
        }
    }
    match panicked {
        Some(worker) => Err(RunError::WorkerPanicked { worker }),
        None => Ok(()),
    }
}

/// Start `options.trials` executions of `trial` on a worker pool.
///
/// # Errors
///
/// Returns [`RunError::Spawn`] when a worker thread cannot be created.
/// Workers that did start are cancelled and joined first.
pub fn run<T: Trial>(
    trial: Arc<T>,
    options: &RunOptions,
) -> Result<RunHandle<T::Outcome>, RunError> {
    run_with_token(trial, options, CancelToken::new())
}

/// Like [`run`], observing an existing cancel token.
///
/// # Errors
///
/// Returns [`RunError::Spawn`] when a worker thread cannot be created.
pub fn run_with_token<T: Trial>(
    trial: Arc<T>,
    options: &RunOptions,
    cancel: CancelToken,
) -> Result<RunHandle<T::Outcome>, RunError> {
    let seed = options.seed.unwrap_or_else(entropy_seed);
    let workers = options.effective_workers();
    let (sender, receiver) = bounded(workers.saturating_mul(CHANNEL_DEPTH_PER_WORKER));

    debug!(
        "starting {} {} trials on {workers} workers (seed {seed})",
        options.trials,
        T::Outcome::FAMILY
    );

    let mut handle = RunHandle {
        receiver: Some(receiver),
        workers: Vec::with_capacity(workers),
        counters: Arc::new(Counters::default()),
        cancel,
        requested: options.trials,
        received: 0,
        seed,
    };

    for worker in 0..workers {
        let job = WorkerJob {
            trial: Arc::clone(&trial),
            sender: sender.clone(),
            counters: Arc::clone(&handle.counters),
            cancel: handle.cancel.clone(),
            trials: options.trials,
            seed,
        };
        let spawned = thread::Builder::new()
            .name(format!("grindsim-worker-{worker}"))
            .spawn(move || job.work())?;
        handle.workers.push(spawned);
    }

    Ok(handle)
}

/// Run to completion and gather every result.
///
/// # Errors
///
/// Propagates spawn failures and worker panics.
pub fn run_to_batch<T: Trial>(
    trial: Arc<T>,
    options: &RunOptions,
) -> Result<(TrialBatch<T::Outcome>, RunOutcome), RunError> {
    let mut handle = run(trial, options)?;
    let mut batch = TrialBatch::for_trials(options.trials);
    handle.drain_into(&mut batch, |_, _| {});
    let outcome = handle.finish()?;
    Ok((batch, outcome))
}

struct WorkerJob<T: Trial> {
    trial: Arc<T>,
    sender: Sender<T::Outcome>,
    counters: Arc<Counters>,
    cancel: CancelToken,
    trials: usize,
    seed: u64,
}

impl<T: Trial> WorkerJob<T> {
    fn work(self) {
        let milestone = (self.trials / 10).max(1);
        while !self.cancel.is_cancelled() {
            let index = self.counters.cursor.fetch_add(1, Ordering::Relaxed);
            if index >= self.trials {
                break;
            }
            let stream = u64::try_from(index).unwrap_or(u64::MAX);
            let mut rng = TrialRng::for_trial(self.seed, stream);
            let outcome = self.trial.run_trial(&mut rng);
            self.counters.draws.fetch_add(rng.draws(), Ordering::Relaxed);
            if self.sender.send(outcome).is_err() {
                break;
            }
            let done = self.counters.completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % milestone == 0 {
                trace!("{done}/{} {} trials complete", self.trials, T::Outcome::FAMILY);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThievingParams;

    fn sorted_keys(batch: &TrialBatch<BattleResult>) -> Vec<(u64, u64)> {
        let mut keys: Vec<_> = batch
            .iter()
            .map(|r| (r.elapsed.as_millis(), r.enemies_killed))
            .collect();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn completes_every_requested_trial() {
        let options = RunOptions::new(200).with_workers(3).with_seed(1);
        let (batch, outcome) =
            run_to_batch(Arc::new(FightingConfig::default()), &options).unwrap();
        assert_eq!(batch.len(), 200);
        assert_eq!(outcome.completed, 200);
        assert!(!outcome.cancelled);
        assert_eq!(outcome.seed, 1);
        assert!(outcome.total_draws > 0);
    }

    #[test]
    fn seeded_runs_are_independent_of_worker_count() {
        let config = Arc::new(FightingConfig::default());
        let (single, _) = run_to_batch(
            Arc::clone(&config),
            &RunOptions::new(64).with_workers(1).with_seed(77),
        )
        .unwrap();
        let (pooled, _) =
            run_to_batch(config, &RunOptions::new(64).with_workers(4).with_seed(77)).unwrap();
        assert_eq!(sorted_keys(&single), sorted_keys(&pooled));
    }

    #[test]
    fn cancellation_stops_new_trials() {
        let config = Arc::new(ThievingConfig::new(ThievingParams::default()).unwrap());
        let options = RunOptions::new(100_000).with_workers(1).with_seed(3);
        let mut handle = run(config, &options).unwrap();
        let token = handle.cancel_token();
        assert!(handle.next().is_some());
        token.cancel();
        let drained = handle.by_ref().count();
        let outcome = handle.finish().unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.completed, 1 + drained);
        assert!(outcome.completed < 100_000);
    }

    #[test]
    fn progress_reports_delivered_results() {
        let mut handle = run(
            Arc::new(FightingConfig::default()),
            &RunOptions::new(20).with_workers(2).with_seed(9),
        )
        .unwrap();
        let mut batch = TrialBatch::new();
        let mut seen = Vec::new();
        handle.drain_into(&mut batch, |progress, partial| {
            assert_eq!(partial.len(), progress.completed);
            seen.push(progress.completed);
        });
        assert_eq!(seen, (1..=20).collect::<Vec<_>>());
        assert!(handle.progress().is_complete());
        assert_eq!(handle.finished_trials(), 20);
        assert!(!handle.finish().unwrap().cancelled);
    }

    #[test]
    fn dropping_handle_cancels_run() {
        let handle = run(
            Arc::new(FightingConfig::default()),
            &RunOptions::new(100_000).with_workers(2).with_seed(5),
        )
        .unwrap();
        let token = handle.cancel_token();
        drop(handle);
        assert!(token.is_cancelled());
    }

    #[test]
    fn zero_trials_finish_immediately() {
        let (batch, outcome) = run_to_batch(
            Arc::new(FightingConfig::default()),
            &RunOptions::new(0).with_workers(4),
        )
        .unwrap();
        assert!(batch.is_empty());
        assert_eq!(outcome.completed, 0);
        assert!(!outcome.cancelled);
        assert!((Progress { completed: 0, requested: 0 }.fraction() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn worker_count_is_never_zero() {
        assert!(default_worker_count() >= 1);
        assert_eq!(RunOptions::new(5).with_workers(0).effective_workers(), 1);
        assert_eq!(RunOptions::new(2).with_workers(8).effective_workers(), 2);
    }
}
