//! Grindsim Trial Engine
//!
//! Monte Carlo simulators for two idle-game grinding loops (fighting an
//! endless queue of enemies and repeatedly pickpocketing), a parallel
//! runner that executes thousands of independent trials, and an
//! aggregator that reduces the results to a summary report.
//! This crate has no I/O beyond logging; front ends own argument parsing,
//! persistence and presentation.

pub mod batch;
pub mod config;
pub mod constants;
pub mod fighting;
pub mod numbers;
pub mod report;
pub mod rng;
pub mod runner;
pub mod thieving;
pub mod time;

// Re-export commonly used types
pub use batch::{TrialBatch, TrialOutcome};
pub use config::{
    ConfigError, FightingConfig, FightingParams, SimConfig, ThievingConfig, ThievingParams,
    TrialFamily,
};
pub use fighting::{BattleResult, BattleTrial, simulate_battle};
pub use report::{
    Aggregator, CountStats, EMPTY_REPORT, FightingSummary, Summarize, TailMeans, TailWindow,
    ThievingSummary, TimeStats, summarize,
};
pub use rng::{CountingRng, RandomSource, ScriptedSource, TrialRng, derive_trial_seed};
pub use runner::{
    CancelToken, Progress, RunError, RunHandle, RunOptions, RunOutcome, Trial,
    default_worker_count, run, run_to_batch, run_with_token,
};
pub use thieving::{TheftResult, TheftTrial, simulate_theft};
pub use time::{SimTime, TimeParseError};
