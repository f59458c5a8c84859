//! Batch aggregation and the plain-text summary report.
//!
//! Every statistic is computed in integers from a sorted copy of the
//! batch, so the same multiset of results always yields the same report
//! regardless of completion order.

use std::fmt;

use serde::Serialize;

use crate::batch::{TrialBatch, TrialOutcome};
use crate::constants::DEFAULT_TAIL_FRACTION;
use crate::fighting::BattleResult;
use crate::numbers::{round_f64_to_usize, truncated_mean, usize_to_f64};
use crate::thieving::TheftResult;
use crate::time::SimTime;

pub const EMPTY_REPORT: &str = "No completed trials";
const SEPARATOR: &str = "--------------------";

/// How many results make up a best or worst tail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TailWindow {
    Count(usize),
    /// Share of the batch, e.g. `0.02` for the top and bottom 2 %.
    Fraction(f64),
}

impl Default for TailWindow {
    fn default() -> Self {
        Self::Fraction(DEFAULT_TAIL_FRACTION)
    }
}

impl TailWindow {
    /// Window size for a batch of `len` results, clamped to `[1, len]`.
    ///
    /// An empty batch has no window.
    #[must_use]
    pub fn resolve(self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let raw = match self {
            Self::Count(count) => count,
            Self::Fraction(fraction) => round_f64_to_usize(usize_to_f64(len) * fraction),
        };
        raw.clamp(1, len)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeStats {
    pub mean: SimTime,
    pub median: SimTime,
    pub min: SimTime,
    pub max: SimTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountStats {
    pub mean: u64,
    pub median: u64,
    pub min: u64,
    pub max: u64,
}

impl CountStats {
    /// Order statistics over already sorted values. `None` when empty.
    fn from_sorted(sorted: &[u64]) -> Option<Self> {
        let (&min, &max) = (sorted.first()?, sorted.last()?);
        let sum: u128 = sorted.iter().map(|&v| u128::from(v)).sum();
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            let pair = u128::from(sorted[mid - 1]) + u128::from(sorted[mid]);
            truncated_mean(pair, 2)
        } else {
            sorted[mid]
        };
        Some(Self {
            mean: truncated_mean(sum, sorted.len()),
            median,
            min,
            max,
        })
    }
}

impl From<CountStats> for TimeStats {
    fn from(stats: CountStats) -> Self {
        Self {
            mean: SimTime::from_millis(stats.mean),
            median: SimTime::from_millis(stats.median),
            min: SimTime::from_millis(stats.min),
            max: SimTime::from_millis(stats.max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FightingSummary {
    pub trials: usize,
    pub time: TimeStats,
    pub killed: CountStats,
}

impl fmt::Display for FightingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mean time: {}", self.time.mean)?;
        writeln!(f, "Median time: {}", self.time.median)?;
        writeln!(f, "Min time: {}", self.time.min)?;
        writeln!(f, "Max time: {}", self.time.max)?;
        writeln!(f, "{SEPARATOR}")?;
        writeln!(f, "Mean killed: {}", self.killed.mean)?;
        writeln!(f, "Median killed: {}", self.killed.median)?;
        writeln!(f, "Min killed: {}", self.killed.min)?;
        write!(f, "Max killed: {}", self.killed.max)
    }
}

/// Mean of the best and worst `window` results of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TailMeans {
    pub top: u64,
    pub bottom: u64,
}

impl TailMeans {
    fn from_sorted(sorted: &[u64], window: usize) -> Self {
        let window = window.min(sorted.len()).max(1);
        let sum = |slice: &[u64]| slice.iter().map(|&v| u128::from(v)).sum::<u128>();
        Self {
            top: truncated_mean(sum(&sorted[sorted.len() - window..]), window),
            bottom: truncated_mean(sum(&sorted[..window]), window),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThievingSummary {
    pub trials: usize,
    pub tail_window: usize,
    pub time: TimeStats,
    pub time_tails: TailMeans,
    pub mean_money: u64,
    pub money_tails: TailMeans,
    pub mean_attempts: u64,
    pub mean_successes: u64,
    pub mean_failures: u64,
}

impl fmt::Display for ThievingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mean time: {}", self.time.mean)?;
        writeln!(f, "Median time: {}", self.time.median)?;
        writeln!(f, "Min time: {}", self.time.min)?;
        writeln!(f, "Max time: {}", self.time.max)?;
        writeln!(
            f,
            "Max mean time: {}",
            SimTime::from_millis(self.time_tails.top)
        )?;
        writeln!(
            f,
            "Min mean time: {}",
            SimTime::from_millis(self.time_tails.bottom)
        )?;
        writeln!(f, "{SEPARATOR}")?;
        writeln!(f, "Mean money earned: {}", self.mean_money)?;
        writeln!(f, "Max money earned: {}", self.money_tails.top)?;
        writeln!(f, "Min money earned: {}", self.money_tails.bottom)?;
        writeln!(f, "{SEPARATOR}")?;
        writeln!(f, "Mean attempts: {}", self.mean_attempts)?;
        writeln!(f, "Mean successes: {}", self.mean_successes)?;
        write!(f, "Mean failures: {}", self.mean_failures)
    }
}

/// Stateless reducer from a batch to its summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Aggregator {
    window: TailWindow,
}

impl Aggregator {
    #[must_use]
    pub const fn new(window: TailWindow) -> Self {
        Self { window }
    }

    #[must_use]
    pub const fn window(&self) -> TailWindow {
        self.window
    }

    #[must_use]
    pub fn summarize_fighting(&self, batch: &TrialBatch<BattleResult>) -> Option<FightingSummary> {
        let times = sorted_by(batch, |r| r.elapsed.as_millis());
        let kills = sorted_by(batch, |r| r.enemies_killed);
        Some(FightingSummary {
            trials: batch.len(),
            time: CountStats::from_sorted(&times)?.into(),
            killed: CountStats::from_sorted(&kills)?,
        })
    }

    #[must_use]
    pub fn summarize_thieving(&self, batch: &TrialBatch<TheftResult>) -> Option<ThievingSummary> {
        if batch.is_empty() {
            return None;
        }
        let len = batch.len();
        let window = self.window.resolve(len);
        let times = sorted_by(batch, |r| r.elapsed.as_millis());
        let money = sorted_by(batch, |r| r.money_earned);
        let mean_of = |field: fn(&TheftResult) -> u64| {
            truncated_mean(batch.iter().map(|r| u128::from(field(r))).sum(), len)
        };

        Some(ThievingSummary {
            trials: len,
            tail_window: window,
            time: CountStats::from_sorted(&times)?.into(),
            time_tails: TailMeans::from_sorted(&times, window),
            mean_money: mean_of(|r| r.money_earned),
            money_tails: TailMeans::from_sorted(&money, window),
            mean_attempts: mean_of(|r| r.attempt_count),
            mean_successes: mean_of(|r| r.success_count),
            mean_failures: mean_of(|r| r.failure_count),
        })
    }

    #[must_use]
    pub fn summarize<O: Summarize>(&self, batch: &TrialBatch<O>) -> Option<O::Summary> {
        O::summarize(self, batch)
    }

    /// Report text for `batch`, or [`EMPTY_REPORT`] when nothing completed.
    #[must_use]
    pub fn render<O: Summarize>(&self, batch: &TrialBatch<O>) -> String {
        self.summarize(batch)
            .map_or_else(|| EMPTY_REPORT.to_string(), |summary| summary.to_string())
    }
}

/// Outcomes that know how to reduce a batch of themselves.
pub trait Summarize: TrialOutcome {
    type Summary: fmt::Display + Serialize;

    fn summarize(aggregator: &Aggregator, batch: &TrialBatch<Self>) -> Option<Self::Summary>;
}

impl Summarize for BattleResult {
    type Summary = FightingSummary;

    fn summarize(aggregator: &Aggregator, batch: &TrialBatch<Self>) -> Option<FightingSummary> {
        aggregator.summarize_fighting(batch)
    }
}

impl Summarize for TheftResult {
    type Summary = ThievingSummary;

    fn summarize(aggregator: &Aggregator, batch: &TrialBatch<Self>) -> Option<ThievingSummary> {
        aggregator.summarize_thieving(batch)
    }
}

/// Report text for `batch` with the default tail window.
#[must_use]
pub fn summarize<O: Summarize>(batch: &TrialBatch<O>) -> String {
    Aggregator::default().render(batch)
}

fn sorted_by<R>(batch: &TrialBatch<R>, key: impl Fn(&R) -> u64) -> Vec<u64> {
    let mut values: Vec<u64> = batch.iter().map(key).collect();
    values.sort_unstable();
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battle(secs: u64, kills: u64) -> BattleResult {
        BattleResult {
            elapsed: SimTime::from_secs(secs),
            enemies_killed: kills,
        }
    }

    fn theft(secs: u64, money: u64, successes: u64, failures: u64) -> TheftResult {
        TheftResult {
            elapsed: SimTime::from_secs(secs),
            money_earned: money,
            success_count: successes,
            failure_count: failures,
            attempt_count: successes + failures,
        }
    }

    #[test]
    fn fighting_report_matches_layout() {
        let batch: TrialBatch<_> =
            vec![battle(3_600, 10), battle(7_200, 20), battle(60, 3)].into();
        let expected = "\
Mean time: 1:00:20
Median time: 1:00:00
Min time: 0:01:00
Max time: 2:00:00
--------------------
Mean killed: 11
Median killed: 10
Min killed: 3
Max killed: 20";
        assert_eq!(summarize(&batch), expected);
    }

    #[test]
    fn thieving_report_matches_layout() {
        let batch: TrialBatch<_> = vec![
            theft(10, 100, 2, 0),
            theft(20, 200, 3, 1),
            theft(3_600, 3_000, 40, 2),
        ]
        .into();
        let expected = "\
Mean time: 0:20:10
Median time: 0:00:20
Min time: 0:00:10
Max time: 1:00:00
Max mean time: 1:00:00
Min mean time: 0:00:10
--------------------
Mean money earned: 1100
Max money earned: 3000
Min money earned: 100
--------------------
Mean attempts: 16
Mean successes: 15
Mean failures: 1";
        assert_eq!(summarize(&batch), expected);
    }

    #[test]
    fn even_median_averages_middle_pair() {
        let batch: TrialBatch<_> =
            vec![battle(10, 1), battle(20, 2), battle(31, 4), battle(40, 9)].into();
        let summary = Aggregator::default().summarize_fighting(&batch).unwrap();
        assert_eq!(summary.time.median, SimTime::from_millis(25_500));
        assert_eq!(summary.killed.median, 3);
        assert_eq!(summary.killed.mean, 4);
    }

    #[test]
    fn statistics_ignore_completion_order() {
        let results = vec![
            theft(100, 500, 3, 1),
            theft(9, 0, 0, 1),
            theft(28_800, 90_000, 900, 40),
        ];
        let mut reversed = results.clone();
        reversed.reverse();
        let aggregator = Aggregator::new(TailWindow::Count(1));
        assert_eq!(
            aggregator.summarize_thieving(&results.into()),
            aggregator.summarize_thieving(&reversed.into())
        );
    }

    #[test]
    fn summarize_is_idempotent() {
        let batch: TrialBatch<_> = vec![theft(50, 70, 1, 0), theft(80, 10, 1, 1)].into();
        assert_eq!(summarize(&batch), summarize(&batch));
    }

    #[test]
    fn thieving_tails_use_window() {
        let batch: TrialBatch<_> = (1..=10)
            .map(|i| theft(i * 100, i * 1_000, i, 0))
            .collect();
        let summary = Aggregator::new(TailWindow::Count(2))
            .summarize_thieving(&batch)
            .unwrap();
        assert_eq!(summary.tail_window, 2);
        assert_eq!(summary.time_tails.top, 950_000);
        assert_eq!(summary.time_tails.bottom, 150_000);
        assert_eq!(summary.money_tails.top, 9_500);
        assert_eq!(summary.money_tails.bottom, 1_500);
        assert_eq!(summary.mean_money, 5_500);
        assert_eq!(summary.mean_attempts, 5);

        let text = summary.to_string();
        assert!(text.starts_with(
            "Mean time: 0:09:10\nMedian time: 0:09:10\nMin time: 0:01:40\nMax time: 0:16:40\n\
             Max mean time: 0:15:50\nMin mean time: 0:02:30\n"
        ));
        assert!(text.contains("Max money earned: 9500\nMin money earned: 1500\n"));
        assert!(text.ends_with("Mean failures: 0"));
    }

    #[test]
    fn tail_window_clamps_to_batch() {
        assert_eq!(TailWindow::default().resolve(5_000), 100);
        assert_eq!(TailWindow::default().resolve(10), 1);
        assert_eq!(TailWindow::Count(0).resolve(10), 1);
        assert_eq!(TailWindow::Count(50).resolve(10), 10);
        assert_eq!(TailWindow::Fraction(1.5).resolve(4), 4);
        assert_eq!(TailWindow::Count(3).resolve(0), 0);
    }

    #[test]
    fn empty_batches_render_placeholder() {
        assert_eq!(summarize(&TrialBatch::<BattleResult>::new()), EMPTY_REPORT);
        assert!(Aggregator::default()
            .summarize_thieving(&TrialBatch::new())
            .is_none());
    }
}
