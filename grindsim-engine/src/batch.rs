//! Append-only collections of completed trial results.

use serde::Serialize;

use crate::config::TrialFamily;
use crate::constants::MAX_PREALLOCATED_RESULTS;
use crate::fighting::BattleResult;
use crate::thieving::TheftResult;
use crate::time::SimTime;

/// A single trial's result, as seen by the runner and the aggregator.
pub trait TrialOutcome: Copy + Send + 'static {
    const FAMILY: TrialFamily;

    fn elapsed(&self) -> SimTime;
}

impl TrialOutcome for BattleResult {
    const FAMILY: TrialFamily = TrialFamily::Fighting;

    fn elapsed(&self) -> SimTime {
        self.elapsed
    }
}

impl TrialOutcome for TheftResult {
    const FAMILY: TrialFamily = TrialFamily::Thieving;

    fn elapsed(&self) -> SimTime {
        self.elapsed
    }
}

/// Results of one run, in completion order.
///
/// Order carries no meaning: every statistic computed from a batch is
/// invariant under permutation. The batch only grows while a run feeds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrialBatch<R> {
    results: Vec<R>,
}

impl<R> Default for TrialBatch<R> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
        }
    }
}

impl<R> TrialBatch<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
        }
    }

    /// Empty batch sized for a run of `requested` trials, capped at
    /// [`MAX_PREALLOCATED_RESULTS`].
    #[must_use]
    pub fn for_trials(requested: usize) -> Self {
        Self::with_capacity(requested.min(MAX_PREALLOCATED_RESULTS))
    }

    pub fn push(&mut self, result: R) {
        self.results.push(result);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[R] {
        &self.results
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.results.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<R> {
        self.results
    }
}

impl<R> From<Vec<R>> for TrialBatch<R> {
    fn from(results: Vec<R>) -> Self {
        Self { results }
    }
}

impl<R> FromIterator<R> for TrialBatch<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

impl<R> Extend<R> for TrialBatch<R> {
    fn extend<I: IntoIterator<Item = R>>(&mut self, iter: I) {
        self.results.extend(iter);
    }
}

impl<'a, R> IntoIterator for &'a TrialBatch<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
