//! Fixed-point simulated time.
//!
//! Scheduled checks in the thieving loop compare the clock against
//! interval multiples with exact equality, so the clock must never drift.
//! `SimTime` stores whole milliseconds and parses decimal seconds without
//! going through binary floating point.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::numbers::u64_to_f64;

const MILLIS_PER_SECOND: u64 = 1_000;
const FRACTION_DIGITS: usize = 3;

/// Simulated duration in whole milliseconds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimTime(u64);

/// Errors raised when decimal seconds cannot be represented exactly.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("duration is empty")]
    Empty,
    #[error("`{0}` is not a non-negative number of seconds")]
    Malformed(String),
    #[error("`{0}` has more than three fractional digits")]
    TooPrecise(String),
    #[error("`{0}` is too large")]
    Overflow(String),
}

impl SimTime {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(MILLIS_PER_SECOND))
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Whole seconds, truncating any sub-second remainder.
    #[must_use]
    pub const fn whole_secs(self) -> u64 {
        self.0 / MILLIS_PER_SECOND
    }

    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        u64_to_f64(self.0) / u64_to_f64(MILLIS_PER_SECOND)
    }

    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// True when the clock sits exactly on a multiple of `interval`.
    ///
    /// A zero interval never matches.
    #[must_use]
    pub const fn is_multiple_of(self, interval: Self) -> bool {
        interval.0 != 0 && self.0 % interval.0 == 0
    }

    /// Parse decimal seconds such as `"2.6"` or `"8"` into an exact value.
    ///
    /// # Errors
    ///
    /// Returns an error for empty or non-numeric input, for more than three
    /// significant fractional digits, or when the value overflows.
    pub fn parse_secs(text: &str) -> Result<Self, TimeParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(TimeParseError::Empty);
        }
        let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
        {
            return Err(TimeParseError::Malformed(trimmed.to_string()));
        }

        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > FRACTION_DIGITS {
            return Err(TimeParseError::TooPrecise(trimmed.to_string()));
        }

        let overflow = || TimeParseError::Overflow(trimmed.to_string());
        let whole_secs: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let mut fraction_millis = 0u64;
        for (position, digit) in fraction.bytes().enumerate() {
            let scale = 10u64.pow(u32::try_from(FRACTION_DIGITS - 1 - position).unwrap_or(0));
            fraction_millis += u64::from(digit - b'0') * scale;
        }

        whole_secs
            .checked_mul(MILLIS_PER_SECOND)
            .and_then(|millis| millis.checked_add(fraction_millis))
            .map(Self)
            .ok_or_else(overflow)
    }
}

impl FromStr for SimTime {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_secs(s)
    }
}

/// Renders as `H:MM:SS`, dropping sub-second precision.
impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.whole_secs();
        let hours = total / 3_600;
        let minutes = total % 3_600 / 60;
        let seconds = total % 60;
        write!(f, "{hours}:{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_tenths_and_thousandths() {
        assert_eq!(SimTime::parse_secs("2.6").unwrap().as_millis(), 2_600);
        assert_eq!(SimTime::parse_secs("8").unwrap().as_millis(), 8_000);
        assert_eq!(SimTime::parse_secs("0.125").unwrap().as_millis(), 125);
        assert_eq!(SimTime::parse_secs(" .5 ").unwrap().as_millis(), 500);
        assert_eq!(SimTime::parse_secs("3.").unwrap().as_millis(), 3_000);
        assert_eq!(SimTime::parse_secs("2.600000").unwrap().as_millis(), 2_600);
    }

    #[test]
    fn rejects_unrepresentable_input() {
        assert_eq!(SimTime::parse_secs(""), Err(TimeParseError::Empty));
        assert!(matches!(
            SimTime::parse_secs("-1"),
            Err(TimeParseError::Malformed(_))
        ));
        assert!(matches!(
            SimTime::parse_secs("1e3"),
            Err(TimeParseError::Malformed(_))
        ));
        assert!(matches!(
            SimTime::parse_secs("."),
            Err(TimeParseError::Malformed(_))
        ));
        assert!(matches!(
            SimTime::parse_secs("0.0001"),
            Err(TimeParseError::TooPrecise(_))
        ));
        assert!(matches!(
            SimTime::parse_secs("99999999999999999999"),
            Err(TimeParseError::Overflow(_))
        ));
    }

    #[test]
    fn multiples_are_exact() {
        let interval = SimTime::parse_secs("2.6").unwrap();
        let mut clock = SimTime::ZERO;
        let tick = SimTime::from_millis(100);
        let mut hits = 0;
        for _ in 0..=260 {
            if clock.is_multiple_of(interval) {
                hits += 1;
            }
            clock = clock.saturating_add(tick);
        }
        // 0.0, 2.6, 5.2, ..., 26.0
        assert_eq!(hits, 11);
        assert!(!clock.is_multiple_of(SimTime::ZERO));
    }

    #[test]
    fn displays_hours_minutes_seconds() {
        assert_eq!(SimTime::ZERO.to_string(), "0:00:00");
        assert_eq!(SimTime::from_millis(3_723_999).to_string(), "1:02:03");
        assert_eq!(SimTime::from_secs(8 * 3_600).to_string(), "8:00:00");
    }
}
