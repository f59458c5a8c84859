//! Numeric conversion helpers centralizing lossy casts.

use num_traits::cast::cast;

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Convert usize to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Round a f64 and clamp it to the usize range, returning 0 for NaN or negative values.
#[must_use]
pub fn round_f64_to_usize(value: f64) -> usize {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    let max = cast::<usize, f64>(usize::MAX).unwrap_or(f64::MAX);
    cast::<f64, usize>(value.min(max).round()).unwrap_or(usize::MAX)
}

/// Mean of a u128 sum over `count` items, truncated toward zero.
#[must_use]
pub fn truncated_mean(sum: u128, count: usize) -> u64 {
    let Ok(count) = u128::try_from(count) else {
        return 0;
    };
    if count == 0 {
        return 0;
    }
    u64::try_from(sum / count).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_handles_non_finite_and_negative() {
        assert_eq!(round_f64_to_usize(f64::NAN), 0);
        assert_eq!(round_f64_to_usize(-3.2), 0);
        assert_eq!(round_f64_to_usize(99.5), 100);
        assert_eq!(round_f64_to_usize(f64::INFINITY), usize::MAX);
    }

    #[test]
    fn truncated_mean_floors_and_guards_empty() {
        assert_eq!(truncated_mean(10, 4), 2);
        assert_eq!(truncated_mean(10, 0), 0);
        assert_eq!(truncated_mean(u128::MAX, 1), u64::MAX);
    }

    #[test]
    fn float_conversions_are_lossless_for_small_values() {
        assert!((u64_to_f64(2_600) - 2_600.0).abs() < f64::EPSILON);
        assert!((usize_to_f64(5_000) - 5_000.0).abs() < f64::EPSILON);
    }
}
