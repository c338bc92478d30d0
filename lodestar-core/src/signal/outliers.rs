//! Robust statistics for small RSSI batches
//!
//! BLE scans deliver a handful of samples per beacon per window, often with
//! one or two wild values from multipath or a body blocking the line of
//! sight. Means are useless at that size, so everything here is built on the
//! median.
//!
//! ```text
//! samples ──► modified z-score filter ──► sort ──► middle 50% ──► median
//!               (|z| ≥ 3.5 dropped)                 [n/4, 3n/4)
//! ```

use crate::constants::signal::{
    MIN_RETAINED_FRACTION, MIN_SAMPLES_FOR_OUTLIER_REJECTION, MODIFIED_Z_CUTOFF, MODIFIED_Z_SCALE,
};

/// Median of `values`, `None` when empty
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(median_of_sorted(&sorted))
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Median absolute deviation around `center`
pub fn median_absolute_deviation(values: &[f64], center: f64) -> f64 {
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations).unwrap_or(0.0)
}

/// Population variance, 0 for fewer than two values
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Spread between the largest and smallest value
pub fn range(values: &[f64]) -> f64 {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if values.len() < 2 {
        0.0
    } else {
        max - min
    }
}

/// Result of one outlier pass
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Samples kept, in input order
    pub retained: Vec<f64>,
    /// How many samples the filter dropped
    pub removed: usize,
    /// The filter wanted to drop more than half the batch and was overruled
    pub reverted: bool,
}

impl FilterOutcome {
    fn untouched(samples: &[f64]) -> Self {
        Self { retained: samples.to_vec(), removed: 0, reverted: false }
    }
}

/// Drop samples whose modified z-score reaches the cutoff
///
/// Batches under three samples and batches with zero MAD pass through. If
/// filtering would leave fewer than half the samples, the original batch is
/// kept and `reverted` is set.
pub fn reject_outliers(samples: &[f64]) -> FilterOutcome {
    reject_with_cutoff(samples, MODIFIED_Z_CUTOFF)
}

fn reject_with_cutoff(samples: &[f64], cutoff: f64) -> FilterOutcome {
    if samples.len() < MIN_SAMPLES_FOR_OUTLIER_REJECTION {
        return FilterOutcome::untouched(samples);
    }

    let Some(center) = median(samples) else {
        return FilterOutcome::untouched(samples);
    };
    let mad = median_absolute_deviation(samples, center);
    if mad == 0.0 {
        return FilterOutcome::untouched(samples);
    }

    let retained: Vec<f64> = samples
        .iter()
        .copied()
        .filter(|&x| (MODIFIED_Z_SCALE * (x - center) / mad).abs() < cutoff)
        .collect();

    if (retained.len() as f64) < samples.len() as f64 * MIN_RETAINED_FRACTION {
        return FilterOutcome { reverted: true, ..FilterOutcome::untouched(samples) };
    }

    FilterOutcome { removed: samples.len() - retained.len(), retained, reverted: false }
}

/// Median of the middle 50% of the sorted samples
///
/// Falls back to the plain median when the central slice is empty (one
/// sample).
pub fn robust_central(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let central = &sorted[n / 4..(3 * n) / 4];
    if central.is_empty() {
        Some(median_of_sorted(&sorted))
    } else {
        Some(median_of_sorted(central))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn small_batches_are_not_filtered() {
        let outcome = reject_outliers(&[-60.0, -20.0]);
        assert_eq!(outcome.retained, vec![-60.0, -20.0]);
        assert_eq!(outcome.removed, 0);
        assert!(!outcome.reverted);
    }

    #[test]
    fn single_spike_is_removed() {
        let samples = [-60.0, -61.0, -59.0, -60.0, -62.0, -58.0, -90.0];
        let outcome = reject_outliers(&samples);
        assert_eq!(outcome.removed, 1);
        assert!(!outcome.retained.contains(&-90.0));
    }

    #[test]
    fn zero_mad_skips_filtering() {
        let samples = [-70.0, -70.0, -70.0, -95.0];
        let outcome = reject_outliers(&samples);
        assert_eq!(outcome.retained.len(), 4);
    }

    #[test]
    fn over_aggressive_filter_is_reverted() {
        // At 3.5 at least half the batch always lies within one MAD, so the
        // guard only engages with a tighter cutoff.
        let samples = [-60.0, -60.0, -60.1, -80.0, -80.0, -79.9, -70.0];
        assert!(!reject_outliers(&samples).reverted);

        let outcome = reject_with_cutoff(&samples, 0.5);
        assert!(outcome.reverted);
        assert_eq!(outcome.retained, samples.to_vec());
    }

    #[test]
    fn central_value_ignores_tails() {
        let samples = [-90.0, -61.0, -60.0, -59.0, -30.0, -60.0, -62.0, -58.0];
        // sorted: -90 -62 -61 -60 -60 -59 -58 -30 → slice [2..6) = -61 -60 -60 -59
        assert_eq!(robust_central(&samples), Some(-60.0));
        assert_eq!(robust_central(&[-70.0]), Some(-70.0));
    }

    #[test]
    fn spread_measures() {
        assert_eq!(variance(&[-60.0]), 0.0);
        assert_eq!(variance(&[-60.0, -62.0]), 1.0);
        assert_eq!(range(&[-60.0, -70.0, -65.0]), 10.0);
        assert_eq!(range(&[-60.0]), 0.0);
    }
}
