//! Per-beacon reading confidence
//!
//! ## Scoring Model
//!
//! Four sub-scores, each normalized to [0, 1], are blended with fixed
//! weights:
//!
//! | Component | Formula | Weight |
//! |-----------|---------|--------|
//! | count | `min(1, n / 20)` | 0.3 |
//! | variance | `max(0, 1 - var / 100)` | 0.3 |
//! | range | `max(0, 1 - (max - min) / 40)` | 0.2 |
//! | stability | deviation from recent smoothed history, banded | 0.2 |
//!
//! Stability bands: deviation < 5 dB → 1.0, < 10 → 0.7, < 15 → 0.4, else
//! 0.2. A beacon with no history is considered stable.
//!
//! Batches under the configured minimum sample count have the blended score
//! halved.

use serde::Serialize;

use super::outliers;
use crate::constants::signal::{
    FULL_CONFIDENCE_SAMPLE_COUNT, LOW_SAMPLE_PENALTY, RANGE_NORMALIZER_DB, STABILITY_BANDS,
    STABILITY_FLOOR, VARIANCE_NORMALIZER, WEIGHT_COUNT, WEIGHT_RANGE, WEIGHT_STABILITY,
    WEIGHT_VARIANCE,
};

/// Sub-scores and the blended confidence of one beacon reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceBreakdown {
    /// Sample count score
    pub count: f64,
    /// Variance score
    pub variance: f64,
    /// Min/max spread score
    pub range: f64,
    /// Agreement with recent history
    pub stability: f64,
    /// The low-sample penalty was applied
    pub penalized: bool,
    /// Weighted blend, clamped to [0, 1]
    pub score: f64,
}

/// Stability sub-score for `central` against recent smoothed values
pub fn stability_score(central: f64, recent: &[f64]) -> f64 {
    if recent.is_empty() {
        return 1.0;
    }
    let mean = recent.iter().sum::<f64>() / recent.len() as f64;
    let deviation = (central - mean).abs();

    STABILITY_BANDS
        .iter()
        .find(|(limit, _)| deviation < *limit)
        .map(|(_, score)| *score)
        .unwrap_or(STABILITY_FLOOR)
}

/// Score a cleaned batch
///
/// `recent` holds up to the last few smoothed values for this beacon, oldest
/// first.
pub fn score(samples: &[f64], central: f64, recent: &[f64], min_samples: usize) -> ConfidenceBreakdown {
    let n = samples.len();
    let count = (n as f64 / FULL_CONFIDENCE_SAMPLE_COUNT).min(1.0);
    let variance = (1.0 - outliers::variance(samples) / VARIANCE_NORMALIZER).max(0.0);
    let range = (1.0 - outliers::range(samples) / RANGE_NORMALIZER_DB).max(0.0);
    let stability = stability_score(central, recent);

    let mut blended = count * WEIGHT_COUNT
        + variance * WEIGHT_VARIANCE
        + range * WEIGHT_RANGE
        + stability * WEIGHT_STABILITY;

    let penalized = n < min_samples;
    if penalized {
        blended *= LOW_SAMPLE_PENALTY;
    }

    ConfidenceBreakdown {
        count,
        variance,
        range,
        stability,
        penalized,
        score: blended.clamp(0.0, 1.0),
    }
}
