//! Signal Preprocessing
//!
//! ## Overview
//!
//! Turns one collection window of raw RSSI samples into a single smoothed,
//! confidence-scored value per beacon:
//!
//! ```text
//! raw samples ─► sanitize ─► outlier filter ─► robust central ─► EMA ─► score
//!   (per beacon)  clamp to      modified z      median of        α·x + (1-α)·prev
//!                 [-100,-30]                    middle 50%
//! ```
//!
//! Smoothing needs the previous smoothed value and stability scoring needs the
//! last few smoothed values; both live in the device's tracked state and are
//! read through [`SignalMemory`]. The preprocessor itself is stateless and
//! shared by all workers.
//!
//! ## Beacons Considered
//!
//! With an explicit beacon list every listed beacon gets a reading (the
//! sentinel `-100` when nothing was heard) and unlisted beacons are ignored.
//! With an empty list, exactly the beacons present in the batch are used.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use lodestar_core::signal::{NoMemory, SignalPreprocessor};
//!
//! let pre = SignalPreprocessor::default().with_beacons(["B1", "B2"]);
//! let mut raw = BTreeMap::new();
//! raw.insert("B1".to_string(), vec![-61.0, -60.0, -59.0, -60.0, -60.0]);
//!
//! let out = pre.process(&raw, &NoMemory);
//! assert_eq!(out.readings["B1"].smoothed, -60.0);
//! assert_eq!(out.readings["B2"].smoothed, -100.0);
//! assert_eq!(out.flags.beacon_coverage, 1);
//! ```

pub mod confidence;
pub mod outliers;
pub mod stats;

use std::collections::BTreeMap;

use log::{debug, trace};
use serde::Serialize;

pub use confidence::ConfidenceBreakdown;
pub use stats::{SignalStatistics, Trend};

use crate::config::PipelineConfig;
use crate::constants::signal::{
    BEACON_COUNT_THRESHOLD, DEFAULT_MIN_SAMPLES, DEFAULT_SMOOTHING_ALPHA,
    MEDIUM_READINGS_CONFIDENCE, RSSI_MAX_DBM, RSSI_MIN_DBM, RSSI_MISSING_DBM, STABILITY_WINDOW,
    STABLE_READINGS_CONFIDENCE,
};

/// Read access to a device's smoothed RSSI memory
pub trait SignalMemory {
    /// Smoothed value from the previous cycle
    fn previous_smoothed(&self, beacon: &str) -> Option<f64>;

    /// Up to `count` most recent smoothed values, oldest first
    fn recent_smoothed(&self, beacon: &str, count: usize) -> Vec<f64>;
}

/// Memory of a device seen for the first time
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMemory;

impl SignalMemory for NoMemory {
    fn previous_smoothed(&self, _beacon: &str) -> Option<f64> {
        None
    }

    fn recent_smoothed(&self, _beacon: &str, _count: usize) -> Vec<f64> {
        Vec::new()
    }
}

/// Previous smoothed values only, no history
impl SignalMemory for BTreeMap<String, f64> {
    fn previous_smoothed(&self, beacon: &str) -> Option<f64> {
        self.get(beacon).copied()
    }

    fn recent_smoothed(&self, _beacon: &str, _count: usize) -> Vec<f64> {
        Vec::new()
    }
}

/// How a beacon's reading was produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Diagnostics {
    /// No usable samples in this window
    Missing,
    /// Samples were cleaned and scored
    Measured {
        raw_count: usize,
        /// Samples left after discarding non-finite values
        usable_count: usize,
        outliers_removed: usize,
        filter_reverted: bool,
        central: f64,
        variance: f64,
        range: f64,
        breakdown: ConfidenceBreakdown,
    },
}

/// Cleaned reading for one beacon in one cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedReading {
    /// Exponentially smoothed RSSI (dBm); `-100` when missing
    pub smoothed: f64,
    /// Reading confidence in [0, 1]
    pub confidence: f64,
    /// How the value was obtained
    pub diagnostics: Diagnostics,
}

impl CleanedReading {
    fn missing() -> Self {
        Self { smoothed: RSSI_MISSING_DBM, confidence: 0.0, diagnostics: Diagnostics::Missing }
    }

    /// No samples arrived for this beacon
    pub fn is_missing(&self) -> bool {
        matches!(self.diagnostics, Diagnostics::Missing)
    }
}

/// Batch-level quality flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityFlags {
    /// Every considered beacon delivered at least the minimum sample count
    pub sufficient_samples: bool,
    /// Overall confidence reached 0.7
    pub stable_readings: bool,
    /// Beacons whose confidence exceeded 0.3
    pub beacon_coverage: usize,
}

/// Overall verdict on one window of samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    /// Two or more beacons counted, overall confidence at least 0.7
    HighConfidence,
    /// Two or more beacons counted, overall confidence at least 0.5
    MediumConfidence,
    /// At least one beacon counted
    LowConfidence,
    /// Nothing usable
    NoValidData,
}

/// Output of one preprocessing pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedSignal {
    /// One cleaned reading per expected beacon
    pub readings: BTreeMap<String, CleanedReading>,
    /// Mean confidence of the beacons counted toward coverage, 0 if none
    pub overall_confidence: f64,
    /// Batch-level quality flags
    pub flags: QualityFlags,
    /// Overall quality band
    pub status: SignalStatus,
}

impl ProcessedSignal {
    /// Smoothed value per beacon, the localizer's input
    pub fn rssi_vector(&self) -> BTreeMap<String, f64> {
        self.readings
            .iter()
            .map(|(beacon, reading)| (beacon.clone(), reading.smoothed))
            .collect()
    }

    /// Smoothed values of beacons that actually produced samples
    pub fn measured(&self) -> impl Iterator<Item = (&str, f64)> {
        self.readings
            .iter()
            .filter(|(_, r)| !r.is_missing())
            .map(|(b, r)| (b.as_str(), r.smoothed))
    }
}

/// Stateless RSSI cleaner shared by all workers
#[derive(Debug, Clone, PartialEq)]
pub struct SignalPreprocessor {
    alpha: f64,
    min_samples: usize,
    beacons: Vec<String>,
}

impl Default for SignalPreprocessor {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_SMOOTHING_ALPHA,
            min_samples: DEFAULT_MIN_SAMPLES,
            beacons: Vec::new(),
        }
    }
}

impl SignalPreprocessor {
    /// Preprocessor using the pipeline's smoothing and sample settings
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            alpha: config.smoothing_alpha,
            min_samples: config.min_samples,
            beacons: config.beacon_ids.clone(),
        }
    }

    /// Set the smoothing weight
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the per-beacon sample minimum
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Restrict processing to a fixed beacon set
    pub fn with_beacons<I, S>(mut self, beacons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.beacons = beacons.into_iter().map(Into::into).collect();
        self
    }

    /// Beacons every batch is cleaned for
    pub fn beacons(&self) -> &[String] {
        &self.beacons
    }

    /// Clean one window of raw samples for a device
    pub fn process(
        &self,
        raw: &BTreeMap<String, Vec<f64>>,
        memory: &dyn SignalMemory,
    ) -> ProcessedSignal {
        let considered: Vec<&str> = if self.beacons.is_empty() {
            raw.keys().map(String::as_str).collect()
        } else {
            for beacon in raw.keys().filter(|b| !self.beacons.contains(*b)) {
                trace!("Ignoring unknown beacon {beacon}");
            }
            self.beacons.iter().map(String::as_str).collect()
        };

        let mut readings = BTreeMap::new();
        let mut counted = Vec::new();
        let mut sufficient_samples = true;

        for beacon in considered {
            let samples = raw.get(beacon).map(Vec::as_slice).unwrap_or(&[]);
            if samples.len() < self.min_samples {
                sufficient_samples = false;
            }

            let reading = self.clean_beacon(beacon, samples, memory);
            if reading.confidence > BEACON_COUNT_THRESHOLD {
                counted.push(reading.confidence);
            }
            readings.insert(beacon.to_string(), reading);
        }

        let overall_confidence = if counted.is_empty() {
            0.0
        } else {
            counted.iter().sum::<f64>() / counted.len() as f64
        };

        let coverage = counted.len();
        let status = if coverage >= 2 && overall_confidence >= STABLE_READINGS_CONFIDENCE {
            SignalStatus::HighConfidence
        } else if coverage >= 2 && overall_confidence >= MEDIUM_READINGS_CONFIDENCE {
            SignalStatus::MediumConfidence
        } else if coverage >= 1 {
            SignalStatus::LowConfidence
        } else {
            SignalStatus::NoValidData
        };

        debug!(
            "Preprocessed {} beacons: overall {:.3}, coverage {}, {:?}",
            readings.len(),
            overall_confidence,
            coverage,
            status
        );

        ProcessedSignal {
            readings,
            overall_confidence,
            flags: QualityFlags {
                sufficient_samples,
                stable_readings: overall_confidence >= STABLE_READINGS_CONFIDENCE,
                beacon_coverage: coverage,
            },
            status,
        }
    }

    fn clean_beacon(&self, beacon: &str, samples: &[f64], memory: &dyn SignalMemory) -> CleanedReading {
        let usable: Vec<f64> = samples
            .iter()
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(RSSI_MIN_DBM, RSSI_MAX_DBM))
            .collect();

        let filtered = outliers::reject_outliers(&usable);
        let Some(central) = outliers::robust_central(&filtered.retained) else {
            return CleanedReading::missing();
        };

        let smoothed = match memory.previous_smoothed(beacon) {
            Some(previous) => self.alpha * central + (1.0 - self.alpha) * previous,
            None => central,
        };

        let recent = memory.recent_smoothed(beacon, STABILITY_WINDOW);
        let breakdown = confidence::score(&filtered.retained, central, &recent, self.min_samples);

        CleanedReading {
            smoothed,
            confidence: breakdown.score,
            diagnostics: Diagnostics::Measured {
                raw_count: samples.len(),
                usable_count: usable.len(),
                outliers_removed: filtered.removed,
                filter_reverted: filtered.reverted,
                central,
                variance: outliers::variance(&filtered.retained),
                range: outliers::range(&filtered.retained),
                breakdown,
            },
        }
    }
}
