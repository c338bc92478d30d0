//! Pipeline Configuration
//!
//! Every field has a documented default (see [`crate::constants`]), so a
//! configuration file only needs to name what it changes:
//!
//! ```json
//! { "act_confidence_threshold": 0.5, "max_moves_per_cycle": 3 }
//! ```
//!
//! | Field | Default | Meaning |
//! |-------|---------|---------|
//! | `smoothing_alpha` | 0.3 | EMA weight of the newest central value |
//! | `outlier_threshold_db` | 15.0 | Informational outlier band (z-score cut is 3.5) |
//! | `min_samples` | 5 | Samples per beacon before the confidence penalty lifts |
//! | `history_len` | 10 | Smoothed values kept per beacon |
//! | `location_confidence_threshold` | 0.7 | Confidence for `HIGH_CONFIDENCE` |
//! | `act_confidence_threshold` | 0.4 | Fix confidence needed to plan and dispatch moves |
//! | `min_signal_confidence` | 0.3 | Overall signal confidence needed to localize |
//! | `max_moves_per_cycle` | 5 | Moves dispatched per message |
//! | `low_confidence_limit` | 3 | Consecutive weak fixes before `Error` |
//! | `default_heading` | `N` | Facing of a newly seen device |
//! | `beacon_ids` | `[]` | Expected beacons; empty means the radio map's |

use serde::{Deserialize, Serialize};

use crate::constants::localization::DEFAULT_LOCATION_CONFIDENCE;
use crate::constants::navigation::{DEFAULT_ACT_CONFIDENCE, DEFAULT_MAX_MOVES_PER_CYCLE};
use crate::constants::signal::{
    DEFAULT_MIN_SAMPLES, DEFAULT_MIN_SIGNAL_CONFIDENCE, DEFAULT_OUTLIER_THRESHOLD_DB,
    DEFAULT_SMOOTHING_ALPHA,
};
use crate::constants::tracking::{LOW_CONFIDENCE_LIMIT, SIGNAL_HISTORY_LEN};
use crate::errors::{CoreResult, NavError};
use crate::moves::Heading;

/// Tunables of the per-message navigation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Weight of the newest value in exponential smoothing
    pub smoothing_alpha: f64,
    /// Informational outlier band in dB; filtering uses the modified z-score
    pub outlier_threshold_db: f64,
    /// Samples per beacon below which confidence is halved
    pub min_samples: usize,
    /// Smoothed values kept per beacon for stability scoring
    pub history_len: usize,
    /// Fix confidence needed for `HIGH_CONFIDENCE`
    pub location_confidence_threshold: f64,
    /// Fix confidence needed before a route is planned
    pub act_confidence_threshold: f64,
    /// Overall signal confidence below which localization is skipped
    pub min_signal_confidence: f64,
    /// Moves dispatched per message
    pub max_moves_per_cycle: usize,
    /// Weak fixes in a row that put a device in `Error`
    pub low_confidence_limit: u32,
    /// Facing assumed for a device seen for the first time
    pub default_heading: Heading,
    /// Expected beacons; empty means the radio map's beacons
    pub beacon_ids: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            outlier_threshold_db: DEFAULT_OUTLIER_THRESHOLD_DB,
            min_samples: DEFAULT_MIN_SAMPLES,
            history_len: SIGNAL_HISTORY_LEN,
            location_confidence_threshold: DEFAULT_LOCATION_CONFIDENCE,
            act_confidence_threshold: DEFAULT_ACT_CONFIDENCE,
            min_signal_confidence: DEFAULT_MIN_SIGNAL_CONFIDENCE,
            max_moves_per_cycle: DEFAULT_MAX_MOVES_PER_CYCLE,
            low_confidence_limit: LOW_CONFIDENCE_LIMIT,
            default_heading: Heading::North,
            beacon_ids: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Set the smoothing weight
    pub fn with_smoothing_alpha(mut self, alpha: f64) -> Self {
        self.smoothing_alpha = alpha;
        self
    }

    /// Set the per-beacon sample minimum
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Set the per-beacon history length
    pub fn with_history_len(mut self, len: usize) -> Self {
        self.history_len = len;
        self
    }

    /// Set the confidence needed to act on a fix
    pub fn with_act_confidence(mut self, threshold: f64) -> Self {
        self.act_confidence_threshold = threshold;
        self
    }

    /// Set the confidence needed for `HIGH_CONFIDENCE`
    pub fn with_location_confidence(mut self, threshold: f64) -> Self {
        self.location_confidence_threshold = threshold;
        self
    }

    /// Set the minimum overall signal confidence
    pub fn with_min_signal_confidence(mut self, threshold: f64) -> Self {
        self.min_signal_confidence = threshold;
        self
    }

    /// Set how many moves one message dispatches
    pub fn with_max_moves(mut self, max_moves: usize) -> Self {
        self.max_moves_per_cycle = max_moves;
        self
    }

    /// Set the weak-fix streak that raises `Error`
    pub fn with_low_confidence_limit(mut self, limit: u32) -> Self {
        self.low_confidence_limit = limit;
        self
    }

    /// Set the initial facing of new devices
    pub fn with_default_heading(mut self, heading: Heading) -> Self {
        self.default_heading = heading;
        self
    }

    /// Restrict preprocessing to these beacons
    pub fn with_beacons<I, S>(mut self, beacons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.beacon_ids = beacons.into_iter().map(Into::into).collect();
        self
    }

    /// Check every field is in range
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(NavError::invalid_config(format!(
                "smoothing_alpha must be in (0, 1], got {}",
                self.smoothing_alpha
            )));
        }
        if !(self.outlier_threshold_db.is_finite() && self.outlier_threshold_db > 0.0) {
            return Err(NavError::invalid_config(format!(
                "outlier_threshold_db must be positive, got {}",
                self.outlier_threshold_db
            )));
        }
        if self.history_len == 0 {
            return Err(NavError::invalid_config("history_len must be at least 1"));
        }
        if self.low_confidence_limit == 0 {
            return Err(NavError::invalid_config("low_confidence_limit must be at least 1"));
        }

        for (name, value) in [
            ("location_confidence_threshold", self.location_confidence_threshold),
            ("act_confidence_threshold", self.act_confidence_threshold),
            ("min_signal_confidence", self.min_signal_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(NavError::invalid_config(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }

        if self.beacon_ids.iter().any(|b| b.trim().is_empty()) {
            return Err(NavError::invalid_config("beacon_ids contains an empty id"));
        }
        Ok(())
    }
}
