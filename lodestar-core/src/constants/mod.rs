//! Constants for Lodestar Core
//!
//! This module provides centralized, documented constants used throughout
//! the navigation core. Every tunable default lives here together with the
//! reason it has the value it has.
//!
//! ## Organization
//!
//! Constants are grouped by domain:
//! - **Signal**: RSSI range, outlier rejection and confidence scoring
//! - **Localization**: fingerprint matching probabilities and status bands
//! - **Tracking**: device state machine thresholds and history sizes
//! - **Navigation**: move dispatch limits and the synthetic path-loss model
//!
//! ## Usage Guidelines
//!
//! 1. Use these constants instead of magic numbers
//! 2. Configurable values are defaults for `PipelineConfig`, not hard limits
//! 3. Include units in names where a unit exists (`_DBM`, `_MS`)

/// RSSI limits, outlier rejection, smoothing and confidence scoring.
pub mod signal;

/// Fingerprint localization parameters and confidence bands.
pub mod localization;

/// Device tracking thresholds and history sizes.
pub mod tracking;

/// Move dispatch and radio propagation model parameters.
pub mod navigation;

pub use signal::{
    RSSI_MIN_DBM, RSSI_MAX_DBM, RSSI_MISSING_DBM,
    DEFAULT_SMOOTHING_ALPHA, DEFAULT_MIN_SAMPLES, BEACON_COUNT_THRESHOLD,
};

pub use localization::{
    MIN_BEACONS_FOR_FIX, MISSING_BEACON_LIKELIHOOD, DENSITY_FLOOR,
    DEFAULT_LOCATION_CONFIDENCE, VALID_FIX_CONFIDENCE,
};

pub use tracking::{
    MOVEMENT_HISTORY_LEN, SIGNAL_HISTORY_LEN, LOW_CONFIDENCE_LIMIT,
    HEALTHY_FIX_CONFIDENCE, DEFAULT_OFFLINE_AFTER_MS,
};

pub use navigation::{DEFAULT_ACT_CONFIDENCE, DEFAULT_MAX_MOVES_PER_CYCLE};
