//! Fingerprint Localization Constants

/// Detected beacons required before a fix is attempted.
///
/// One beacon only constrains the device to a ring around it.
pub const MIN_BEACONS_FOR_FIX: usize = 2;

/// Likelihood factor for a beacon that is absent from the reading or the cell.
pub const MISSING_BEACON_LIKELIHOOD: f64 = 0.01;

/// Lower bound on a Gaussian density factor.
///
/// Prevents one wild beacon from zeroing a cell's whole likelihood.
pub const DENSITY_FLOOR: f64 = 1e-10;

/// Floor on a cell's log-likelihood relative to the best cell.
///
/// `e^-700` is still a normal `f64`, so no cell's probability reaches 0.
pub const MIN_RELATIVE_LOG_LIKELIHOOD: f64 = -700.0;

/// Default confidence for `HIGH_CONFIDENCE` fixes.
pub const DEFAULT_LOCATION_CONFIDENCE: f64 = 0.7;

/// Best/second-best ratio required for `HIGH_CONFIDENCE`.
pub const HIGH_DISCRIMINATION_RATIO: f64 = 2.0;

/// Confidence for `MEDIUM_CONFIDENCE` fixes.
pub const MEDIUM_LOCATION_CONFIDENCE: f64 = 0.5;

/// Confidence for `LOW_CONFIDENCE` fixes; below this a fix is invalid.
pub const VALID_FIX_CONFIDENCE: f64 = 0.3;

/// Candidates kept for diagnostics.
pub const TOP_CANDIDATES: usize = 3;
