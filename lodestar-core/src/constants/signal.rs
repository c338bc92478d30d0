//! Signal Preprocessing Constants
//!
//! Values that govern how raw BLE RSSI samples are cleaned into one
//! trustworthy reading per beacon.

// ===== RSSI RANGE =====

/// Weakest reportable RSSI (dBm).
///
/// Doubles as the sentinel for "beacon not detected". BLE radios report
/// nothing useful below this level.
pub const RSSI_MIN_DBM: f64 = -100.0;

/// Strongest accepted RSSI (dBm).
///
/// Readings above this only occur with the receiver touching the beacon.
pub const RSSI_MAX_DBM: f64 = -30.0;

/// Sentinel value emitted for a beacon that produced no samples.
pub const RSSI_MISSING_DBM: f64 = RSSI_MIN_DBM;

/// Above this a reading suggests the device is right next to the beacon.
pub const RSSI_PROXIMITY_WARN_DBM: f64 = -40.0;

/// Below this a reading is close to the receiver's detection limit.
pub const RSSI_WEAK_WARN_DBM: f64 = -95.0;

// ===== OUTLIER REJECTION =====

/// Scale factor of the modified z-score (Iglewicz & Hoaglin).
///
/// 0.6745 is the 0.75 quantile of the standard normal, which makes the
/// MAD a consistent estimator of the standard deviation.
pub const MODIFIED_Z_SCALE: f64 = 0.6745;

/// Samples with |modified z| at or above this are outliers.
pub const MODIFIED_Z_CUTOFF: f64 = 3.5;

/// Batches smaller than this are never filtered.
pub const MIN_SAMPLES_FOR_OUTLIER_REJECTION: usize = 3;

/// Filtering is discarded if it would keep less than this share of samples.
pub const MIN_RETAINED_FRACTION: f64 = 0.5;

/// Nominal outlier band around the median (dB).
///
/// Kept as a configuration value for operators; the modified z-score cut
/// is what actually rejects samples.
pub const DEFAULT_OUTLIER_THRESHOLD_DB: f64 = 15.0;

// ===== SMOOTHING =====

/// Exponential smoothing factor.
///
/// 0.3 weights the new cycle at 30%, which settles within ~3 cycles after
/// a real move while suppressing single-cycle multipath spikes.
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.3;

/// Samples per beacon below which confidence is halved.
pub const DEFAULT_MIN_SAMPLES: usize = 5;

// ===== CONFIDENCE SCORING =====

/// Sample count at which the count sub-score saturates.
pub const FULL_CONFIDENCE_SAMPLE_COUNT: f64 = 20.0;

/// Variance (dB²) at which the variance sub-score reaches zero.
pub const VARIANCE_NORMALIZER: f64 = 100.0;

/// Spread (dB) at which the range sub-score reaches zero.
///
/// A spread above 40 dB within one window usually means clipping.
pub const RANGE_NORMALIZER_DB: f64 = 40.0;

/// Weight of the sample-count sub-score.
pub const WEIGHT_COUNT: f64 = 0.3;

/// Weight of the variance sub-score.
pub const WEIGHT_VARIANCE: f64 = 0.3;

/// Weight of the range sub-score.
pub const WEIGHT_RANGE: f64 = 0.2;

/// Weight of the temporal stability sub-score.
pub const WEIGHT_STABILITY: f64 = 0.2;

/// Multiplier applied when a beacon has fewer than the minimum samples.
pub const LOW_SAMPLE_PENALTY: f64 = 0.5;

/// Number of recent smoothed values the stability score compares against.
pub const STABILITY_WINDOW: usize = 3;

/// Stability bands: (deviation below, score).
pub const STABILITY_BANDS: [(f64, f64); 3] = [(5.0, 1.0), (10.0, 0.7), (15.0, 0.4)];

/// Stability score when the deviation exceeds every band.
pub const STABILITY_FLOOR: f64 = 0.2;

/// Per-beacon confidence a beacon must exceed to count toward coverage.
pub const BEACON_COUNT_THRESHOLD: f64 = 0.3;

/// Overall confidence at which readings are flagged stable.
pub const STABLE_READINGS_CONFIDENCE: f64 = 0.7;

/// Overall confidence for a medium-quality preprocessing result.
pub const MEDIUM_READINGS_CONFIDENCE: f64 = 0.5;

/// Default preprocessing confidence below which localization is skipped.
pub const DEFAULT_MIN_SIGNAL_CONFIDENCE: f64 = 0.3;

/// Trend band (dB) for per-beacon signal statistics.
pub const TREND_BAND_DB: f64 = 1.0;
