//! Navigation Constants

/// Fix confidence required before a path is planned and dispatched.
///
/// Deliberately below the `MEDIUM_CONFIDENCE` band: guiding a device toward
/// an exit from a plausible cell beats holding it in place.
pub const DEFAULT_ACT_CONFIDENCE: f64 = 0.4;

/// Moves sent to a device per cycle.
///
/// The next cycle re-plans from a fresh fix, so only a short prefix of the
/// full route is ever dispatched.
pub const DEFAULT_MAX_MOVES_PER_CYCLE: usize = 5;

// ===== SYNTHETIC RADIO MAP (log-distance path loss) =====

/// Reference transmit power at 1 m (dBm).
pub const PATH_LOSS_TX_POWER_DBM: f64 = -50.0;

/// Path loss exponent for cluttered indoor tunnels.
pub const PATH_LOSS_EXPONENT: f64 = 2.5;

/// Distances below this (in cells) are clamped to avoid log10(0).
pub const PATH_LOSS_MIN_DISTANCE: f64 = 0.5;

/// Base standard deviation of synthetic fingerprints (dB).
pub const SYNTHETIC_BASE_STD_DB: f64 = 2.0;

/// Samples recorded per beacon in a synthetic fingerprint.
pub const SYNTHETIC_SAMPLES: u32 = 30;
