//! Device Tracking Constants

/// Positions kept in each device's movement history ring.
pub const MOVEMENT_HISTORY_LEN: usize = 10;

/// Smoothed RSSI values kept per beacon for stability scoring and statistics.
pub const SIGNAL_HISTORY_LEN: usize = 10;

/// Consecutive low-confidence fixes that put a device into `Error`.
pub const LOW_CONFIDENCE_LIMIT: u32 = 3;

/// Fix confidence that counts as healthy and clears the low-confidence streak.
pub const HEALTHY_FIX_CONFIDENCE: f64 = 0.5;

/// Default age (ms) after which a silent device is swept to `Offline`.
pub const DEFAULT_OFFLINE_AFTER_MS: u64 = 30_000;
