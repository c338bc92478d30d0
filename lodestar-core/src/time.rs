//! Time management for the gateway
//!
//! Device timestamps arrive in whatever format the tracked device's firmware
//! produces and are passed through untouched. Everything the core itself
//! reasons about (movement history, staleness sweeps) uses the gateway's own
//! clock, provided through [`TimeSource`] so tests can pin it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Timestamp in milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Source of time for the pipeline
pub trait TimeSource: Send + Sync {
    /// Current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Whether this source provides wall clock time (vs a test clock)
    fn is_wall_clock(&self) -> bool;
}

/// Wall clock time source
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Manually driven clock for tests and replays
///
/// Shared by reference, so advancing it is visible to every pipeline that
/// holds it.
#[derive(Debug, Default)]
pub struct FixedTime {
    timestamp: AtomicU64,
}

impl FixedTime {
    /// Clock stopped at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: AtomicU64::new(timestamp),
        }
    }

    /// Jump to `timestamp`
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.store(timestamp, Ordering::SeqCst);
    }

    /// Move forward by `ms` milliseconds
    pub fn advance(&self, ms: u64) {
        self.timestamp.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp.load(Ordering::SeqCst)
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Milliseconds elapsed from `earlier` to `later`, zero if the clock went backwards
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}
