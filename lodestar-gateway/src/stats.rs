//! Processing statistics
//!
//! Lock-free counters shared by every worker. Read them through
//! [`GatewayStats::snapshot`]; individual loads are relaxed, so a snapshot
//! taken while workers run can be off by the messages in flight.

use std::sync::atomic::{AtomicU64, Ordering};

use lodestar_core::{NavigationOutcome, PlanDecision};
use serde::Serialize;

#[derive(Debug, Default)]
pub struct GatewayStats {
    received: AtomicU64,
    processed: AtomicU64,
    rejected: AtomicU64,
    localization_failures: AtomicU64,
    holds: AtomicU64,
    paths_planned: AtomicU64,
    no_path: AtomicU64,
    sink_failures: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub processed: u64,
    /// Malformed payloads dropped at the boundary
    pub rejected: u64,
    pub localization_failures: u64,
    pub holds: u64,
    pub paths_planned: u64,
    pub no_path: u64,
    pub sink_failures: u64,
}

impl StatsSnapshot {
    /// Every received payload has been either processed or rejected
    pub fn is_settled(&self) -> bool {
        self.received == self.processed + self.rejected
    }
}

impl GatewayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a pipeline outcome under its decision
    pub fn record_outcome(&self, outcome: &NavigationOutcome) {
        let counter = match outcome.decision {
            PlanDecision::Navigate => &self.paths_planned,
            PlanDecision::Hold => &self.holds,
            PlanDecision::NoPath => &self.no_path,
            PlanDecision::Failed => &self.localization_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            localization_failures: self.localization_failures.load(Ordering::Relaxed),
            holds: self.holds.load(Ordering::Relaxed),
            paths_planned: self.paths_planned.load(Ordering::Relaxed),
            no_path: self.no_path.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
        }
    }
}
