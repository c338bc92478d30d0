//! Core navigation engine for Lodestar
//!
//! Turns noisy BLE signal strength readings from wearable devices into a
//! location on a floor plan and a short list of moves toward the nearest exit.
//!
//! Key constraints:
//! - No I/O: transport and storage live in the gateway crate
//! - Per-device state is serialized, different devices run in parallel
//! - Every inbound message produces an outcome, even when localization fails
//!
//! ```no_run
//! use std::sync::Arc;
//! use lodestar_core::{
//!     DeviceId, DeviceReading, DeviceStateTracker, GridTopology, NavigationPipeline,
//!     PipelineConfig, RadioMap, SystemTime,
//! };
//!
//! let config = PipelineConfig::default();
//! let grid = Arc::new(GridTopology::default_floor_plan());
//! let map = RadioMap::synthetic(&grid, &RadioMap::default_beacon_positions(), 7)?;
//! let tracker = Arc::new(DeviceStateTracker::new(&config, Arc::new(SystemTime)));
//! let pipeline = NavigationPipeline::new(config, grid, Arc::new(map), tracker)?;
//!
//! let reading = DeviceReading::new(DeviceId::parse("M01")?)
//!     .with_samples("B1", [-62.0, -61.5, -63.0])
//!     .with_samples("B2", [-78.0, -80.5, -79.0]);
//! let outcome = pipeline.process(&reading);
//! println!("{:?} -> {:?}", outcome.decision, outcome.dispatched);
//! # Ok::<(), lodestar_core::NavError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod config;
pub mod constants;
pub mod device;
pub mod errors;
pub mod grid;
pub mod localization;
pub mod moves;
pub mod pipeline;
pub mod radiomap;
pub mod signal;
pub mod solver;
pub mod time;
pub mod tracker;

// Public API
pub use config::PipelineConfig;
pub use device::{DeviceId, DeviceReading};
pub use errors::{CoreResult, NavError};
pub use grid::{Cell, CellKind, GridTopology};
pub use localization::{
    Candidate, FailureReason, FingerprintLocalizer, LocationEstimate, LocationStatus,
};
pub use moves::{Heading, MoveCommand, MoveSequence, MoveSequencer};
pub use pipeline::{NavigationOutcome, NavigationPipeline, PlanDecision};
pub use radiomap::{BeaconStats, Fingerprint, RadioMap};
pub use signal::{ProcessedSignal, SignalPreprocessor, SignalStatus};
pub use solver::{Path, PathSolver};
pub use time::{FixedTime, SystemTime, TimeSource, Timestamp};
pub use tracker::{DeviceState, DeviceStateTracker, DeviceStatus, FleetSnapshot};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
