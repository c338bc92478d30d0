//! Per-Message Navigation Pipeline
//!
//! ## Overview
//!
//! One inbound reading flows through every core component and leaves as a
//! [`NavigationOutcome`]:
//!
//! ```text
//! DeviceReading
//!     │
//!     ▼
//! SignalPreprocessor ──► FingerprintLocalizer ──► gate ──► PathSolver ──► MoveSequencer
//!     ▲    (smoothed RSSI)        (fix)             │        (path)          (moves)
//!     │                                             │                           │
//!     └──────────── DeviceState (per-device lock) ◄─┴───────────────────────────┘
//! ```
//!
//! The whole sequence for one message runs under that device's lock, so two
//! messages for the same device never interleave. Nothing in it performs
//! I/O; handing the outcome to transport or storage happens after the lock is
//! released.
//!
//! ## Decisions
//!
//! | Situation | Decision | State effect |
//! |-----------|----------|--------------|
//! | no radio map, weak signal, < 2 beacons, no match | `Failed` | smoothed RSSI only |
//! | fix below 0.3 (invalid) | `Hold` | low-confidence streak + 1 |
//! | valid fix below the act threshold (0.4) | `Hold` | fix recorded, queue untouched |
//! | fix good enough, no route to an exit | `NoPath` | fix recorded, queue cleared |
//! | fix good enough, route found | `Navigate` | fix recorded, queue replaced, first batch dispatched |
//!
//! After dispatching, the stored heading is the one the device faces once it
//! has executed exactly the dispatched moves.

use std::sync::Arc;

use log::{debug, error, warn};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::constants::localization::MIN_BEACONS_FOR_FIX;
use crate::device::{DeviceId, DeviceReading};
use crate::errors::CoreResult;
use crate::grid::GridTopology;
use crate::localization::{Candidate, FailureReason, FingerprintLocalizer, LocationEstimate};
use crate::moves::{Heading, MoveCommand, MoveSequencer};
use crate::radiomap::RadioMap;
use crate::signal::{ProcessedSignal, SignalPreprocessor};
use crate::solver::{Path, PathSolver};
use crate::time::Timestamp;
use crate::tracker::{DeviceState, DeviceStateTracker, DeviceStatus};

/// What the pipeline decided to do with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanDecision {
    /// A route was planned and moves dispatched
    Navigate,
    /// The fix is not trustworthy enough to act on
    Hold,
    /// Located, but no exit is reachable
    NoPath,
    /// No location could be estimated
    Failed,
}

/// Everything produced for one message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationOutcome {
    /// Device the message came from
    pub device_id: DeviceId,
    /// Preprocessed signal of this message
    pub signal: ProcessedSignal,
    /// Location estimate
    pub estimate: LocationEstimate,
    /// Planned route; empty unless the decision is `Navigate`
    pub path: Path,
    /// What the pipeline did with the estimate
    pub decision: PlanDecision,
    /// Moves handed to the device this cycle
    pub dispatched: Vec<MoveCommand>,
    /// Facing after the dispatched moves
    pub heading: Heading,
    /// Device status after this message
    pub device_status: DeviceStatus,
    /// Clock time the message was processed
    pub processed_at: Timestamp,
}

impl NavigationOutcome {
    /// Route length in hops, 0 without a route
    pub fn path_length(&self) -> usize {
        self.path.hops()
    }

    /// Best cell, if localization succeeded
    pub fn location(&self) -> Option<&Candidate> {
        self.estimate.best.as_ref()
    }
}

/// Shared, immutable pipeline; one instance serves every worker
#[derive(Debug)]
pub struct NavigationPipeline {
    config: PipelineConfig,
    grid: Arc<GridTopology>,
    localizer: Option<FingerprintLocalizer>,
    preprocessor: SignalPreprocessor,
    tracker: Arc<DeviceStateTracker>,
}

impl NavigationPipeline {
    /// Pipeline with a radio map
    ///
    /// Fails if the configuration is out of range or the map has cells
    /// outside the grid.
    pub fn new(
        config: PipelineConfig,
        grid: Arc<GridTopology>,
        map: Arc<RadioMap>,
        tracker: Arc<DeviceStateTracker>,
    ) -> CoreResult<Self> {
        config.validate()?;
        map.validate_against(&grid)?;

        let beacons = if config.beacon_ids.is_empty() {
            map.beacon_ids().to_vec()
        } else {
            config.beacon_ids.clone()
        };
        let preprocessor = SignalPreprocessor::from_config(&config).with_beacons(beacons);
        let localizer = FingerprintLocalizer::new(map)
            .with_confidence_threshold(config.location_confidence_threshold);

        Ok(Self { config, grid, localizer: Some(localizer), preprocessor, tracker })
    }

    /// Pipeline without a radio map: every message fails localization
    pub fn degraded(
        config: PipelineConfig,
        grid: Arc<GridTopology>,
        tracker: Arc<DeviceStateTracker>,
    ) -> CoreResult<Self> {
        config.validate()?;
        warn!("Navigation pipeline running without a radio map");
        let preprocessor = SignalPreprocessor::from_config(&config);
        Ok(Self { config, grid, localizer: None, preprocessor, tracker })
    }

    /// Running without a radio map
    pub fn is_degraded(&self) -> bool {
        self.localizer.is_none()
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Floor plan routes are planned on
    pub fn grid(&self) -> &GridTopology {
        &self.grid
    }

    /// Shared device state
    pub fn tracker(&self) -> &Arc<DeviceStateTracker> {
        &self.tracker
    }

    /// Loaded radio map, `None` when degraded
    pub fn radio_map(&self) -> Option<&RadioMap> {
        self.localizer.as_ref().map(FingerprintLocalizer::radio_map)
    }

    /// Run one reading through the whole pipeline
    pub fn process(&self, reading: &DeviceReading) -> NavigationOutcome {
        let now = self.tracker.now();
        self.tracker
            .with_device(&reading.device_id, |state| self.process_locked(reading, state, now))
    }

    fn process_locked(
        &self,
        reading: &DeviceReading,
        state: &mut DeviceState,
        now: Timestamp,
    ) -> NavigationOutcome {
        let id = &reading.device_id;
        state.touch(now, reading.sample_count());

        let signal = self.preprocessor.process(&reading.samples, &*state);
        state.update_signal(&signal);

        let estimate = self.localize(&signal);
        debug!(
            "Device {id}: signal {:.3} ({:?}), fix {} at {:?}",
            signal.overall_confidence,
            signal.status,
            estimate.status,
            estimate.cell_id()
        );
        for warning in &estimate.warnings {
            warn!("Device {id}: {warning}");
        }

        let mut path = Path::none();
        let mut dispatched = Vec::new();

        let decision = match estimate.cell() {
            None => {
                warn!("Device {id}: localization failed ({:?})", estimate.failure);
                PlanDecision::Failed
            }
            Some(_) if !estimate.valid => {
                state.record_low_confidence(self.tracker.low_confidence_limit());
                warn!("Device {id}: fix too uncertain ({:.3}), holding", estimate.confidence);
                PlanDecision::Hold
            }
            Some(cell) => {
                state.record_fix(cell, estimate.confidence, now, self.tracker.low_confidence_limit());

                if estimate.confidence < self.config.act_confidence_threshold {
                    warn!(
                        "Device {id}: confidence {:.3} below {:.2}, holding",
                        estimate.confidence, self.config.act_confidence_threshold
                    );
                    PlanDecision::Hold
                } else {
                    let planned = PathSolver::new(&self.grid).solve(cell);
                    match MoveSequencer::sequence(&planned, state.orientation()) {
                        Ok(_) if planned.is_empty() => {
                            warn!("Device {id}: no path to an exit from ({}, {})", cell.x, cell.y);
                            state.set_instructions(Vec::new());
                            PlanDecision::NoPath
                        }
                        Ok(sequence) => {
                            state.set_instructions(sequence.commands);
                            dispatched = state.take_batch(self.config.max_moves_per_cycle);
                            let heading = MoveSequencer::heading_after(&dispatched, state.orientation());
                            state.set_orientation(heading);
                            debug!(
                                "Device {id}: {} hops to exit {:?}, dispatching {}",
                                planned.hops(),
                                planned.exit(),
                                dispatched.len()
                            );
                            path = planned;
                            PlanDecision::Navigate
                        }
                        Err(err) => {
                            error!("Device {id}: planned path is not walkable: {err}");
                            state.set_instructions(Vec::new());
                            PlanDecision::NoPath
                        }
                    }
                }
            }
        };

        NavigationOutcome {
            device_id: id.clone(),
            signal,
            estimate,
            path,
            decision,
            dispatched,
            heading: state.orientation(),
            device_status: state.status(),
            processed_at: now,
        }
    }

    fn localize(&self, signal: &ProcessedSignal) -> LocationEstimate {
        let heard = signal.measured().count();
        let Some(localizer) = &self.localizer else {
            return LocationEstimate::failed(FailureReason::RadioMapUnavailable, heard);
        };

        if heard >= MIN_BEACONS_FOR_FIX && signal.overall_confidence < self.config.min_signal_confidence {
            return LocationEstimate::failed(FailureReason::WeakSignal, heard);
        }
        localizer.locate(&signal.rssi_vector())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use crate::radiomap::{BeaconStats, Fingerprint};
    use crate::time::FixedTime;
    use std::collections::BTreeMap;

    /// 3x3 room, exit top-right; map cells at (0,0) and (2,0)
    fn setup(config: PipelineConfig) -> NavigationPipeline {
        let grid = Arc::new(GridTopology::from_rows(&["..E", "...", "..."]).unwrap());
        let s = |m| BeaconStats::new(m, 2.0, 30);
        let map = RadioMap::new(
            vec![
                Fingerprint::new("0,0", Cell::new(0, 0)).with_beacon("B1", s(-50.0)).with_beacon("B2", s(-80.0)),
                Fingerprint::new("2,0", Cell::new(2, 0)).with_beacon("B1", s(-80.0)).with_beacon("B2", s(-50.0)),
            ],
            BTreeMap::new(),
            1.0,
        )
        .unwrap();
        let tracker = Arc::new(DeviceStateTracker::new(&config, Arc::new(FixedTime::new(42))));
        NavigationPipeline::new(config, grid, Arc::new(map), tracker).unwrap()
    }

    fn reading(b1: &[f64], b2: &[f64]) -> DeviceReading {
        DeviceReading::new(DeviceId::parse("M01").unwrap())
            .with_samples("B1", b1.iter().copied())
            .with_samples("B2", b2.iter().copied())
    }

    #[test]
    fn confident_fix_plans_and_dispatches() {
        let pipeline = setup(PipelineConfig::default());
        let out = pipeline.process(&reading(&[-50.0; 10], &[-80.0; 10]));

        assert_eq!(out.decision, PlanDecision::Navigate);
        assert_eq!(out.estimate.cell_id(), Some("0,0"));
        assert_eq!(out.path_length(), 4);
        // Facing north from (0,0): F F R F F
        assert_eq!(out.dispatched.len(), 5);
        assert_eq!(out.heading, Heading::East);
        assert_eq!(out.device_status, DeviceStatus::Active);
        assert_eq!(out.processed_at, 42);
    }

    #[test]
    fn dispatch_is_truncated_to_move_limit() {
        let pipeline = setup(PipelineConfig::default().with_max_moves(2));
        let out = pipeline.process(&reading(&[-50.0; 10], &[-80.0; 10]));

        assert_eq!(out.dispatched, vec![MoveCommand::Forward, MoveCommand::Forward]);
        assert_eq!(out.heading, Heading::North);

        let id = DeviceId::parse("M01").unwrap();
        assert_eq!(pipeline.tracker().pending_instructions(&id).len(), 3);
        assert_eq!(pipeline.tracker().get(&id).unwrap().orientation(), Heading::North);
    }

    #[test]
    fn single_beacon_fails_without_moving() {
        let pipeline = setup(PipelineConfig::default());
        let out = pipeline.process(&reading(&[-50.0; 10], &[]));

        assert_eq!(out.decision, PlanDecision::Failed);
        assert_eq!(out.estimate.failure, Some(FailureReason::InsufficientBeacons));
        assert_eq!(out.estimate.confidence, 0.0);
        assert!(out.dispatched.is_empty());
        assert_eq!(out.device_status, DeviceStatus::Inactive);

        let id = DeviceId::parse("M01").unwrap();
        let state = pipeline.tracker().get(&id).unwrap();
        assert_eq!(state.current_location(), None);
        assert_eq!(state.smoothed_rssi()["B1"], -50.0);
    }

    #[test]
    fn fix_on_a_wall_has_no_path() {
        // Fingerprint recorded over a wall
        let grid = Arc::new(GridTopology::from_rows(&["E#"]).unwrap());
        let map = RadioMap::new(
            vec![
                Fingerprint::new("1,0", Cell::new(1, 0))
                    .with_beacon("B1", BeaconStats::new(-50.0, 2.0, 1))
                    .with_beacon("B2", BeaconStats::new(-50.0, 2.0, 1)),
            ],
            BTreeMap::new(),
            1.0,
        )
        .unwrap();
        let config = PipelineConfig::default();
        let tracker = Arc::new(DeviceStateTracker::new(&config, Arc::new(FixedTime::new(0))));
        let pipeline = NavigationPipeline::new(config, grid, Arc::new(map), tracker).unwrap();

        let out = pipeline.process(&reading(&[-50.0; 10], &[-50.0; 10]));
        assert_eq!(out.decision, PlanDecision::NoPath);
        assert!(out.path.is_empty());
        assert_eq!(out.path_length(), 0);
    }

    #[test]
    fn degraded_pipeline_reports_unavailable_map() {
        let config = PipelineConfig::default();
        let tracker = Arc::new(DeviceStateTracker::new(&config, Arc::new(FixedTime::new(0))));
        let pipeline =
            NavigationPipeline::degraded(config, Arc::new(GridTopology::default_floor_plan()), tracker)
                .unwrap();

        assert!(pipeline.is_degraded());
        let out = pipeline.process(&reading(&[-50.0; 10], &[-80.0; 10]));
        assert_eq!(out.estimate.failure, Some(FailureReason::RadioMapUnavailable));
        assert_eq!(out.decision, PlanDecision::Failed);
    }

    #[test]
    fn map_outside_grid_is_rejected() {
        let grid = Arc::new(GridTopology::from_rows(&["E"]).unwrap());
        let map = RadioMap::new(
            vec![Fingerprint::new("3,3", Cell::new(3, 3)).with_beacon("B1", BeaconStats::new(-50.0, 2.0, 1))],
            BTreeMap::new(),
            1.0,
        )
        .unwrap();
        let config = PipelineConfig::default();
        let tracker = Arc::new(DeviceStateTracker::new(&config, Arc::new(FixedTime::new(0))));
        assert!(NavigationPipeline::new(config, grid, Arc::new(map), tracker).is_err());
    }
}
