//! Reference Radio Map
//!
//! ## Overview
//!
//! A radio map is the surveyed "fingerprint" of the floor: for every
//! reference cell, the mean and standard deviation of the RSSI each beacon
//! produced there. It is built once at startup, validated, and then shared
//! read-only (behind an `Arc`) by every worker.
//!
//! ```text
//! "3,7" ─┬─ B1: mean -71.2, std 2.4, 30 samples
//!        ├─ B2: mean -78.9, std 2.1, 30 samples
//!        └─ B3: mean -55.0, std 2.8, 30 samples
//! ```
//!
//! ## Invariants
//!
//! - At least one cell
//! - Cell coordinates are unique
//! - Every mean is finite, every standard deviation finite and `>= 0`
//! - Cell coordinates lie inside the grid (checked by
//!   [`RadioMap::validate_against`] once a grid is known)
//!
//! ## Synthetic Maps
//!
//! Without a survey, [`RadioMap::synthetic`] predicts each cell's mean from
//! the log-distance path-loss model
//!
//! ```text
//! rssi(d) = P_tx - 10 · n · log10(max(d, 0.5))     P_tx = -50 dBm, n = 2.5
//! ```
//!
//! with a per-entry standard deviation of `2 + U(0, 1)` dB drawn from a
//! seeded RNG, so the same seed always yields the same map.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::navigation::{
    PATH_LOSS_EXPONENT, PATH_LOSS_MIN_DISTANCE, PATH_LOSS_TX_POWER_DBM, SYNTHETIC_BASE_STD_DB,
    SYNTHETIC_SAMPLES,
};
use crate::errors::{CoreResult, NavError};
use crate::grid::{Cell, GridTopology};

/// Recorded signal statistics of one beacon at one cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeaconStats {
    /// Mean RSSI (dBm)
    pub mean: f64,
    /// Standard deviation (dB)
    pub std: f64,
    /// Number of survey samples behind the statistics
    #[serde(default)]
    pub samples: u32,
}

impl BeaconStats {
    /// Statistics from `samples` readings
    pub fn new(mean: f64, std: f64, samples: u32) -> Self {
        Self { mean, std, samples }
    }
}

/// One reference cell and its per-beacon statistics
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    /// Map key, `"x,y"`
    pub cell_id: String,
    /// Cell address
    pub cell: Cell,
    /// Per-beacon statistics surveyed in this cell
    pub beacon_stats: BTreeMap<String, BeaconStats>,
}

impl Fingerprint {
    /// Fingerprint with no beacon statistics yet
    pub fn new(cell_id: impl Into<String>, cell: Cell) -> Self {
        Self { cell_id: cell_id.into(), cell, beacon_stats: BTreeMap::new() }
    }

    /// Add statistics for one beacon
    pub fn with_beacon(mut self, beacon: impl Into<String>, stats: BeaconStats) -> Self {
        self.beacon_stats.insert(beacon.into(), stats);
        self
    }
}

/// Per-beacon view of one cell, for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellCoverage {
    /// Map key of the cell
    pub cell_id: String,
    /// Cell column
    pub x: i32,
    /// Cell row
    pub y: i32,
    /// Every map beacon; `None` where the cell has no statistics for it
    pub beacons: BTreeMap<String, Option<BeaconStats>>,
}

/// Immutable, validated reference map
#[derive(Debug, Clone, PartialEq)]
pub struct RadioMap {
    cells: BTreeMap<String, Fingerprint>,
    beacon_positions: BTreeMap<String, (f64, f64)>,
    beacon_ids: Vec<String>,
    grid_resolution: f64,
}

impl RadioMap {
    /// Validate and assemble a map
    pub fn new(
        cells: impl IntoIterator<Item = Fingerprint>,
        beacon_positions: BTreeMap<String, (f64, f64)>,
        grid_resolution: f64,
    ) -> CoreResult<Self> {
        if !(grid_resolution.is_finite() && grid_resolution > 0.0) {
            return Err(NavError::invalid_map(format!(
                "grid resolution must be positive, got {grid_resolution}"
            )));
        }

        let mut by_id = BTreeMap::new();
        let mut seen = HashSet::new();
        let mut beacons: BTreeSet<String> = beacon_positions.keys().cloned().collect();

        for fp in cells {
            if !seen.insert(fp.cell) {
                return Err(NavError::invalid_map(format!(
                    "duplicate coordinates ({}, {}) at cell {}",
                    fp.cell.x, fp.cell.y, fp.cell_id
                )));
            }
            for (beacon, stats) in &fp.beacon_stats {
                if !stats.mean.is_finite() {
                    return Err(NavError::invalid_map(format!(
                        "cell {} beacon {beacon}: mean is not finite",
                        fp.cell_id
                    )));
                }
                if !stats.std.is_finite() || stats.std < 0.0 {
                    return Err(NavError::invalid_map(format!(
                        "cell {} beacon {beacon}: std {} is negative or not finite",
                        fp.cell_id, stats.std
                    )));
                }
                beacons.insert(beacon.clone());
            }
            if by_id.contains_key(&fp.cell_id) {
                return Err(NavError::invalid_map(format!("duplicate cell id {}", fp.cell_id)));
            }
            by_id.insert(fp.cell_id.clone(), fp);
        }

        if by_id.is_empty() {
            return Err(NavError::invalid_map("radio map has no cells"));
        }

        Ok(Self {
            cells: by_id,
            beacon_positions,
            beacon_ids: beacons.into_iter().collect(),
            grid_resolution,
        })
    }

    /// Predict a map for every passable cell from beacon positions
    pub fn synthetic(
        grid: &GridTopology,
        beacon_positions: &BTreeMap<String, (f64, f64)>,
        seed: u64,
    ) -> CoreResult<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut cells = Vec::new();

        for cell in grid.passable_cells() {
            let mut fp = Fingerprint::new(cell.cell_id(), cell);
            for (beacon, &(bx, by)) in beacon_positions {
                let d = ((cell.x as f64 - bx).powi(2) + (cell.y as f64 - by).powi(2)).sqrt();
                let std = SYNTHETIC_BASE_STD_DB + rng.gen_range(0.0..1.0);
                fp.beacon_stats.insert(
                    beacon.clone(),
                    BeaconStats::new(path_loss_rssi(d), std, SYNTHETIC_SAMPLES),
                );
            }
            cells.push(fp);
        }

        debug!(
            "Synthesized radio map: {} cells, {} beacons, seed {seed}",
            cells.len(),
            beacon_positions.len()
        );
        Self::new(cells, beacon_positions.clone(), 1.0)
    }

    /// Beacon layout of the default floor plan: B1 (0,0), B2 (11,0), B3 (5,7)
    pub fn default_beacon_positions() -> BTreeMap<String, (f64, f64)> {
        [("B1", (0.0, 0.0)), ("B2", (11.0, 0.0)), ("B3", (5.0, 7.0))]
            .into_iter()
            .map(|(id, pos)| (id.to_string(), pos))
            .collect()
    }

    /// Check that every cell lies inside `grid`
    pub fn validate_against(&self, grid: &GridTopology) -> CoreResult<()> {
        match self.cells.values().find(|fp| !grid.contains(fp.cell)) {
            Some(fp) => Err(NavError::invalid_map(format!(
                "cell {} at ({}, {}) is outside the {}x{} grid",
                fp.cell_id,
                fp.cell.x,
                fp.cell.y,
                grid.width(),
                grid.height()
            ))),
            None => Ok(()),
        }
    }

    /// Number of surveyed cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// No surveyed cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells in identifier order
    pub fn cells(&self) -> impl Iterator<Item = &Fingerprint> {
        self.cells.values()
    }

    /// Fingerprint stored under `cell_id`
    pub fn cell(&self, cell_id: &str) -> Option<&Fingerprint> {
        self.cells.get(cell_id)
    }

    /// Every beacon named by the positions table or any cell, sorted
    pub fn beacon_ids(&self) -> &[String] {
        &self.beacon_ids
    }

    /// Beacon positions in grid units
    pub fn beacon_positions(&self) -> &BTreeMap<String, (f64, f64)> {
        &self.beacon_positions
    }

    /// Metres per grid cell
    pub fn grid_resolution(&self) -> f64 {
        self.grid_resolution
    }

    /// Per-beacon statistics of one cell
    pub fn coverage(&self, cell_id: &str) -> Option<CellCoverage> {
        let fp = self.cells.get(cell_id)?;
        Some(CellCoverage {
            cell_id: fp.cell_id.clone(),
            x: fp.cell.x,
            y: fp.cell.y,
            beacons: self
                .beacon_ids
                .iter()
                .map(|b| (b.clone(), fp.beacon_stats.get(b).copied()))
                .collect(),
        })
    }
}

/// Log-distance path-loss prediction for a beacon `distance` cells away
pub fn path_loss_rssi(distance: f64) -> f64 {
    PATH_LOSS_TX_POWER_DBM - 10.0 * PATH_LOSS_EXPONENT * distance.max(PATH_LOSS_MIN_DISTANCE).log10()
}

/// Parse an `"x,y"` cell identifier
pub fn parse_cell_id(cell_id: &str) -> Option<Cell> {
    let (x, y) = cell_id.split_once(',')?;
    Some(Cell::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}
