//! Radio Map Reference Documents
//!
//! ## Format
//!
//! ```json
//! {
//!   "cells": {
//!     "1,1": { "x": 1, "y": 1, "beacon_stats": {
//!       "B1": { "mean": -53.8, "std": 2.4, "samples": 30 } } }
//!   },
//!   "beacon_positions": { "B1": [0, 0] },
//!   "grid_resolution": 1.0,
//!   "coordinate_system": "cartesian"
//! }
//! ```
//!
//! ## Legacy Flat Format
//!
//! Early surveys wrote `{ "x,y": { "B1": {...} } }` with no envelope. Such
//! documents are recognized by the missing `cells` key and converted with
//! the default beacon layout and a resolution of 1.0. Keys that do not spell
//! a cell are skipped.
//!
//! ## Loading
//!
//! [`RadioMapDocument::load`] parses, validates (optionally against the floor
//! plan) and builds the immutable [`RadioMap`]. Errors in the report abort
//! the load; warnings are logged and the map is used.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use lodestar_core::radiomap::parse_cell_id;
use lodestar_core::{BeaconStats, Cell, Fingerprint, GridTopology, RadioMap};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::validation::{IssueType, ValidationReport};
use crate::{SchemaError, SchemaResult};

/// The only supported coordinate frame
pub const COORDINATE_SYSTEM: &str = "cartesian";

const REQUIRED_KEYS: [&str; 4] = ["cells", "beacon_positions", "grid_resolution", "coordinate_system"];

/// One surveyed cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellEntry {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub beacon_stats: BTreeMap<String, BeaconStats>,
}

/// Radio map file as written on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioMapDocument {
    pub cells: BTreeMap<String, CellEntry>,
    pub beacon_positions: BTreeMap<String, [f64; 2]>,
    pub grid_resolution: f64,
    pub coordinate_system: String,
}

impl RadioMapDocument {
    pub fn from_json(text: &str) -> SchemaResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SchemaError::invalid(format!("not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Accepts both the current and the legacy flat layout
    pub fn from_value(value: Value) -> SchemaResult<Self> {
        let Value::Object(object) = value else {
            return Err(SchemaError::invalid("top level must be a JSON object"));
        };
        if !object.contains_key("cells") {
            return Self::from_legacy(&object);
        }
        if let Some(key) = REQUIRED_KEYS.iter().find(|key| !object.contains_key(**key)) {
            return Err(SchemaError::invalid(format!("missing required key: {key}")));
        }
        serde_json::from_value(Value::Object(object)).map_err(|e| SchemaError::invalid(e.to_string()))
    }

    /// Convert a flat `{ "x,y": { beacon: stats } }` document
    pub fn from_legacy(flat: &Map<String, Value>) -> SchemaResult<Self> {
        let mut cells = BTreeMap::new();
        for (cell_id, stats) in flat {
            let Some(cell) = parse_cell_id(cell_id) else {
                debug!("Skipping legacy key {cell_id:?}: not a cell id");
                continue;
            };
            let beacon_stats = serde_json::from_value(stats.clone())
                .map_err(|e| SchemaError::invalid(format!("cell {cell_id}: {e}")))?;
            cells.insert(cell_id.clone(), CellEntry { x: cell.x, y: cell.y, beacon_stats });
        }

        if cells.is_empty() {
            return Err(SchemaError::invalid("missing required key: cells"));
        }
        info!("Converted legacy radio map with {} cells", cells.len());

        Ok(Self {
            cells,
            beacon_positions: RadioMap::default_beacon_positions()
                .into_iter()
                .map(|(id, (x, y))| (id, [x, y]))
                .collect(),
            grid_resolution: 1.0,
            coordinate_system: COORDINATE_SYSTEM.to_string(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Document describing an existing map (e.g. a synthetic one)
    pub fn from_radio_map(map: &RadioMap) -> Self {
        Self {
            cells: map
                .cells()
                .map(|fp| {
                    let entry = CellEntry { x: fp.cell.x, y: fp.cell.y, beacon_stats: fp.beacon_stats.clone() };
                    (fp.cell_id.clone(), entry)
                })
                .collect(),
            beacon_positions: map
                .beacon_positions()
                .iter()
                .map(|(id, &(x, y))| (id.clone(), [x, y]))
                .collect(),
            grid_resolution: map.grid_resolution(),
            coordinate_system: COORDINATE_SYSTEM.to_string(),
        }
    }

    /// Collect every structural problem, checking cells against `grid` if given
    pub fn validate(&self, grid: Option<&GridTopology>) -> ValidationReport {
        let mut report = ValidationReport::new();

        if self.coordinate_system.trim() != COORDINATE_SYSTEM {
            report.error(
                IssueType::Unsupported,
                Some("coordinate_system".into()),
                format!("expected {COORDINATE_SYSTEM:?}, got {:?}", self.coordinate_system),
            );
        }
        if !(self.grid_resolution.is_finite() && self.grid_resolution > 0.0) {
            report.error(
                IssueType::InvalidStatistic,
                Some("grid_resolution".into()),
                format!("must be positive, got {}", self.grid_resolution),
            );
        }
        if self.cells.is_empty() {
            report.error(IssueType::MissingField, Some("cells".into()), "radio map has no cells");
        }
        for (beacon, [x, y]) in &self.beacon_positions {
            if !(x.is_finite() && y.is_finite()) {
                report.error(
                    IssueType::InvalidStatistic,
                    Some(format!("beacon_positions.{beacon}")),
                    "position is not finite",
                );
            }
        }

        let mut seen: HashMap<Cell, &str> = HashMap::new();
        let mut unpositioned = BTreeSet::new();

        for (cell_id, entry) in &self.cells {
            let cell = Cell::new(entry.x, entry.y);
            let field = format!("cells.{cell_id}");

            if let Some(other) = seen.insert(cell, cell_id) {
                report.error(
                    IssueType::DuplicateCoordinates,
                    Some(field.clone()),
                    format!("({}, {}) already used by cell {other}", cell.x, cell.y),
                );
            }
            if parse_cell_id(cell_id) != Some(cell) {
                report.warning(
                    IssueType::IdMismatch,
                    Some(field.clone()),
                    format!("id does not match coordinates ({}, {})", cell.x, cell.y),
                );
            }

            if let Some(grid) = grid {
                if !grid.contains(cell) {
                    report.error(
                        IssueType::OutOfBounds,
                        Some(field.clone()),
                        format!("outside the {}x{} floor plan", grid.width(), grid.height()),
                    );
                } else if !grid.is_passable(cell) {
                    report.warning(IssueType::OnWall, Some(field.clone()), "cell is a wall on the floor plan");
                }
            }

            for (beacon, stats) in &entry.beacon_stats {
                if !stats.mean.is_finite() {
                    report.error(
                        IssueType::InvalidStatistic,
                        Some(format!("{field}.beacon_stats.{beacon}")),
                        "mean is not finite",
                    );
                }
                if !(stats.std.is_finite() && stats.std >= 0.0) {
                    report.error(
                        IssueType::InvalidStatistic,
                        Some(format!("{field}.beacon_stats.{beacon}")),
                        format!("std must be non-negative, got {}", stats.std),
                    );
                }
                if !self.beacon_positions.contains_key(beacon) {
                    unpositioned.insert(beacon.as_str());
                }
            }
        }

        for beacon in unpositioned {
            report.note(
                IssueType::UnpositionedBeacon,
                Some(format!("beacon_positions.{beacon}")),
                "beacon has statistics but no position",
            );
        }
        report
    }

    /// Validate without a floor plan and build the map
    pub fn into_radio_map(self) -> SchemaResult<RadioMap> {
        let report = self.validate(None);
        if let Some(issue) = report.first_error() {
            return Err(SchemaError::invalid(issue.to_string()));
        }
        self.build()
    }

    fn build(self) -> SchemaResult<RadioMap> {
        let fingerprints = self.cells.into_iter().map(|(cell_id, entry)| {
            let mut fp = Fingerprint::new(cell_id, Cell::new(entry.x, entry.y));
            fp.beacon_stats = entry.beacon_stats;
            fp
        });
        let positions = self
            .beacon_positions
            .into_iter()
            .map(|(id, [x, y])| (id, (x, y)))
            .collect();
        Ok(RadioMap::new(fingerprints, positions, self.grid_resolution)?)
    }

    /// Read, validate and build the map the pipeline uses
    pub fn load(path: impl AsRef<Path>, grid: Option<&GridTopology>) -> SchemaResult<RadioMap> {
        let path = path.as_ref();
        let document = Self::from_path(path)?;
        let report = document.validate(grid);

        for issue in &report.warnings {
            warn!("Radio map {}: {issue}", path.display());
        }
        if let Some(issue) = report.first_error() {
            return Err(SchemaError::invalid(format!(
                "{issue} ({} errors in {})",
                report.errors.len(),
                path.display()
            )));
        }

        let map = document.build()?;
        info!(
            "Loaded radio map {}: {} cells, {} beacons",
            path.display(),
            map.len(),
            map.beacon_ids().len()
        );
        Ok(map)
    }

    pub fn to_json_pretty(&self) -> SchemaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> SchemaResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_pretty()?).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
