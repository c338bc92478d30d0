//! Fixture documents for the loading tests

#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;

/// Two surveyed cells on a 3 × 3 room, B1 dominant at (0,0), B2 at (2,0)
pub const TWO_CELL_MAP: &str = r#"{
    "cells": {
        "0,0": { "x": 0, "y": 0, "beacon_stats": {
            "B1": { "mean": -50.0, "std": 2.0, "samples": 30 },
            "B2": { "mean": -80.0, "std": 2.0, "samples": 30 } } },
        "2,0": { "x": 2, "y": 0, "beacon_stats": {
            "B1": { "mean": -80.0, "std": 2.0, "samples": 30 },
            "B2": { "mean": -50.0, "std": 2.0, "samples": 30 } } }
    },
    "beacon_positions": { "B1": [0, 0], "B2": [2, 0] },
    "grid_resolution": 1.0,
    "coordinate_system": "cartesian"
}"#;

/// Flat survey output from before the envelope existed
pub const LEGACY_MAP: &str = r#"{
    "0,0": { "B1": { "mean": -50.0, "std": 2.0, "samples": 30 },
             "B2": { "mean": -80.0, "std": 2.0, "samples": 30 } },
    "2,0": { "B1": { "mean": -80.0, "std": 2.0, "samples": 30 },
             "B2": { "mean": -50.0, "std": 2.0, "samples": 30 } }
}"#;

pub const SMALL_ROOM: [&str; 3] = ["..E", "...", "..."];

/// Write `contents` to a temp file that lives as long as the handle
pub fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
