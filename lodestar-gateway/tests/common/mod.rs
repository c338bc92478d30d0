//! Shared fixtures for gateway tests

#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lodestar_gateway::{GatewayError, GatewayResult, ReportSink};
use lodestar_schemas::NavigationReport;
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

pub const SMALL_ROOM: &str = "..E\n...\n...\n";

pub fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Map and floor plan files that must outlive the gateway
pub struct RoomFiles {
    pub map: NamedTempFile,
    pub plan: NamedTempFile,
}

pub fn room_files() -> RoomFiles {
    RoomFiles { map: write_temp(TWO_CELL_MAP), plan: write_temp(SMALL_ROOM) }
}

/// A device standing on (0,0) of the small room
pub fn near_b1(device: &str) -> Vec<u8> {
    format!(
        r#"{{"device_id": "{device}", "timestamp": 1,
            "ble_readings": {{"B1": [-51, -50, -49, -50, -50], "B2": [-79, -80, -81, -80, -80]}}}}"#
    )
    .into_bytes()
}

pub fn single_beacon(device: &str) -> Vec<u8> {
    format!(r#"{{"device_id": "{device}", "ble_readings": {{"B1": -50}}}}"#).into_bytes()
}

/// Sink that rejects every report
#[derive(Debug, Default)]
pub struct FailingSink {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl ReportSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn publish(&self, _report: &NavigationReport) -> GatewayResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(GatewayError::sink(self.name(), "downlink unavailable"))
    }
}

/// Sink whose publish panics, taking its worker down
#[derive(Debug, Default)]
pub struct PanickingSink;

#[async_trait]
impl ReportSink for PanickingSink {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn publish(&self, _report: &NavigationReport) -> GatewayResult<()> {
        panic!("sink crashed");
    }
}
