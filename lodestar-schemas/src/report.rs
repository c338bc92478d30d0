//! Outbound navigation reports

use lodestar_core::{
    DeviceId, DeviceStatus, LocationStatus, MoveCommand, NavigationOutcome, PlanDecision,
};
use serde::Serialize;

use crate::message::{DeviceMessage, MessageTime};
use crate::SchemaResult;

/// Cell the device was placed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLocation {
    pub x: i32,
    pub y: i32,
    pub cell_id: String,
}

/// Per-message result handed to transport and storage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationReport {
    pub device_id: DeviceId,
    pub location: Option<ReportLocation>,
    pub confidence: f64,
    pub status: LocationStatus,
    /// Hops to the exit, 0 without a route
    pub path_length: usize,
    pub next_moves: Vec<MoveCommand>,
    pub decision: PlanDecision,
    pub device_status: DeviceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<MessageTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imu_data: Option<serde_json::Value>,
}

impl NavigationReport {
    pub fn from_outcome(outcome: &NavigationOutcome) -> Self {
        Self {
            device_id: outcome.device_id.clone(),
            location: outcome.location().map(|c| ReportLocation {
                x: c.x,
                y: c.y,
                cell_id: c.cell_id.clone(),
            }),
            confidence: outcome.estimate.confidence,
            status: outcome.estimate.status,
            path_length: outcome.path_length(),
            next_moves: outcome.dispatched.clone(),
            decision: outcome.decision,
            device_status: outcome.device_status,
            timestamp: None,
            imu_data: None,
        }
    }

    /// Echo the message's timestamp and IMU block
    pub fn with_message_context(mut self, message: &DeviceMessage) -> Self {
        self.timestamp = message.timestamp.clone();
        self.imu_data = message.imu_data.clone();
        self
    }

    pub fn to_json(&self) -> SchemaResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_value(&self) -> SchemaResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_core::{
        BeaconStats, Cell, DeviceStateTracker, Fingerprint, FixedTime, GridTopology,
        NavigationPipeline, PipelineConfig, RadioMap,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn pipeline() -> NavigationPipeline {
        let grid = GridTopology::from_rows(&["..E", "...", "..."]).unwrap();
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
        let config = PipelineConfig::default();
        let tracker = Arc::new(DeviceStateTracker::new(&config, Arc::new(FixedTime::new(0))));
        NavigationPipeline::new(config, Arc::new(grid), Arc::new(map), tracker).unwrap()
    }

    #[test]
    fn report_for_a_planned_route() {
        let message: DeviceMessage = r#"{
            "device_id": "M01",
            "timestamp": 1700000000000,
            "ble_readings": { "B1": [-50, -50, -50, -50, -50], "B2": [-80, -80, -80, -80, -80] },
            "imu_data": { "heading": 12.5 }
        }"#
        .parse()
        .unwrap();
        let outcome = pipeline().process(&message.to_reading());
        let json = NavigationReport::from_outcome(&outcome)
            .with_message_context(&message)
            .to_value()
            .unwrap();

        assert_eq!(json["device_id"], "M01");
        assert_eq!(json["location"]["cell_id"], "0,0");
        assert_eq!(json["location"]["x"], 0);
        assert_eq!(json["status"], "HIGH_CONFIDENCE");
        assert_eq!(json["path_length"], 4);
        assert_eq!(json["next_moves"], serde_json::json!(["F", "F", "R", "F", "F"]));
        assert_eq!(json["decision"], "navigate");
        assert_eq!(json["device_status"], "ACTIVE");
        assert_eq!(json["timestamp"], 1700000000000u64);
        assert_eq!(json["imu_data"]["heading"], 12.5);
    }

    #[test]
    fn failed_fix_reports_null_location() {
        let message: DeviceMessage = r#"{"device_id": "M02", "ble_readings": {"B1": -60}}"#.parse().unwrap();
        let outcome = pipeline().process(&message.to_reading());
        let json = NavigationReport::from_outcome(&outcome).to_value().unwrap();

        assert!(json["location"].is_null());
        assert_eq!(json["confidence"], 0.0);
        assert_eq!(json["status"], "LOCALIZATION_FAILED");
        assert_eq!(json["path_length"], 0);
        assert_eq!(json["next_moves"], serde_json::json!([]));
        assert!(json.get("timestamp").is_none());
    }
}
