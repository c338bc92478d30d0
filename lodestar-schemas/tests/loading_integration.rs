//! Loading radio maps from disk and turning messages into reports

mod common;

use std::sync::Arc;

use lodestar_core::{
    DeviceStateTracker, FixedTime, GridTopology, NavigationPipeline, PipelineConfig, RadioMap,
};
use lodestar_schemas::{DeviceMessage, NavigationReport, RadioMapDocument, SchemaError};

use common::{write_temp, LEGACY_MAP, SMALL_ROOM, TWO_CELL_MAP};

#[test]
fn test_load_validates_against_floor_plan() {
    let file = write_temp(TWO_CELL_MAP);
    let grid = GridTopology::from_rows(&SMALL_ROOM).unwrap();

    let map = RadioMapDocument::load(file.path(), Some(&grid)).unwrap();
    assert_eq!(map.len(), 2);

    let narrow = GridTopology::from_rows(&["E."]).unwrap();
    let err = RadioMapDocument::load(file.path(), Some(&narrow)).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidDocument { .. }));
    assert!(err.to_string().contains("outside"));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RadioMapDocument::load(dir.path().join("absent.json"), None).unwrap_err();
    assert!(matches!(err, SchemaError::Io { .. }));
}

#[test]
fn test_corrupt_file_is_invalid() {
    let file = write_temp("{ \"cells\": ");
    assert!(matches!(
        RadioMapDocument::load(file.path(), None),
        Err(SchemaError::InvalidDocument { .. })
    ));
}

#[test]
fn test_legacy_file_loads_like_current_format() {
    let legacy = RadioMapDocument::load(write_temp(LEGACY_MAP).path(), None).unwrap();
    let current = RadioMapDocument::load(write_temp(TWO_CELL_MAP).path(), None).unwrap();

    assert_eq!(legacy.len(), current.len());
    assert_eq!(legacy.cell("2,0"), current.cell("2,0"));
    assert_eq!(legacy.beacon_positions().len(), 3);
}

#[test]
fn test_saved_synthetic_map_loads_back() {
    let grid = GridTopology::default_floor_plan();
    let map = RadioMap::synthetic(&grid, &RadioMap::default_beacon_positions(), 11).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("radio_map.json");

    RadioMapDocument::from_radio_map(&map).save(&path).unwrap();
    let loaded = RadioMapDocument::load(&path, Some(&grid)).unwrap();
    assert_eq!(loaded, map);
}

#[test]
fn test_message_to_report_through_pipeline() {
    let grid = Arc::new(GridTopology::from_rows(&SMALL_ROOM).unwrap());
    let map = RadioMapDocument::load(write_temp(TWO_CELL_MAP).path(), Some(&grid)).unwrap();
    let config = PipelineConfig::default().with_max_moves(3);
    let tracker = Arc::new(DeviceStateTracker::new(&config, Arc::new(FixedTime::new(0))));
    let pipeline = NavigationPipeline::new(config, grid, Arc::new(map), tracker).unwrap();

    let message = DeviceMessage::parse(
        br#"{"device_id": "M07", "timestamp": "t-1",
             "ble_readings": {"B1": [-51, -50, -49, -50, -50], "B2": [-79, -80, -81, -80, -80]}}"#,
    )
    .unwrap();
    let outcome = pipeline.process(&message.to_reading());
    let report = NavigationReport::from_outcome(&outcome).with_message_context(&message);

    assert_eq!(report.location.as_ref().map(|l| l.cell_id.as_str()), Some("0,0"));
    assert_eq!(report.path_length, 4);
    assert_eq!(report.next_moves.len(), 3);

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["next_moves"], serde_json::json!(["F", "F", "R"]));
    assert_eq!(json["timestamp"], "t-1");
}
