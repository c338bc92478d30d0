//! Gateway Configuration
//!
//! Loaded from a JSON file; every key is optional:
//!
//! ```json
//! {
//!   "workers": 4,
//!   "queue_capacity": 64,
//!   "radio_map_path": "maps/radio_map.json",
//!   "floor_plan_path": "maps/level_1.txt",
//!   "offline_after_ms": 30000,
//!   "sweep_interval_ms": 5000,
//!   "expected_devices": ["M01", "M02"],
//!   "pipeline": { "max_moves_per_cycle": 3 }
//! }
//! ```
//!
//! Without `floor_plan_path` the built-in 16 × 12 plan is used. Without
//! `radio_map_path` the gateway runs degraded.

use std::path::{Path, PathBuf};

use lodestar_core::{DeviceId, PipelineConfig};
use serde::{Deserialize, Serialize};

use crate::{GatewayError, GatewayResult};

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub radio_map_path: Option<PathBuf>,
    pub floor_plan_path: Option<PathBuf>,
    /// Silence after which a device is marked offline
    pub offline_after_ms: u64,
    /// How often the offline sweep runs; 0 disables it
    pub sweep_interval_ms: u64,
    pub expected_devices: Vec<String>,
    pub pipeline: PipelineConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            radio_map_path: None,
            floor_plan_path: None,
            offline_after_ms: lodestar_core::constants::DEFAULT_OFFLINE_AFTER_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            expected_devices: Vec::new(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn from_json(text: &str) -> GatewayResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| GatewayError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GatewayError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_radio_map(mut self, path: impl Into<PathBuf>) -> Self {
        self.radio_map_path = Some(path.into());
        self
    }

    pub fn with_floor_plan(mut self, path: impl Into<PathBuf>) -> Self {
        self.floor_plan_path = Some(path.into());
        self
    }

    pub fn with_offline_after(mut self, ms: u64) -> Self {
        self.offline_after_ms = ms;
        self
    }

    pub fn with_sweep_interval(mut self, ms: u64) -> Self {
        self.sweep_interval_ms = ms;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.workers == 0 {
            return Err(GatewayError::config("workers must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(GatewayError::config("queue_capacity must be at least 1"));
        }
        if self.offline_after_ms == 0 {
            return Err(GatewayError::config("offline_after_ms must be positive"));
        }
        self.expected_device_ids()?;
        self.pipeline.validate()?;
        Ok(())
    }

    /// Pre-registered device ids, validated
    pub fn expected_device_ids(&self) -> GatewayResult<Vec<DeviceId>> {
        self.expected_devices
            .iter()
            .map(|raw| {
                DeviceId::parse(raw)
                    .map_err(|e| GatewayError::config(format!("expected_devices: {e}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = GatewayConfig::from_json("{}").unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.workers, 4);
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.offline_after_ms, 30_000);
        assert!(config.radio_map_path.is_none());
    }

    #[test]
    fn nested_pipeline_settings() {
        let config = GatewayConfig::from_json(
            r#"{"workers": 2, "radio_map_path": "map.json",
                "expected_devices": ["M01"], "pipeline": {"max_moves_per_cycle": 3}}"#,
        )
        .unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.radio_map_path.as_deref(), Some(Path::new("map.json")));
        assert_eq!(config.pipeline.max_moves_per_cycle, 3);
        assert_eq!(config.expected_device_ids().unwrap()[0].as_str(), "M01");
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for doc in [
            r#"{"workers": 0}"#,
            r#"{"queue_capacity": 0}"#,
            r#"{"expected_devices": ["no spaces"]}"#,
            r#"{"workers": "four"}"#,
        ] {
            assert!(matches!(GatewayConfig::from_json(doc), Err(GatewayError::Config { .. })), "{doc}");
        }
        assert!(matches!(
            GatewayConfig::from_json(r#"{"pipeline": {"smoothing_alpha": 2.0}}"#),
            Err(GatewayError::Core(_))
        ));
    }
}
