//! Inbound device messages

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use lodestar_core::{DeviceId, DeviceReading};
use serde::{Deserialize, Serialize};

use crate::{SchemaError, SchemaResult};

/// Device-supplied timestamp, echoed back but never interpreted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageTime {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for MessageTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One beacon's samples: a bare number or an array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RssiSamples {
    One(f64),
    Many(Vec<f64>),
}

impl RssiSamples {
    pub fn as_slice(&self) -> &[f64] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }
}

impl From<Vec<f64>> for RssiSamples {
    fn from(values: Vec<f64>) -> Self {
        Self::Many(values)
    }
}

/// A device's report for one collection window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceMessage {
    pub device_id: DeviceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<MessageTime>,
    #[serde(default)]
    pub ble_readings: BTreeMap<String, RssiSamples>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imu_data: Option<serde_json::Value>,
}

impl DeviceMessage {
    pub fn new(device_id: DeviceId) -> Self {
        Self { device_id, timestamp: None, ble_readings: BTreeMap::new(), imu_data: None }
    }

    pub fn with_readings(mut self, beacon: impl Into<String>, samples: impl Into<RssiSamples>) -> Self {
        self.ble_readings.insert(beacon.into(), samples.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: MessageTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Decode and validate a raw payload
    ///
    /// Any problem (not JSON, missing or invalid `device_id`, non-numeric
    /// samples, empty beacon ids) is a [`SchemaError::MalformedMessage`].
    pub fn parse(payload: &[u8]) -> SchemaResult<Self> {
        let message: Self =
            serde_json::from_slice(payload).map_err(|e| SchemaError::malformed(e.to_string()))?;
        message.check_beacons()?;
        Ok(message)
    }

    fn check_beacons(&self) -> SchemaResult<()> {
        if self.ble_readings.keys().any(|beacon| beacon.trim().is_empty()) {
            return Err(SchemaError::malformed("ble_readings contains an empty beacon id"));
        }
        Ok(())
    }

    /// Samples in the form the pipeline consumes
    pub fn to_reading(&self) -> DeviceReading {
        self.ble_readings
            .iter()
            .fold(DeviceReading::new(self.device_id.clone()), |reading, (beacon, samples)| {
                reading.with_samples(beacon.clone(), samples.as_slice().iter().copied())
            })
    }

    pub fn to_json(&self) -> SchemaResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl FromStr for DeviceMessage {
    type Err = SchemaError;

    fn from_str(s: &str) -> SchemaResult<Self> {
        Self::parse(s.as_bytes())
    }
}
