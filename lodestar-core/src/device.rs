//! Device identity and per-cycle readings
//!
//! Identifiers are validated once at the boundary. Anything that gets past
//! [`DeviceId::parse`] can be used as a tracker key without further checks.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CoreResult, NavError};

/// Longest accepted device identifier
pub const MAX_DEVICE_ID_LEN: usize = 64;

/// Validated identifier of a tracked device
///
/// Non-empty, at most 64 characters, ASCII letters, digits and `-_:.` only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate a raw identifier (surrounding whitespace is trimmed)
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(NavError::malformed("device_id is empty"));
        }
        if id.len() > MAX_DEVICE_ID_LEN {
            return Err(NavError::malformed(format!(
                "device_id longer than {MAX_DEVICE_ID_LEN} characters"
            )));
        }
        if let Some(bad) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')))
        {
            return Err(NavError::malformed(format!("device_id contains {bad:?}")));
        }
        Ok(Self(id.to_string()))
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = NavError;

    fn try_from(raw: String) -> CoreResult<Self> {
        Self::parse(&raw)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One device's raw samples for one collection window
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReading {
    /// Device the samples belong to
    pub device_id: DeviceId,
    /// Raw RSSI samples per beacon, possibly empty
    pub samples: BTreeMap<String, Vec<f64>>,
}

impl DeviceReading {
    /// A reading with no samples yet
    pub fn new(device_id: DeviceId) -> Self {
        Self { device_id, samples: BTreeMap::new() }
    }

    /// Add samples for a beacon, appending to any already present
    pub fn with_samples(mut self, beacon: impl Into<String>, samples: impl IntoIterator<Item = f64>) -> Self {
        self.samples.entry(beacon.into()).or_default().extend(samples);
        self
    }

    /// Total number of raw samples across beacons
    pub fn sample_count(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }
}
