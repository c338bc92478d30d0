//! Wire Formats for Lodestar
//!
//! ## Overview
//!
//! The navigation core works on typed values only. This crate is the boundary
//! where loosely-typed JSON from devices, the radio-map file and downstream
//! consumers is parsed once, validated once and turned into those types.
//!
//! ```text
//!   device JSON ──► DeviceMessage ──► DeviceReading ──► NavigationPipeline
//!                                                             │
//!   consumer JSON ◄── NavigationReport ◄── NavigationOutcome ◄┘
//!
//!   radio_map.json ──► RadioMapDocument ──validate──► RadioMap
//! ```
//!
//! ## Inbound Device Message
//!
//! ```json
//! {
//!   "device_id": "M01",
//!   "timestamp": 1700000000000,
//!   "ble_readings": { "B1": [-62, -61.5], "B2": -78 },
//!   "imu_data": { "ax": 0.1 }
//! }
//! ```
//!
//! `timestamp` may be a number or a string. A beacon may carry one number or
//! an array of samples. `imu_data` is carried through to the report untouched.
//! A missing or invalid `device_id` rejects the message before any device
//! state is looked up.
//!
//! ## Outbound Report
//!
//! ```json
//! {
//!   "device_id": "M01",
//!   "location": { "x": 1, "y": 1, "cell_id": "1,1" },
//!   "confidence": 0.93,
//!   "status": "HIGH_CONFIDENCE",
//!   "path_length": 7,
//!   "next_moves": ["R", "F", "F", "F", "F"]
//! }
//! ```
//!
//! `location` is `null` when localization failed. `path_length` counts hops.
//!
//! ## Radio Map Document
//!
//! Required keys are `cells`, `beacon_positions`, `grid_resolution` and
//! `coordinate_system` (which must be `"cartesian"`). Older flat documents
//! keyed directly by `"x,y"` are converted on load.
//!
//! ## Usage Example
//!
//! ```no_run
//! use lodestar_schemas::{DeviceMessage, RadioMapDocument};
//!
//! let map = RadioMapDocument::load("radio_map.json", None)?;
//! let message = DeviceMessage::parse(br#"{"device_id":"M01","ble_readings":{"B1":-60}}"#)?;
//! let reading = message.to_reading();
//! # Ok::<(), lodestar_schemas::SchemaError>(())
//! ```

#![deny(unsafe_code)]

use lodestar_core::NavError;
use thiserror::Error;

pub mod message;
pub mod radio_map;
pub mod report;
pub mod validation;

pub use message::{DeviceMessage, MessageTime, RssiSamples};
pub use radio_map::{CellEntry, RadioMapDocument, COORDINATE_SYSTEM};
pub use report::{NavigationReport, ReportLocation};
pub use validation::{IssueType, Severity, ValidationIssue, ValidationReport};

/// Result type for wire-format operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Wire-format errors
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Serializing an outbound document failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a document from disk failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being read
        path: String,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Inbound device message rejected at the boundary
    #[error("Malformed message: {reason}")]
    MalformedMessage {
        /// What was wrong with the message
        reason: String,
    },

    /// Radio map document is structurally invalid
    #[error("Invalid radio map document: {reason}")]
    InvalidDocument {
        /// First blocking problem found
        reason: String,
    },
}

impl SchemaError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage { reason: reason.into() }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidDocument { reason: reason.into() }
    }
}

impl From<NavError> for SchemaError {
    fn from(err: NavError) -> Self {
        match err {
            NavError::MalformedMessage { reason } => Self::MalformedMessage { reason },
            other => Self::InvalidDocument { reason: other.to_string() },
        }
    }
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
