//! Error Types for the Navigation Core
//!
//! ## Design Philosophy
//!
//! Lodestar separates two kinds of failure:
//!
//! 1. **Per-message outcomes** such as "not enough beacons" or "no route to an
//!    exit". These are part of normal operation in a noisy radio environment.
//!    The pipeline turns them into explicit result values (a failed
//!    `LocationEstimate`, an empty `Path`) and keeps going.
//!
//! 2. **Construction and boundary errors** such as a malformed device id, a
//!    grid without exits or a radio map with duplicate coordinates. These are
//!    returned as `Err(NavError)` from the function that detected them.
//!
//! No error in one device's processing affects another device.
//!
//! ## Error Categories
//!
//! ### Inbound Data
//! - `MalformedMessage`: missing/invalid device id, unusable payload
//!
//! ### Localization
//! - `InsufficientBeacons`: fewer than two beacons actually heard
//! - `NoMatch`: total likelihood over the map collapsed to zero
//! - `RadioMapUnavailable`: reference map missing or corrupt at load time
//!
//! ### Navigation
//! - `NoPathFound`: start cell is a wall, outside the grid, or cut off
//! - `InvalidStep`: a path contains a non-adjacent or diagonal step
//!
//! ### Construction
//! - `InvalidGrid`, `InvalidRadioMap`, `InvalidConfig`
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use lodestar_core::{NavError, grid::GridTopology};
//!
//! match GridTopology::from_rows(&["#E#", "#.#"]) {
//!     Ok(grid) => assert_eq!(grid.exits().len(), 1),
//!     Err(NavError::InvalidGrid { reason }) => panic!("bad floor plan: {reason}"),
//!     Err(other) => panic!("unexpected: {other}"),
//! }
//! ```

use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = Result<T, NavError>;

/// Errors raised by the navigation core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    /// Inbound message could not be used (missing device id, bad payload)
    #[error("Malformed message: {reason}")]
    MalformedMessage {
        /// What was wrong with the message
        reason: String,
    },

    /// Fewer beacons were heard than localization needs
    #[error("Insufficient beacons: need {required}, have {available}")]
    InsufficientBeacons {
        /// Minimum number of detected beacons
        required: usize,
        /// Beacons with a non-sentinel reading
        available: usize,
    },

    /// No cell in the radio map explains the observation
    #[error("No matching cell in radio map")]
    NoMatch,

    /// Reference radio map could not be loaded
    #[error("Radio map unavailable: {reason}")]
    RadioMapUnavailable {
        /// Load failure description
        reason: String,
    },

    /// No route from the start cell to any exit
    #[error("No path to an exit from ({x}, {y})")]
    NoPathFound {
        /// Start column
        x: i32,
        /// Start row (Cartesian)
        y: i32,
    },

    /// Consecutive path cells are not 4-neighbours
    #[error("Invalid step from {from:?} to {to:?}")]
    InvalidStep {
        /// Cell the step leaves
        from: (i32, i32),
        /// Cell the step enters
        to: (i32, i32),
    },

    /// Floor plan could not be turned into a grid
    #[error("Invalid grid: {reason}")]
    InvalidGrid {
        /// Which invariant failed
        reason: String,
    },

    /// Radio map violates its invariants
    #[error("Invalid radio map: {reason}")]
    InvalidRadioMap {
        /// Which invariant failed
        reason: String,
    },

    /// Configuration value out of range
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Offending field and value
        reason: String,
    },
}

impl NavError {
    /// Shorthand for a malformed-message error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage { reason: reason.into() }
    }

    /// Shorthand for an invalid-grid error
    pub fn invalid_grid(reason: impl Into<String>) -> Self {
        Self::InvalidGrid { reason: reason.into() }
    }

    /// Shorthand for an invalid-radio-map error
    pub fn invalid_map(reason: impl Into<String>) -> Self {
        Self::InvalidRadioMap { reason: reason.into() }
    }

    /// Shorthand for an invalid-config error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig { reason: reason.into() }
    }

    /// True for errors that are an expected per-message outcome rather than a fault
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBeacons { .. } | Self::NoMatch | Self::NoPathFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_include_context() {
        let err = NavError::InsufficientBeacons { required: 2, available: 1 };
        assert_eq!(err.to_string(), "Insufficient beacons: need 2, have 1");

        let err = NavError::NoPathFound { x: 3, y: 4 };
        assert_eq!(err.to_string(), "No path to an exit from (3, 4)");
    }

    #[test]
    fn recoverable_classification() {
        assert!(NavError::NoMatch.is_recoverable());
        assert!(NavError::NoPathFound { x: 0, y: 0 }.is_recoverable());
        assert!(!NavError::malformed("missing device_id").is_recoverable());
        assert!(!NavError::RadioMapUnavailable { reason: "gone".into() }.is_recoverable());
    }
}
