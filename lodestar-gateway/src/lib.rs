//! Concurrent Message Gateway
//!
//! ## Overview
//!
//! The gateway is the shell around the navigation core. It owns a bounded
//! queue of raw device payloads and a fixed pool of workers that decode them,
//! run the shared [`NavigationPipeline`](lodestar_core::NavigationPipeline)
//! and hand each [`NavigationReport`](lodestar_schemas::NavigationReport) to a
//! [`ReportSink`].
//!
//! ```text
//!  transport ──submit──► [ bounded queue ] ──► worker 1 ─┐
//!                                          ├─► worker 2 ─┼─► ReportSink
//!                                          └─► worker N ─┘
//!                                                │
//!                                   NavigationPipeline (per-device lock)
//! ```
//!
//! ## Concurrency
//!
//! - Messages for different devices run fully in parallel
//! - Messages for one device are serialized by the tracker's per-device lock
//! - Sinks are awaited after the pipeline returns, never under a device lock
//! - A full queue makes `submit` wait: backpressure, not loss
//!
//! ## Degraded Mode
//!
//! If the radio map cannot be loaded the gateway still starts. Every message
//! is answered with a `LOCALIZATION_FAILED` report and
//! [`GatewayStatus::degraded`] is set, so the fault is visible instead of
//! silently dropping traffic.
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use lodestar_gateway::{ChannelSink, Gateway, GatewayConfig};
//!
//! # async fn run() -> lodestar_gateway::GatewayResult<()> {
//! let config = GatewayConfig::from_path("gateway.json")?;
//! let (sink, mut reports) = ChannelSink::channel(256);
//! let gateway = Gateway::start(config, Arc::new(sink))?;
//!
//! gateway.submit(br#"{"device_id":"M01","ble_readings":{"B1":-60,"B2":-75}}"#.to_vec()).await?;
//! if let Some(report) = reports.recv().await {
//!     println!("{}", report.to_json()?);
//! }
//! gateway.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

use lodestar_core::NavError;
use lodestar_schemas::SchemaError;
use thiserror::Error;

pub mod config;
pub mod gateway;
pub mod sink;
pub mod stats;

pub use config::GatewayConfig;
pub use gateway::{Gateway, GatewayStatus};
pub use sink::{ChannelSink, LogSink, ReportSink};
pub use stats::{GatewayStats, StatsSnapshot};

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Core(#[from] NavError),

    /// A sink refused or failed to take a report
    #[error("Sink {sink} failed: {reason}")]
    Sink { sink: String, reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The gateway is shut down or a channel was dropped
    #[error("Gateway closed")]
    Closed,

    /// Workers that panicked instead of draining the queue
    #[error("{failed} of {workers} workers ended abnormally")]
    WorkerFailed { failed: usize, workers: usize },
}

impl GatewayError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Config { reason: reason.into() }
    }

    pub fn sink(sink: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Sink { sink: sink.into(), reason: reason.into() }
    }
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
