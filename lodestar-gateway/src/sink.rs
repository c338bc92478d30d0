//! Report sinks
//!
//! A sink is the hand-off point to whatever delivers reports onward (radio
//! downlink, storage, telemetry). The gateway awaits each publish outside any
//! device lock and counts failures; it never retries.

use async_trait::async_trait;
use log::info;
use lodestar_schemas::NavigationReport;
use tokio::sync::mpsc;

use crate::{GatewayError, GatewayResult};

/// Destination for navigation reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Sink name for logs and errors
    fn name(&self) -> &str;

    /// Deliver one report
    async fn publish(&self, report: &NavigationReport) -> GatewayResult<()>;
}

/// Forwards reports into a bounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<NavigationReport>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<NavigationReport>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NavigationReport>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ReportSink for ChannelSink {
    fn name(&self) -> &str {
        "channel"
    }

    async fn publish(&self, report: &NavigationReport) -> GatewayResult<()> {
        self.tx
            .send(report.clone())
            .await
            .map_err(|_| GatewayError::sink(self.name(), "receiver dropped"))
    }
}

/// Writes every report to the log as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn publish(&self, report: &NavigationReport) -> GatewayResult<()> {
        let json = report.to_json()?;
        info!("report {json}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_core::{DeviceId, DeviceStatus, LocationStatus, PlanDecision};

    fn report() -> NavigationReport {
        NavigationReport {
            device_id: DeviceId::parse("M01").unwrap(),
            location: None,
            confidence: 0.0,
            status: LocationStatus::LocalizationFailed,
            path_length: 0,
            next_moves: Vec::new(),
            decision: PlanDecision::Failed,
            device_status: DeviceStatus::Inactive,
            timestamp: None,
            imu_data: None,
        }
    }

    #[tokio::test]
    async fn channel_sink_delivers() {
        let (sink, mut rx) = ChannelSink::channel(4);
        sink.publish(&report()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().device_id.as_str(), "M01");
    }

    #[tokio::test]
    async fn channel_sink_fails_when_receiver_is_gone() {
        let (sink, rx) = ChannelSink::channel(4);
        drop(rx);
        let err = sink.publish(&report()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Sink { .. }));
    }

    #[tokio::test]
    async fn log_sink_accepts_everything() {
        assert!(LogSink.publish(&report()).await.is_ok());
    }
}
