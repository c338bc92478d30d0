//! Worker pool and gateway lifecycle

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use lodestar_core::{
    DeviceId, DeviceStateTracker, GridTopology, NavigationPipeline, SystemTime, TimeSource,
};
use lodestar_schemas::{DeviceMessage, NavigationReport, RadioMapDocument};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::GatewayConfig;
use crate::sink::ReportSink;
use crate::stats::{GatewayStats, StatsSnapshot};
use crate::{GatewayError, GatewayResult};

/// Fleet-level health summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayStatus {
    pub tracked: usize,
    pub active: usize,
    pub inactive: usize,
    /// Mean confidence over active devices
    pub average_confidence: f64,
    pub exits: usize,
    /// No radio map: every message fails localization
    pub degraded: bool,
    pub workers: usize,
}

/// Everything a worker needs to turn a payload into a published report
struct WorkerContext {
    pipeline: Arc<NavigationPipeline>,
    sink: Arc<dyn ReportSink>,
    stats: Arc<GatewayStats>,
}

impl WorkerContext {
    async fn handle(&self, payload: &[u8]) -> GatewayResult<NavigationReport> {
        self.stats.record_received();

        let message = match DeviceMessage::parse(payload) {
            Ok(message) => message,
            Err(err) => {
                self.stats.record_rejected();
                warn!("Dropping malformed message: {err}");
                return Err(err.into());
            }
        };

        let outcome = self.pipeline.process(&message.to_reading());
        self.stats.record_outcome(&outcome);
        let report = NavigationReport::from_outcome(&outcome).with_message_context(&message);

        if let Err(err) = self.sink.publish(&report).await {
            self.stats.record_sink_failure();
            error!("Sink {} failed for {}: {err}", self.sink.name(), report.device_id);
            return Err(err);
        }
        Ok(report)
    }
}

async fn worker_loop(id: usize, queue: Arc<Mutex<mpsc::Receiver<Vec<u8>>>>, ctx: Arc<WorkerContext>) {
    debug!("Worker {id} started");
    loop {
        let next = queue.lock().await.recv().await;
        let Some(payload) = next else { break };
        // Failures are counted and logged inside `handle`
        let _ = ctx.handle(&payload).await;
    }
    debug!("Worker {id} stopped");
}

/// Running gateway: bounded queue, worker pool and offline sweeper
pub struct Gateway {
    ctx: Arc<WorkerContext>,
    sender: Option<mpsc::Sender<Vec<u8>>>,
    workers: Vec<JoinHandle<()>>,
    sweeper: Option<JoinHandle<()>>,
    offline_after_ms: u64,
}

impl Gateway {
    /// Load the floor plan and radio map named in `config` and start the pool
    ///
    /// Must be called inside a tokio runtime. A radio map that cannot be
    /// loaded puts the gateway in degraded mode instead of failing; a bad
    /// floor plan or configuration is an error.
    pub fn start(config: GatewayConfig, sink: Arc<dyn ReportSink>) -> GatewayResult<Self> {
        Self::start_with_clock(config, sink, Arc::new(SystemTime))
    }

    pub fn start_with_clock(
        config: GatewayConfig,
        sink: Arc<dyn ReportSink>,
        time: Arc<dyn TimeSource>,
    ) -> GatewayResult<Self> {
        config.validate()?;

        let grid = Arc::new(match &config.floor_plan_path {
            Some(path) => GridTopology::from_path(path)?,
            None => GridTopology::default_floor_plan(),
        });
        let (_, passages, exits) = grid.census();
        info!(
            "Floor plan {}x{}: {passages} passages, {exits} exits",
            grid.width(),
            grid.height()
        );

        let tracker = Arc::new(DeviceStateTracker::new(&config.pipeline, time));
        let expected = config.expected_device_ids()?;
        tracker.register_expected(&expected);

        let map = match &config.radio_map_path {
            Some(path) => match RadioMapDocument::load(path, Some(&grid)) {
                Ok(map) => Some(map),
                Err(err) => {
                    error!("Radio map {} unavailable: {err}", path.display());
                    None
                }
            },
            None => {
                error!("No radio map configured");
                None
            }
        };

        let pipeline = match map {
            Some(map) => NavigationPipeline::new(config.pipeline.clone(), grid, Arc::new(map), tracker)?,
            None => NavigationPipeline::degraded(config.pipeline.clone(), grid, tracker)?,
        };
        Ok(Self::from_pipeline(Arc::new(pipeline), sink, &config))
    }

    /// Start the pool around an already built pipeline
    pub fn from_pipeline(
        pipeline: Arc<NavigationPipeline>,
        sink: Arc<dyn ReportSink>,
        config: &GatewayConfig,
    ) -> Self {
        let workers = config.workers.max(1);
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let queue = Arc::new(Mutex::new(rx));
        let ctx = Arc::new(WorkerContext { pipeline, sink, stats: Arc::new(GatewayStats::new()) });

        let handles = (0..workers)
            .map(|id| tokio::spawn(worker_loop(id, queue.clone(), ctx.clone())))
            .collect();

        let sweeper = (config.sweep_interval_ms > 0).then(|| {
            let tracker = ctx.pipeline.tracker().clone();
            let timeout = config.offline_after_ms;
            let period = Duration::from_millis(config.sweep_interval_ms);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                loop {
                    ticker.tick().await;
                    tracker.sweep_stale(timeout);
                }
            })
        });

        info!(
            "Gateway started: {workers} workers, queue {}, sink {}{}",
            config.queue_capacity,
            ctx.sink.name(),
            if ctx.pipeline.is_degraded() { ", DEGRADED" } else { "" }
        );

        Self {
            ctx,
            sender: Some(tx),
            workers: handles,
            sweeper,
            offline_after_ms: config.offline_after_ms,
        }
    }

    /// Queue a raw payload, waiting while the queue is full
    pub async fn submit(&self, payload: Vec<u8>) -> GatewayResult<()> {
        let sender = self.sender.as_ref().ok_or(GatewayError::Closed)?;
        sender.send(payload).await.map_err(|_| GatewayError::Closed)
    }

    /// Process one payload on the caller's task, bypassing the queue
    pub async fn process_now(&self, payload: &[u8]) -> GatewayResult<NavigationReport> {
        self.ctx.handle(payload).await
    }

    /// Mark devices silent for longer than the configured timeout offline
    pub fn sweep_offline(&self) -> Vec<DeviceId> {
        self.tracker().sweep_stale(self.offline_after_ms)
    }

    pub fn pipeline(&self) -> &Arc<NavigationPipeline> {
        &self.ctx.pipeline
    }

    pub fn tracker(&self) -> &Arc<DeviceStateTracker> {
        self.ctx.pipeline.tracker()
    }

    pub fn is_degraded(&self) -> bool {
        self.ctx.pipeline.is_degraded()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.ctx.stats.snapshot()
    }

    pub fn status(&self) -> GatewayStatus {
        let tracker = self.tracker();
        GatewayStatus {
            tracked: tracker.len(),
            active: tracker.active_devices().len(),
            inactive: tracker.inactive_devices().len(),
            average_confidence: tracker.average_confidence(),
            exits: self.ctx.pipeline.grid().exits().len(),
            degraded: self.is_degraded(),
            workers: self.workers.len(),
        }
    }

    /// Stop accepting work, drain the queue and wait for the workers
    pub async fn shutdown(mut self) -> GatewayResult<StatsSnapshot> {
        self.sender.take();
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }

        let workers = self.workers.len();
        let mut failed = 0;
        for handle in self.workers.drain(..) {
            if let Err(err) = handle.await {
                error!("Worker ended abnormally: {err}");
                failed += 1;
            }
        }

        let stats = self.ctx.stats.snapshot();
        info!(
            "Gateway stopped: {} received, {} processed, {} rejected",
            stats.received, stats.processed, stats.rejected
        );
        if failed > 0 {
            return Err(GatewayError::WorkerFailed { failed, workers });
        }
        Ok(stats)
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}
