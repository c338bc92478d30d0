//! Device State Tracking
//!
//! ## Overview
//!
//! The tracker owns one [`DeviceState`] per device identifier. States are
//! created on first contact (or pre-registered), never removed, and only
//! changed through tracker methods.
//!
//! ## Locking
//!
//! ```text
//! RwLock<HashMap<DeviceId, Arc<Mutex<DeviceState>>>>
//!   │                              │
//!   │ read: look up / write:       └── one lock per device: all updates
//!   │ insert a new device              for a device are serialized
//!   ▼
//! different devices proceed in parallel
//! ```
//!
//! The map lock is held only long enough to clone the device's `Arc`. Work
//! for a single device runs under its own mutex via
//! [`DeviceStateTracker::with_device`]; the closure must not block on I/O.
//!
//! A poisoned lock (a panic while holding it) is recovered rather than
//! propagated: the state it guards is plain data that is valid after every
//! individual field write.

pub mod state;

pub use state::{DeviceState, DeviceStatus, LocationRecord};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use log::{debug, info};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::device::DeviceId;
use crate::grid::Cell;
use crate::moves::{Heading, MoveCommand};
use crate::signal::{ProcessedSignal, SignalStatistics};
use crate::time::{elapsed_ms, SystemTime, TimeSource, Timestamp};

/// Telemetry row for one located, active device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSummary {
    /// Device
    pub id: DeviceId,
    /// Current column
    pub x: i32,
    /// Current row
    pub y: i32,
    /// Confidence of the current fix
    pub confidence: f64,
    /// Lifecycle status
    pub status: DeviceStatus,
    /// Last message time
    pub last_update: Option<Timestamp>,
}

/// Point-in-time view of every active device with a location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSnapshot {
    /// Clock time of the snapshot
    pub taken_at: Timestamp,
    /// Located active devices, sorted by id
    pub devices: Vec<DeviceSummary>,
}

type SharedState = Arc<Mutex<DeviceState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, DeviceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Concurrent store of per-device state
pub struct DeviceStateTracker {
    devices: RwLock<HashMap<DeviceId, SharedState>>,
    history_len: usize,
    low_confidence_limit: u32,
    default_heading: Heading,
    time: Arc<dyn TimeSource>,
}

impl std::fmt::Debug for DeviceStateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStateTracker")
            .field("devices", &self.len())
            .field("low_confidence_limit", &self.low_confidence_limit)
            .finish()
    }
}

impl Default for DeviceStateTracker {
    fn default() -> Self {
        Self::new(&PipelineConfig::default(), Arc::new(SystemTime))
    }
}

impl DeviceStateTracker {
    /// Empty tracker using `config`'s limits and the given clock
    pub fn new(config: &PipelineConfig, time: Arc<dyn TimeSource>) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            history_len: config.history_len,
            low_confidence_limit: config.low_confidence_limit,
            default_heading: config.default_heading,
            time,
        }
    }

    /// Current time of the tracker's clock
    pub fn now(&self) -> Timestamp {
        self.time.now()
    }

    /// Weak fixes in a row that raise `Error`
    pub fn low_confidence_limit(&self) -> u32 {
        self.low_confidence_limit
    }

    /// Tracked devices
    pub fn len(&self) -> usize {
        self.devices.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// No tracked devices
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` is tracked
    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.read().unwrap_or_else(PoisonError::into_inner).contains_key(id)
    }

    fn existing(&self, id: &DeviceId) -> Option<SharedState> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }

    fn entry(&self, id: &DeviceId) -> SharedState {
        if let Some(state) = self.existing(id) {
            return state;
        }
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        devices
            .entry(id.clone())
            .or_insert_with(|| {
                debug!("Tracking new device {id}");
                Arc::new(Mutex::new(DeviceState::new(
                    id.clone(),
                    self.default_heading,
                    self.history_len,
                )))
            })
            .clone()
    }

    fn all(&self) -> Vec<SharedState> {
        let devices = self.devices.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<_> = devices.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, s)| s.clone()).collect()
    }

    /// Run `f` with exclusive access to a device's state, creating it if new
    pub fn with_device<R>(&self, id: &DeviceId, f: impl FnOnce(&mut DeviceState) -> R) -> R {
        let state = self.entry(id);
        let mut guard = lock(&state);
        f(&mut guard)
    }

    /// Read a device's state without creating it
    pub fn inspect<R>(&self, id: &DeviceId, f: impl FnOnce(&DeviceState) -> R) -> Option<R> {
        let state = self.existing(id)?;
        let guard = lock(&state);
        Some(f(&guard))
    }

    /// Copy of a device's state
    pub fn get(&self, id: &DeviceId) -> Option<DeviceState> {
        self.inspect(id, DeviceState::clone)
    }

    /// Create states for devices expected to report
    pub fn register_expected<'a>(&self, ids: impl IntoIterator<Item = &'a DeviceId>) {
        for id in ids {
            self.entry(id);
        }
    }

    /// Adopt a usable fix for a device
    pub fn record_fix(&self, id: &DeviceId, cell: Cell, confidence: f64) {
        let now = self.now();
        let limit = self.low_confidence_limit;
        self.with_device(id, |s| s.record_fix(cell, confidence, now, limit));
    }

    /// Count an estimate too poor to adopt
    pub fn record_low_confidence(&self, id: &DeviceId) {
        let limit = self.low_confidence_limit;
        self.with_device(id, |s| s.record_low_confidence(limit));
    }

    /// Store this cycle's smoothed RSSI
    pub fn update_signal(&self, id: &DeviceId, signal: &ProcessedSignal) {
        self.with_device(id, |s| s.update_signal(signal));
    }

    /// Record the facing a device ends up in
    pub fn set_orientation(&self, id: &DeviceId, heading: Heading) {
        self.with_device(id, |s| s.set_orientation(heading));
    }

    /// Replace a device's instruction queue
    pub fn set_instructions(&self, id: &DeviceId, commands: Vec<MoveCommand>) {
        self.with_device(id, |s| s.set_instructions(commands));
    }

    /// Dispatch up to `limit` queued moves
    pub fn take_next_batch(&self, id: &DeviceId, limit: usize) -> Vec<MoveCommand> {
        match self.existing(id) {
            Some(state) => {
                let mut guard = lock(&state);
                guard.take_batch(limit)
            }
            None => Vec::new(),
        }
    }

    /// Next undispatched move
    pub fn current_instruction(&self, id: &DeviceId) -> Option<MoveCommand> {
        self.inspect(id, DeviceState::current_instruction).flatten()
    }

    /// Moves not yet dispatched
    pub fn pending_instructions(&self, id: &DeviceId) -> Vec<MoveCommand> {
        self.inspect(id, |s| s.pending_instructions().to_vec()).unwrap_or_default()
    }

    /// Mark a known device offline; unknown ids are ignored
    pub fn mark_offline(&self, id: &DeviceId) -> bool {
        match self.existing(id) {
            Some(state) => {
                lock(&state).mark_offline();
                true
            }
            None => false,
        }
    }

    /// Mark offline every device silent for longer than `timeout_ms`
    ///
    /// Devices never heard from (pre-registered) are left alone. Returns the
    /// devices newly marked.
    pub fn sweep_stale(&self, timeout_ms: u64) -> Vec<DeviceId> {
        let now = self.now();
        let mut marked = Vec::new();
        for state in self.all() {
            let mut s = lock(&state);
            let stale = s
                .last_update()
                .is_some_and(|last| elapsed_ms(last, now) > timeout_ms);
            if stale && s.status() != DeviceStatus::Offline {
                s.mark_offline();
                marked.push(s.id().clone());
            }
        }
        if !marked.is_empty() {
            info!("Marked {} stale devices offline", marked.len());
        }
        marked
    }

    /// Return a device to `Inactive`, keeping its history
    pub fn reset(&self, id: &DeviceId) -> bool {
        match self.existing(id) {
            Some(state) => {
                lock(&state).reset();
                true
            }
            None => false,
        }
    }

    fn ids_with_status(&self, status: DeviceStatus) -> Vec<DeviceId> {
        self.all()
            .iter()
            .filter_map(|state| {
                let s = lock(state);
                (s.status() == status).then(|| s.id().clone())
            })
            .collect()
    }

    /// Devices currently `Active`, sorted by id
    pub fn active_devices(&self) -> Vec<DeviceId> {
        self.ids_with_status(DeviceStatus::Active)
    }

    /// Devices currently `Inactive`, sorted by id
    pub fn inactive_devices(&self) -> Vec<DeviceId> {
        self.ids_with_status(DeviceStatus::Inactive)
    }

    /// Count of devices per status
    pub fn status_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for state in self.all() {
            *counts.entry(lock(&state).status().as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Mean fix confidence over `Active` devices, 0 if none
    pub fn average_confidence(&self) -> f64 {
        let confidences: Vec<f64> = self
            .all()
            .iter()
            .filter_map(|state| {
                let s = lock(state);
                (s.status() == DeviceStatus::Active).then(|| s.confidence())
            })
            .collect();

        if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f64>() / confidences.len() as f64
        }
    }

    /// The last `n` fixes of a device, oldest first
    pub fn location_history(&self, id: &DeviceId, n: usize) -> Vec<LocationRecord> {
        self.inspect(id, |s| s.location_history(n)).unwrap_or_default()
    }

    /// Offset between the last two fixes
    pub fn movement_vector(&self, id: &DeviceId) -> Option<(i32, i32)> {
        self.inspect(id, DeviceState::movement_vector).flatten()
    }

    /// Per-beacon history statistics
    pub fn signal_statistics(&self, id: &DeviceId) -> Option<BTreeMap<String, SignalStatistics>> {
        self.inspect(id, DeviceState::signal_statistics)
    }

    /// Active devices with a location, for telemetry
    pub fn snapshot(&self) -> FleetSnapshot {
        let devices = self
            .all()
            .iter()
            .filter_map(|state| {
                let s = lock(state);
                let cell = s.current_location()?;
                (s.status() == DeviceStatus::Active).then(|| DeviceSummary {
                    id: s.id().clone(),
                    x: cell.x,
                    y: cell.y,
                    confidence: s.confidence(),
                    status: s.status(),
                    last_update: s.last_update(),
                })
            })
            .collect();

        FleetSnapshot { taken_at: self.now(), devices }
    }
}
