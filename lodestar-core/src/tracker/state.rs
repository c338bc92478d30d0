//! Per-device tracked state
//!
//! ## State Machine
//!
//! ```text
//!              valid fix                3rd weak fix in a row
//!  Inactive ─────────────► Active ───────────────────────► Error
//!     ▲                      ▲                               │
//!     │ reset                └────── fix with conf ≥ 0.5 ────┘
//!     │
//!  Offline  ◄── marked externally when no update arrives in time
//! ```
//!
//! `Offline` is left only through a reset. A weak fix is one with confidence
//! below 0.5; an estimate too poor to be used at all (below 0.3) also counts
//! toward the streak but does not move the device. Only an `Active` device
//! can enter `Error`: one that was never located stays `Inactive`.

use std::collections::{BTreeMap, VecDeque};

use log::info;
use serde::Serialize;

use crate::buffer::CircularBuffer;
use crate::constants::tracking::{HEALTHY_FIX_CONFIDENCE, MOVEMENT_HISTORY_LEN};
use crate::device::DeviceId;
use crate::grid::Cell;
use crate::moves::{Heading, MoveCommand};
use crate::signal::{ProcessedSignal, SignalMemory, SignalStatistics};
use crate::time::Timestamp;

/// Lifecycle status of a tracked device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    /// Known, but no fix yet
    #[default]
    Inactive,
    /// Receiving usable fixes
    Active,
    /// Too many weak fixes in a row
    Error,
    /// No recent updates
    Offline,
}

impl DeviceStatus {
    /// Wire name, e.g. `"ACTIVE"`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "INACTIVE",
            Self::Active => "ACTIVE",
            Self::Error => "ERROR",
            Self::Offline => "OFFLINE",
        }
    }
}

/// One entry of the movement history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocationRecord {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
    /// When the fix was recorded
    pub timestamp: Timestamp,
}

impl LocationRecord {
    /// Cell address
    pub fn cell(&self) -> Cell {
        Cell::new(self.x, self.y)
    }
}

/// Everything the gateway remembers about one device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    id: DeviceId,
    current_location: Option<Cell>,
    previous_location: Option<Cell>,
    smoothed_rssi: BTreeMap<String, f64>,
    #[serde(skip)]
    signal_history: BTreeMap<String, VecDeque<f64>>,
    #[serde(skip)]
    history_len: usize,
    confidence: f64,
    consecutive_low_confidence: u32,
    orientation: Heading,
    status: DeviceStatus,
    movement_history: CircularBuffer<LocationRecord, MOVEMENT_HISTORY_LEN>,
    instruction_queue: Vec<MoveCommand>,
    instruction_cursor: usize,
    last_update: Option<Timestamp>,
    cycles: u64,
    total_samples: u64,
}

impl DeviceState {
    pub(crate) fn new(id: DeviceId, orientation: Heading, history_len: usize) -> Self {
        Self {
            id,
            current_location: None,
            previous_location: None,
            smoothed_rssi: BTreeMap::new(),
            signal_history: BTreeMap::new(),
            history_len,
            confidence: 0.0,
            consecutive_low_confidence: 0,
            orientation,
            status: DeviceStatus::Inactive,
            movement_history: CircularBuffer::new(),
            instruction_queue: Vec::new(),
            instruction_cursor: 0,
            last_update: None,
            cycles: 0,
            total_samples: 0,
        }
    }

    /// Device identifier
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// Cell of the latest adopted fix
    pub fn current_location(&self) -> Option<Cell> {
        self.current_location
    }

    /// Cell of the fix before that
    pub fn previous_location(&self) -> Option<Cell> {
        self.previous_location
    }

    /// Confidence of the last recorded fix
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Weak or unusable estimates in a row
    pub fn consecutive_low_confidence(&self) -> u32 {
        self.consecutive_low_confidence
    }

    /// Facing after the last dispatched batch
    pub fn orientation(&self) -> Heading {
        self.orientation
    }

    /// Lifecycle status
    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    /// Time of the last message
    pub fn last_update(&self) -> Option<Timestamp> {
        self.last_update
    }

    /// Messages processed for this device
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Raw samples received over all messages
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Latest smoothed RSSI per beacon
    pub fn smoothed_rssi(&self) -> &BTreeMap<String, f64> {
        &self.smoothed_rssi
    }

    /// Up to the last ten fixes, oldest first
    pub fn movement_history(&self) -> impl Iterator<Item = &LocationRecord> {
        self.movement_history.iter()
    }

    /// The last `n` fixes, oldest first
    pub fn location_history(&self, n: usize) -> Vec<LocationRecord> {
        self.movement_history.recent(n).copied().collect()
    }

    /// `current - previous`, when both are known
    pub fn movement_vector(&self) -> Option<(i32, i32)> {
        let (current, previous) = (self.current_location?, self.previous_location?);
        Some((current.x - previous.x, current.y - previous.y))
    }

    /// The full planned sequence, dispatched or not
    pub fn instruction_queue(&self) -> &[MoveCommand] {
        &self.instruction_queue
    }

    /// Index of the next move to dispatch
    pub fn instruction_cursor(&self) -> usize {
        self.instruction_cursor
    }

    /// Next move to dispatch
    pub fn current_instruction(&self) -> Option<MoveCommand> {
        self.instruction_queue.get(self.instruction_cursor).copied()
    }

    /// Moves not yet dispatched
    pub fn pending_instructions(&self) -> &[MoveCommand] {
        &self.instruction_queue[self.instruction_cursor..]
    }

    /// Statistics of the smoothed RSSI history per beacon
    pub fn signal_statistics(&self) -> BTreeMap<String, SignalStatistics> {
        self.signal_history
            .iter()
            .map(|(beacon, values)| {
                let values: Vec<f64> = values.iter().copied().collect();
                (beacon.clone(), SignalStatistics::from_history(&values))
            })
            .collect()
    }

    fn set_status(&mut self, status: DeviceStatus) {
        if self.status != status {
            info!("Device {}: {:?} -> {:?}", self.id, self.status, status);
            self.status = status;
        }
    }

    fn bump_low_confidence(&mut self, limit: u32) {
        self.consecutive_low_confidence = self.consecutive_low_confidence.saturating_add(1);
        if self.consecutive_low_confidence >= limit && self.status == DeviceStatus::Active {
            self.set_status(DeviceStatus::Error);
        }
    }

    /// Mark that a message arrived
    pub(crate) fn touch(&mut self, now: Timestamp, samples: usize) {
        self.last_update = Some(now);
        self.cycles += 1;
        self.total_samples += samples as u64;
    }

    /// Adopt a usable fix
    pub(crate) fn record_fix(&mut self, cell: Cell, confidence: f64, now: Timestamp, low_limit: u32) {
        self.previous_location = self.current_location;
        self.current_location = Some(cell);
        self.confidence = confidence;
        self.last_update = Some(now);
        self.movement_history.push(LocationRecord { x: cell.x, y: cell.y, timestamp: now });

        if confidence >= HEALTHY_FIX_CONFIDENCE {
            self.consecutive_low_confidence = 0;
            if self.status != DeviceStatus::Offline {
                self.set_status(DeviceStatus::Active);
            }
        } else {
            if self.status == DeviceStatus::Inactive {
                self.set_status(DeviceStatus::Active);
            }
            self.bump_low_confidence(low_limit);
        }
    }

    /// Count an estimate too poor to adopt
    pub(crate) fn record_low_confidence(&mut self, low_limit: u32) {
        self.bump_low_confidence(low_limit);
    }

    /// Remember this cycle's smoothed values; missing beacons keep their last value
    pub(crate) fn update_signal(&mut self, signal: &ProcessedSignal) {
        for (beacon, smoothed) in signal.measured() {
            self.smoothed_rssi.insert(beacon.to_string(), smoothed);
            let history = self.signal_history.entry(beacon.to_string()).or_default();
            history.push_back(smoothed);
            while history.len() > self.history_len {
                history.pop_front();
            }
        }
    }

    pub(crate) fn set_orientation(&mut self, heading: Heading) {
        self.orientation = heading;
    }

    /// Replace the queue and start dispatching from its beginning
    pub(crate) fn set_instructions(&mut self, commands: Vec<MoveCommand>) {
        self.instruction_queue = commands;
        self.instruction_cursor = 0;
    }

    /// Take up to `limit` undispatched moves, advancing the cursor past them
    pub(crate) fn take_batch(&mut self, limit: usize) -> Vec<MoveCommand> {
        let end = self.instruction_cursor.saturating_add(limit).min(self.instruction_queue.len());
        let batch = self.instruction_queue[self.instruction_cursor..end].to_vec();
        self.instruction_cursor = end;
        batch
    }

    pub(crate) fn mark_offline(&mut self) {
        self.set_status(DeviceStatus::Offline);
    }

    /// Back to `Inactive`; movement and signal history are kept
    pub(crate) fn reset(&mut self) {
        self.current_location = None;
        self.previous_location = None;
        self.confidence = 0.0;
        self.instruction_queue.clear();
        self.instruction_cursor = 0;
        self.consecutive_low_confidence = 0;
        self.set_status(DeviceStatus::Inactive);
    }
}

impl SignalMemory for DeviceState {
    fn previous_smoothed(&self, beacon: &str) -> Option<f64> {
        self.smoothed_rssi.get(beacon).copied()
    }

    fn recent_smoothed(&self, beacon: &str, count: usize) -> Vec<f64> {
        self.signal_history
            .get(beacon)
            .map(|h| h.iter().skip(h.len().saturating_sub(count)).copied().collect())
            .unwrap_or_default()
    }
}
