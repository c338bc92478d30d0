//! Shared fixtures for the integration tests
//!
//! - Small hand-built grids and radio maps with known answers
//! - Seeded reading generators with Gaussian-ish noise
//! - A pipeline builder on a controllable clock

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use lodestar_core::{
    BeaconStats, Cell, DeviceId, DeviceReading, DeviceStateTracker, Fingerprint, FixedTime,
    GridTopology, NavigationPipeline, PipelineConfig, RadioMap,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Start of every test clock
pub const T0: u64 = 1_700_000_000_000;

/// Open 3 × 3 room, single exit in the top-right corner
pub fn small_room() -> GridTopology {
    GridTopology::from_rows(&["..E", "...", "..."]).unwrap()
}

/// 4 × 4 plan whose bottom-left cell is walled in
pub fn sealed_room() -> GridTopology {
    GridTopology::from_rows(&["...E", "....", "##..", ".#.."]).unwrap()
}

/// Two fingerprints, each dominated by a different beacon
pub fn two_cell_map() -> RadioMap {
    let s = |mean| BeaconStats::new(mean, 2.0, 30);
    RadioMap::new(
        vec![
            Fingerprint::new("0,0", Cell::new(0, 0))
                .with_beacon("B1", s(-50.0))
                .with_beacon("B2", s(-80.0)),
            Fingerprint::new("2,0", Cell::new(2, 0))
                .with_beacon("B1", s(-80.0))
                .with_beacon("B2", s(-50.0)),
        ],
        BTreeMap::new(),
        1.0,
    )
    .unwrap()
}

/// Identical fingerprint at every listed cell: nothing can tell them apart
pub fn uniform_map(cells: &[(i32, i32)]) -> RadioMap {
    let s = BeaconStats::new(-60.0, 2.0, 30);
    let fingerprints = cells.iter().map(|&(x, y)| {
        let cell = Cell::new(x, y);
        Fingerprint::new(cell.cell_id(), cell).with_beacon("B1", s).with_beacon("B2", s)
    });
    RadioMap::new(fingerprints, BTreeMap::new(), 1.0).unwrap()
}

/// Pipeline over `grid`/`map` with a clock the test controls
pub fn pipeline_with(
    config: PipelineConfig,
    grid: GridTopology,
    map: RadioMap,
) -> (NavigationPipeline, Arc<FixedTime>) {
    let clock = Arc::new(FixedTime::new(T0));
    let tracker = Arc::new(DeviceStateTracker::new(&config, clock.clone()));
    let pipeline =
        NavigationPipeline::new(config, Arc::new(grid), Arc::new(map), tracker).unwrap();
    (pipeline, clock)
}

pub fn device(id: &str) -> DeviceId {
    DeviceId::parse(id).unwrap()
}

/// Reading with `n` identical samples per beacon
pub fn steady_reading(id: &str, levels: &[(&str, f64)], n: usize) -> DeviceReading {
    levels.iter().fold(DeviceReading::new(device(id)), |reading, &(beacon, level)| {
        reading.with_samples(beacon, std::iter::repeat(level).take(n))
    })
}

/// Seeded generator of noisy readings
pub struct ReadingGenerator {
    rng: StdRng,
}

impl ReadingGenerator {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// `n` samples around `level`, each within ±`spread` dB
    pub fn samples(&mut self, level: f64, spread: f64, n: usize) -> Vec<f64> {
        (0..n).map(|_| level + self.rng.gen_range(-spread..=spread)).collect()
    }

    /// A reading for every `(beacon, level)` pair
    pub fn reading(&mut self, id: &str, levels: &[(&str, f64)], spread: f64, n: usize) -> DeviceReading {
        let mut reading = DeviceReading::new(device(id));
        for &(beacon, level) in levels {
            let samples = self.samples(level, spread, n);
            reading = reading.with_samples(beacon, samples);
        }
        reading
    }
}
