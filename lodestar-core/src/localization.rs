//! Fingerprint Localization
//!
//! ## Overview
//!
//! Classifies a cleaned RSSI vector against every cell of the radio map with
//! a naive Bayes likelihood and reports the best cell together with how much
//! that answer can be trusted.
//!
//! ## Likelihood
//!
//! For each cell, starting from 1.0, every map beacon contributes one factor:
//!
//! | Situation | Factor |
//! |-----------|--------|
//! | beacon not heard (`-100`) or absent from the reading | 0.01 |
//! | cell has no statistics for the beacon, or `std <= 0` | 0.01 |
//! | otherwise | `max(N(rssi; mean, std), 1e-10)` |
//!
//! The product is accumulated as a sum of logarithms and rescaled by the best
//! cell before exponentiating, so dozens of beacons cannot underflow it.
//! Relative weights are floored at `e^-700`: every cell keeps a nonzero
//! probability. Likelihoods are then normalized to a probability distribution
//! over cells and sorted descending.
//!
//! ## Confidence Metrics
//!
//! - **confidence**: probability of the best cell
//! - **discrimination ratio**: best / second best (`inf` with one cell or a
//!   zero runner-up); near 1 means two cells are equally plausible
//! - **uncertainty**: Shannon entropy of the distribution divided by
//!   `log2(cells)`; 0 is certain, 1 is uniform
//!
//! | Status | Condition |
//! |--------|-----------|
//! | `HIGH_CONFIDENCE` | confidence ≥ threshold (0.7) and ratio ≥ 2 |
//! | `MEDIUM_CONFIDENCE` | confidence ≥ 0.5 |
//! | `LOW_CONFIDENCE` | confidence ≥ 0.3 |
//! | `UNCERTAIN` | otherwise; estimate is invalid |
//! | `LOCALIZATION_FAILED` | fewer than two beacons heard, or no cell matched |

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;

use crate::constants::localization::{
    DEFAULT_LOCATION_CONFIDENCE, DENSITY_FLOOR, HIGH_DISCRIMINATION_RATIO,
    MEDIUM_LOCATION_CONFIDENCE, MIN_BEACONS_FOR_FIX, MIN_RELATIVE_LOG_LIKELIHOOD,
    MISSING_BEACON_LIKELIHOOD, TOP_CANDIDATES, VALID_FIX_CONFIDENCE,
};
use crate::constants::signal::{RSSI_MISSING_DBM, RSSI_PROXIMITY_WARN_DBM, RSSI_WEAK_WARN_DBM};
use crate::errors::{CoreResult, NavError};
use crate::grid::Cell;
use crate::radiomap::{BeaconStats, RadioMap};

/// Quality band of a location fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationStatus {
    /// Confident and well separated from the runner-up
    HighConfidence,
    /// Usable, moderately confident
    MediumConfidence,
    /// Usable but weak
    LowConfidence,
    /// Too uncertain to adopt
    Uncertain,
    /// No estimate could be made
    LocalizationFailed,
}

impl LocationStatus {
    /// Wire name, e.g. `"HIGH_CONFIDENCE"`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighConfidence => "HIGH_CONFIDENCE",
            Self::MediumConfidence => "MEDIUM_CONFIDENCE",
            Self::LowConfidence => "LOW_CONFIDENCE",
            Self::Uncertain => "UNCERTAIN",
            Self::LocalizationFailed => "LOCALIZATION_FAILED",
        }
    }
}

impl fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a fix could not be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Fewer than two beacons heard
    InsufficientBeacons,
    /// Total likelihood collapsed to zero
    NoMatch,
    /// No radio map loaded
    RadioMapUnavailable,
    /// Preprocessing judged the window too unreliable to localize
    WeakSignal,
}

impl FailureReason {
    /// The failure a localization error maps to, if any
    pub fn from_error(err: &NavError) -> Option<Self> {
        match err {
            NavError::InsufficientBeacons { .. } => Some(Self::InsufficientBeacons),
            NavError::NoMatch => Some(Self::NoMatch),
            NavError::RadioMapUnavailable { .. } => Some(Self::RadioMapUnavailable),
            _ => None,
        }
    }
}

/// One ranked cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Radio map key of the cell
    pub cell_id: String,
    /// Cell column
    pub x: i32,
    /// Cell row
    pub y: i32,
    /// Normalized probability
    pub probability: f64,
}

impl Candidate {
    /// Cell address
    pub fn cell(&self) -> Cell {
        Cell::new(self.x, self.y)
    }
}

/// Result of localizing one RSSI vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationEstimate {
    /// Best cell; `None` when localization failed
    pub best: Option<Candidate>,
    /// Probability of the best cell, 0 on failure
    pub confidence: f64,
    /// Best over second-best probability
    pub discrimination_ratio: f64,
    /// Normalized entropy of the posterior
    pub uncertainty: f64,
    /// Quality band
    pub status: LocationStatus,
    /// Confidence reached the minimum for a usable fix (0.3)
    pub valid: bool,
    /// Beacons heard, i.e. not at the sentinel
    pub valid_beacons: usize,
    /// Up to three best cells
    pub top_candidates: Vec<Candidate>,
    /// RSSI values outside the plausible band
    pub warnings: Vec<String>,
    /// Why localization failed, if it did
    pub failure: Option<FailureReason>,
}

impl LocationEstimate {
    /// A failed estimate with zero confidence
    pub fn failed(reason: FailureReason, valid_beacons: usize) -> Self {
        Self {
            best: None,
            confidence: 0.0,
            discrimination_ratio: 0.0,
            uncertainty: 1.0,
            status: LocationStatus::LocalizationFailed,
            valid: false,
            valid_beacons,
            top_candidates: Vec::new(),
            warnings: Vec::new(),
            failure: Some(reason),
        }
    }

    /// No cell was chosen
    pub fn is_failed(&self) -> bool {
        self.status == LocationStatus::LocalizationFailed
    }

    /// Address of the best cell
    pub fn cell(&self) -> Option<Cell> {
        self.best.as_ref().map(Candidate::cell)
    }

    /// Radio map key of the best cell
    pub fn cell_id(&self) -> Option<&str> {
        self.best.as_ref().map(|c| c.cell_id.as_str())
    }
}

/// Normal probability density
pub fn gaussian_pdf(x: f64, mean: f64, std: f64) -> f64 {
    let z = (x - mean) / std;
    (-0.5 * z * z).exp() / (std * (2.0 * PI).sqrt())
}

/// Naive Bayes classifier over a shared radio map
#[derive(Debug, Clone)]
pub struct FingerprintLocalizer {
    map: Arc<RadioMap>,
    confidence_threshold: f64,
}

impl FingerprintLocalizer {
    /// Localizer over `map` with the default confidence threshold
    pub fn new(map: Arc<RadioMap>) -> Self {
        Self { map, confidence_threshold: DEFAULT_LOCATION_CONFIDENCE }
    }

    /// Confidence needed (with a 2× discrimination ratio) for `HIGH_CONFIDENCE`
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// The map cells are scored against
    pub fn radio_map(&self) -> &RadioMap {
        &self.map
    }

    /// Beacons the localizer considers, taken from the map
    pub fn beacon_ids(&self) -> &[String] {
        self.map.beacon_ids()
    }

    /// Locate the cell that best explains `rssi`
    ///
    /// Beacons not in the map are ignored. Never fails hard: a vector that
    /// cannot be localized yields a `LOCALIZATION_FAILED` estimate.
    pub fn locate(&self, rssi: &BTreeMap<String, f64>) -> LocationEstimate {
        let heard = |b: &String| rssi.get(b).is_some_and(|&v| v > RSSI_MISSING_DBM);
        let valid_beacons = self.map.beacon_ids().iter().filter(|&b| heard(b)).count();

        if valid_beacons < MIN_BEACONS_FOR_FIX {
            debug!("Localization skipped: {valid_beacons} beacons heard");
            return LocationEstimate::failed(FailureReason::InsufficientBeacons, valid_beacons);
        }

        let ranked = self.posterior(rssi);
        if ranked.is_empty() {
            warn!("Localization failed: no cell produced a usable likelihood");
            return LocationEstimate::failed(FailureReason::NoMatch, valid_beacons);
        }

        let confidence = ranked[0].probability;
        let discrimination_ratio = match ranked.get(1) {
            Some(second) if second.probability > 0.0 => confidence / second.probability,
            _ => f64::INFINITY,
        };
        let uncertainty = normalized_entropy(ranked.iter().map(|c| c.probability), ranked.len());
        let status = self.classify(confidence, discrimination_ratio);

        let estimate = LocationEstimate {
            best: Some(ranked[0].clone()),
            confidence,
            discrimination_ratio,
            uncertainty,
            status,
            valid: confidence >= VALID_FIX_CONFIDENCE,
            valid_beacons,
            top_candidates: ranked.iter().take(TOP_CANDIDATES).cloned().collect(),
            warnings: rssi_warnings(rssi),
            failure: None,
        };

        debug!(
            "Located at {} (confidence {:.3}, ratio {:.2}, uncertainty {:.3}, {})",
            ranked[0].cell_id, confidence, discrimination_ratio, uncertainty, status
        );
        estimate
    }

    /// Like [`locate`](Self::locate), with failures as errors
    pub fn try_locate(&self, rssi: &BTreeMap<String, f64>) -> CoreResult<LocationEstimate> {
        let estimate = self.locate(rssi);
        match estimate.failure {
            Some(FailureReason::InsufficientBeacons) => Err(NavError::InsufficientBeacons {
                required: MIN_BEACONS_FOR_FIX,
                available: estimate.valid_beacons,
            }),
            Some(_) => Err(NavError::NoMatch),
            None => Ok(estimate),
        }
    }

    /// Normalized probability of every map cell, most probable first
    ///
    /// Does not check how many beacons were heard; empty only when the map
    /// yields no finite likelihood.
    pub fn posterior(&self, rssi: &BTreeMap<String, f64>) -> Vec<Candidate> {
        let scored: Vec<_> = self
            .map
            .cells()
            .map(|fp| (fp, self.log_likelihood(rssi, &fp.beacon_stats)))
            .collect();
        let peak = scored.iter().map(|&(_, ll)| ll).fold(f64::NEG_INFINITY, f64::max);
        if !peak.is_finite() {
            return Vec::new();
        }

        let mut ranked: Vec<Candidate> = scored
            .into_iter()
            .map(|(fp, ll)| Candidate {
                cell_id: fp.cell_id.clone(),
                x: fp.cell.x,
                y: fp.cell.y,
                probability: (ll - peak).max(MIN_RELATIVE_LOG_LIKELIHOOD).exp(),
            })
            .collect();

        let total: f64 = ranked.iter().map(|c| c.probability).sum();
        for candidate in &mut ranked {
            candidate.probability /= total;
        }
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        ranked
    }

    /// Natural log of the naive Bayes likelihood of one cell
    fn log_likelihood(&self, rssi: &BTreeMap<String, f64>, stats: &BTreeMap<String, BeaconStats>) -> f64 {
        self.map
            .beacon_ids()
            .iter()
            .map(|beacon| {
                let observed = rssi.get(beacon).copied().unwrap_or(RSSI_MISSING_DBM);
                let factor = match stats.get(beacon) {
                    _ if observed <= RSSI_MISSING_DBM => MISSING_BEACON_LIKELIHOOD,
                    Some(s) if s.std > 0.0 => gaussian_pdf(observed, s.mean, s.std).max(DENSITY_FLOOR),
                    _ => MISSING_BEACON_LIKELIHOOD,
                };
                factor.ln()
            })
            .sum()
    }

    fn classify(&self, confidence: f64, ratio: f64) -> LocationStatus {
        if confidence >= self.confidence_threshold && ratio >= HIGH_DISCRIMINATION_RATIO {
            LocationStatus::HighConfidence
        } else if confidence >= MEDIUM_LOCATION_CONFIDENCE {
            LocationStatus::MediumConfidence
        } else if confidence >= VALID_FIX_CONFIDENCE {
            LocationStatus::LowConfidence
        } else {
            LocationStatus::Uncertain
        }
    }
}

/// Entropy (bits) of `probabilities` divided by `log2(n)`, 0 when `n <= 1`
pub fn normalized_entropy(probabilities: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let entropy: f64 = probabilities.filter(|&p| p > 0.0).map(|p| -p * p.log2()).sum();
    (entropy / (n as f64).log2()).clamp(0.0, 1.0)
}

/// Readings that are implausibly strong or at the edge of detection
pub fn rssi_warnings(rssi: &BTreeMap<String, f64>) -> Vec<String> {
    rssi.iter()
        .filter(|(_, &v)| v > RSSI_MISSING_DBM)
        .filter_map(|(beacon, &v)| {
            if v > RSSI_PROXIMITY_WARN_DBM {
                Some(format!("beacon {beacon}: RSSI {v:.1} dBm too high (possible proximity)"))
            } else if v < RSSI_WEAK_WARN_DBM {
                Some(format!("beacon {beacon}: RSSI {v:.1} dBm very weak (near detection limit)"))
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radiomap::Fingerprint;

    fn two_cell_map() -> Arc<RadioMap> {
        let s = |m| BeaconStats::new(m, 2.0, 30);
        let cells = vec![
            Fingerprint::new("0,0", Cell::new(0, 0))
                .with_beacon("B1", s(-50.0))
                .with_beacon("B2", s(-80.0)),
            Fingerprint::new("5,5", Cell::new(5, 5))
                .with_beacon("B1", s(-80.0))
                .with_beacon("B2", s(-50.0)),
        ];
        Arc::new(RadioMap::new(cells, BTreeMap::new(), 1.0).unwrap())
    }

    fn reading(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(b, v)| (b.to_string(), *v)).collect()
    }

    #[test]
    fn picks_matching_cell_with_high_confidence() {
        let loc = FingerprintLocalizer::new(two_cell_map());
        let est = loc.locate(&reading(&[("B1", -51.0), ("B2", -79.0)]));

        assert_eq!(est.cell_id(), Some("0,0"));
        assert!(est.confidence > 0.9);
        assert_eq!(est.status, LocationStatus::HighConfidence);
        assert!(est.valid);
        assert_eq!(est.valid_beacons, 2);
        assert_eq!(est.top_candidates.len(), 2);
        assert!(est.uncertainty < 0.1);
    }

    #[test]
    fn one_beacon_is_insufficient() {
        let loc = FingerprintLocalizer::new(two_cell_map());
        let est = loc.locate(&reading(&[("B1", -51.0), ("B2", -100.0)]));

        assert!(est.is_failed());
        assert_eq!(est.confidence, 0.0);
        assert_eq!(est.failure, Some(FailureReason::InsufficientBeacons));
        assert_eq!(est.valid_beacons, 1);
    }

    #[test]
    fn try_locate_reports_errors() {
        let loc = FingerprintLocalizer::new(two_cell_map());
        assert_eq!(
            loc.try_locate(&reading(&[("B1", -51.0)])),
            Err(NavError::InsufficientBeacons { required: 2, available: 1 })
        );
        assert!(loc.try_locate(&reading(&[("B1", -51.0), ("B2", -79.0)])).is_ok());
    }

    #[test]
    fn unknown_beacons_do_not_count() {
        let loc = FingerprintLocalizer::new(two_cell_map());
        let est = loc.locate(&reading(&[("B1", -51.0), ("X7", -60.0)]));
        assert_eq!(est.failure, Some(FailureReason::InsufficientBeacons));
    }

    #[test]
    fn ambiguous_reading_is_not_high_confidence() {
        let loc = FingerprintLocalizer::new(two_cell_map());
        let est = loc.locate(&reading(&[("B1", -65.0), ("B2", -65.0)]));

        assert!((est.confidence - 0.5).abs() < 1e-9);
        assert!((est.discrimination_ratio - 1.0).abs() < 1e-9);
        assert!((est.uncertainty - 1.0).abs() < 1e-9);
        assert_eq!(est.status, LocationStatus::MediumConfidence);
    }

    #[test]
    fn single_cell_map_is_certain() {
        let map = RadioMap::new(
            vec![Fingerprint::new("1,1", Cell::new(1, 1))
                .with_beacon("B1", BeaconStats::new(-60.0, 2.0, 1))
                .with_beacon("B2", BeaconStats::new(-60.0, 2.0, 1))],
            BTreeMap::new(),
            1.0,
        )
        .unwrap();
        let est = FingerprintLocalizer::new(Arc::new(map))
            .locate(&reading(&[("B1", -90.0), ("B2", -90.0)]));

        assert_eq!(est.confidence, 1.0);
        assert!(est.discrimination_ratio.is_infinite());
        assert_eq!(est.uncertainty, 0.0);
    }

    #[test]
    fn zero_std_falls_back_to_missing_likelihood() {
        let stats = BTreeMap::from([("B1".to_string(), BeaconStats::new(-60.0, 0.0, 1))]);
        let loc = FingerprintLocalizer::new(two_cell_map());
        let ll = loc.log_likelihood(&reading(&[("B1", -60.0), ("B2", -60.0)]), &stats);
        // B1 zero std, B2 absent from the cell
        assert!((ll - (0.01f64 * 0.01).ln()).abs() < 1e-9);
    }

    /// Two cells described by `beacons` beacons, all with std 1
    fn wide_map(beacons: usize, first_mean: f64, second_mean: f64) -> Arc<RadioMap> {
        let cell = |id: &str, at: Cell, mean: f64| {
            (0..beacons).fold(Fingerprint::new(id, at), |fp, i| {
                fp.with_beacon(format!("B{i}"), BeaconStats::new(mean, 1.0, 30))
            })
        };
        let cells = vec![cell("0,0", Cell::new(0, 0), first_mean), cell("1,0", Cell::new(1, 0), second_mean)];
        Arc::new(RadioMap::new(cells, BTreeMap::new(), 1.0).unwrap())
    }

    fn flat_reading(beacons: usize, level: f64) -> BTreeMap<String, f64> {
        (0..beacons).map(|i| (format!("B{i}"), level)).collect()
    }

    #[test]
    fn many_beacons_keep_every_cell_nonzero() {
        let loc = FingerprintLocalizer::new(wide_map(40, -45.0, -90.0));
        let posterior = loc.posterior(&flat_reading(40, -40.0));

        assert_eq!(posterior.len(), 2);
        assert_eq!(posterior[0].cell_id, "0,0");
        assert!(posterior.iter().all(|c| c.probability > 0.0));
        let total: f64 = posterior.iter().map(|c| c.probability).sum();
        assert!((total - 1.0).abs() < 1e-12);

        let est = loc.locate(&flat_reading(40, -40.0));
        assert_eq!(est.cell_id(), Some("0,0"));
        assert!(est.failure.is_none());
    }

    #[test]
    fn floored_cells_tie_instead_of_failing() {
        let loc = FingerprintLocalizer::new(wide_map(40, -60.0, -90.0));
        let est = loc.locate(&flat_reading(40, -40.0));

        assert!(est.failure.is_none());
        assert!((est.confidence - 0.5).abs() < 1e-9);
        assert!((est.discrimination_ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn gaussian_density() {
        let peak = gaussian_pdf(0.0, 0.0, 1.0);
        assert!((peak - 0.398_942_280_401_432_7).abs() < 1e-12);
        assert!(gaussian_pdf(100.0, 0.0, 1.0) < DENSITY_FLOOR);
    }

    #[test]
    fn warnings_flag_extremes() {
        let warnings = rssi_warnings(&reading(&[("B1", -35.0), ("B2", -97.0), ("B3", -100.0), ("B4", -60.0)]));
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("B1"));
        assert!(warnings[1].contains("B2"));
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(LocationStatus::LocalizationFailed.to_string(), "LOCALIZATION_FAILED");
        assert_eq!(serde_json::to_string(&LocationStatus::HighConfidence).unwrap(), "\"HIGH_CONFIDENCE\"");
    }
}
