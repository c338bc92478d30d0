//! Signal history statistics
//!
//! Summaries of a device's recent smoothed RSSI per beacon, used for
//! diagnostics and fleet monitoring.

use serde::Serialize;

use crate::constants::signal::TREND_BAND_DB;

/// Direction of recent signal movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Getting stronger (device approaching the beacon)
    Increasing,
    /// Getting weaker
    Decreasing,
    /// Within ±1 dB
    Stable,
    /// Fewer than three values
    InsufficientData,
}

/// Summary of one beacon's smoothed history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalStatistics {
    /// Values in the history
    pub history_len: usize,
    /// Mean of the history
    pub mean: Option<f64>,
    /// Population standard deviation, 0 for a single value
    pub std: Option<f64>,
    /// Direction of the last three values
    pub trend: Trend,
    /// Most recent value
    pub latest: Option<f64>,
}

impl SignalStatistics {
    /// Summarize `history`, oldest first
    pub fn from_history(history: &[f64]) -> Self {
        if history.is_empty() {
            return Self {
                history_len: 0,
                mean: None,
                std: None,
                trend: Trend::InsufficientData,
                latest: None,
            };
        }

        let n = history.len() as f64;
        let mean = history.iter().sum::<f64>() / n;
        let std = if history.len() > 1 {
            (history.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
        } else {
            0.0
        };

        Self {
            history_len: history.len(),
            mean: Some(mean),
            std: Some(std),
            trend: trend(history),
            latest: history.last().copied(),
        }
    }
}

/// Compare the newest of the last three values with the oldest of them
pub fn trend(history: &[f64]) -> Trend {
    let [first, _, last] = match history {
        [.., a, b, c] => [*a, *b, *c],
        _ => return Trend::InsufficientData,
    };

    if last > first + TREND_BAND_DB {
        Trend::Increasing
    } else if last < first - TREND_BAND_DB {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}
