//! center4 position estimator
//!
//! Picks the four strongest antennas and returns their centroid, pulled
//! toward the stronger antennas when the readings are spread apart:
//!
//! ```text
//! range <= T          ->  geometric center
//! T < range < 2T      ->  linear blend, alpha = range / 2T
//! range >= 2T         ->  signal-weighted center
//! ```
//!
//! Above the threshold the estimate moves continuously toward the weighted
//! center as the spread grows. Crossing the threshold itself steps alpha
//! from 0 to 0.5.

use mottag_common::Error;
use serde::{Deserialize, Serialize};

use crate::geometry::Point2;

/// Number of antennas the estimator averages over.
pub const CENTER4_COUNT: usize = 4;

/// Default RSSI closeness threshold (dBm).
pub const DEFAULT_THRESHOLD: f64 = 2.0;

/// Added to every normalized reading so the weakest antenna keeps a non-zero weight.
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// Estimator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center4Config {
    /// Acceptable dBm spread before weighting kicks in
    pub threshold: f64,
}

impl Default for Center4Config {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Estimate together with the intermediate quantities it was built from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Center4Estimate {
    /// Final estimate
    pub position: Point2,
    /// Unweighted centroid of the selected antennas
    pub geometric_center: Point2,
    /// Signal-weighted centroid; `None` when the readings were balanced
    pub weighted_center: Option<Point2>,
    /// Spread of the selected readings (dBm)
    pub range: f64,
    /// Blend factor toward the weighted center, in `[0, 1]`
    pub alpha: f64,
    /// Indices of the selected antennas, strongest first
    pub selected: [usize; CENTER4_COUNT],
}

/// Anything that turns antenna positions and readings into a position.
pub trait PositionEstimator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Estimates a position from index-aligned positions and readings.
    fn estimate(&self, positions: &[Point2], readings: &[f64]) -> Result<Point2, Error>;
}

/// center4 as a [`PositionEstimator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Center4Estimator {
    config: Center4Config,
}

impl Center4Estimator {
    /// Creates an estimator with the given configuration.
    pub fn new(config: Center4Config) -> Self {
        Self { config }
    }

    /// Estimator configuration
    pub fn config(&self) -> &Center4Config {
        &self.config
    }
}

impl PositionEstimator for Center4Estimator {
    fn name(&self) -> &'static str {
        "center4"
    }

    fn estimate(&self, positions: &[Point2], readings: &[f64]) -> Result<Point2, Error> {
        estimate_center4(positions, readings, &self.config)
    }
}

/// Blend factor toward the weighted center for a given spread.
///
/// 0 at or below the threshold, then `range / 2T` capped at 1.
pub fn blend_alpha(range: f64, threshold: f64) -> f64 {
    if range <= threshold {
        return 0.0;
    }
    if threshold <= 0.0 {
        return 1.0;
    }
    (range / (2.0 * threshold)).min(1.0)
}

/// Runs center4 and returns only the position.
pub fn estimate_center4(
    positions: &[Point2],
    readings: &[f64],
    config: &Center4Config,
) -> Result<Point2, Error> {
    estimate_center4_detailed(positions, readings, config).map(|e| e.position)
}

/// Runs center4 and returns the estimate with its intermediates.
///
/// # Errors
///
/// - [`Error::InsufficientAntennas`] when fewer than four pairs are given
/// - [`Error::Config`] when the slices differ in length or a reading is not finite
pub fn estimate_center4_detailed(
    positions: &[Point2],
    readings: &[f64],
    config: &Center4Config,
) -> Result<Center4Estimate, Error> {
    if positions.len() != readings.len() {
        return Err(Error::Config(format!(
            "center4 got {} positions but {} readings",
            positions.len(),
            readings.len()
        )));
    }
    if readings.len() < CENTER4_COUNT {
        return Err(Error::InsufficientAntennas {
            required: CENTER4_COUNT,
            got: readings.len(),
        });
    }
    if let Some(bad) = readings.iter().find(|r| !r.is_finite()) {
        return Err(Error::Config(format!("center4 reading is not finite: {bad}")));
    }

    // Stable sort: equal readings keep configuration order
    let mut order: Vec<usize> = (0..readings.len()).collect();
    order.sort_by(|&a, &b| readings[b].total_cmp(&readings[a]));
    let mut selected = [0usize; CENTER4_COUNT];
    selected.copy_from_slice(&order[..CENTER4_COUNT]);

    let top_positions = selected.map(|i| positions[i]);
    let top_readings = selected.map(|i| readings[i]);

    let geometric_center = top_positions
        .iter()
        .fold(Point2::zero(), |acc, p| acc + *p)
        * (1.0 / CENTER4_COUNT as f64);

    let max = top_readings[0];
    let min = top_readings[CENTER4_COUNT - 1];
    let range = max - min;

    if range <= config.threshold {
        return Ok(Center4Estimate {
            position: geometric_center,
            geometric_center,
            weighted_center: None,
            range,
            alpha: 0.0,
            selected,
        });
    }

    let weights = top_readings.map(|r| r - min + WEIGHT_EPSILON);
    let total: f64 = weights.iter().sum();
    let weighted_center = top_positions
        .iter()
        .zip(weights.iter())
        .fold(Point2::zero(), |acc, (p, w)| acc + *p * *w)
        * (1.0 / total);

    let alpha = blend_alpha(range, config.threshold);
    Ok(Center4Estimate {
        position: geometric_center.lerp(&weighted_center, alpha),
        geometric_center,
        weighted_center: Some(weighted_center),
        range,
        alpha,
        selected,
    })
}
