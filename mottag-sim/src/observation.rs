//! RSSI observation model (log-distance path loss with Gaussian noise)

use std::ops::Index;

use mottag_common::{SimConfig, ANTENNA_COUNT};
use serde::{Deserialize, Serialize};

use crate::geometry::{Antenna, Point2};
use crate::rng::SimRng;

/// Distances are floored here before taking the logarithm.
pub const MIN_DISTANCE: f64 = 0.1;

/// Log-distance path-loss parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathLossModel {
    /// RSSI at 1 unit distance (dBm)
    pub rssi_at_1m: f64,
    /// Path-loss exponent
    pub pathloss_exponent: f64,
    /// Noise standard deviation (dB)
    pub noise_std: f64,
}

impl Default for PathLossModel {
    fn default() -> Self {
        Self {
            rssi_at_1m: -40.0,
            pathloss_exponent: 2.0,
            noise_std: 1.0,
        }
    }
}

impl PathLossModel {
    /// Model parameters from the run configuration.
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            rssi_at_1m: config.rssi_at_1m,
            pathloss_exponent: config.pathloss_exponent,
            noise_std: config.noise_std,
        }
    }

    /// Noise-free RSSI at `distance`: `rssi_at_1m - 10 n log10(max(d, 0.1))`.
    pub fn mean_rssi(&self, distance: f64) -> f64 {
        let d = distance.max(MIN_DISTANCE);
        self.rssi_at_1m - 10.0 * self.pathloss_exponent * d.log10()
    }
}

/// One noisy RSSI reading of `target` as seen by the antenna at `antenna`.
pub fn observe(target: Point2, antenna: Point2, model: &PathLossModel, rng: &mut SimRng) -> f64 {
    let mean = model.mean_rssi(target.distance_to(&antenna));
    rng.gaussian(mean, model.noise_std)
}

/// Readings for every antenna, drawn independently in configuration order.
pub fn observe_all(
    target: Point2,
    antennas: &[Antenna; ANTENNA_COUNT],
    model: &PathLossModel,
    rng: &mut SimRng,
) -> ObservationVector {
    ObservationVector(antennas.map(|a| observe(target, a.position, model, rng)))
}

/// Readings of one tick, indexed like the antenna list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationVector(pub [f64; ANTENNA_COUNT]);

impl ObservationVector {
    /// Readings as a slice
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Iterator over readings
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }

    /// Strongest reading
    pub fn max(&self) -> f64 {
        self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Weakest reading
    pub fn min(&self) -> f64 {
        self.0.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Spread between strongest and weakest reading
    pub fn range(&self) -> f64 {
        self.max() - self.min()
    }
}

impl Index<usize> for ObservationVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl std::fmt::Display for ObservationVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, r) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "A{i}:{r:6.1} dBm")?;
        }
        Ok(())
    }
}
