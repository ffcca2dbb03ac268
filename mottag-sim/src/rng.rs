//! Explicitly seeded random source for the motion and observation models

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Seeded generator handed to every stochastic step.
///
/// The seed is kept so a run can be logged and replayed.
#[derive(Debug, Clone)]
pub struct SimRng {
    rng: StdRng,
    seed: u64,
}

impl SimRng {
    /// Creates a generator from a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Creates a generator from a freshly drawn seed.
    pub fn from_entropy() -> Self {
        Self::seeded(rand::random::<u64>())
    }

    /// Seeded when `seed` is given, from entropy otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    /// Seed this generator was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Gaussian sample with the given mean and standard deviation.
    ///
    /// A standard deviation of zero returns `mean` exactly.
    pub fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        mean + std_dev * z
    }
}
