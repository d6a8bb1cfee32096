//! Seedable uniform random source shared by every stochastic component.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

pub trait RandomSource: Send + Sync {
    /// Uniform float in [0, 1)
    fn next_unit(&self) -> f64;

    /// Raw integer draw, used as a sort key when shuffling
    fn next_u64(&self) -> u64;

    /// Uniform float in [min, max)
    fn next_float(&self, min: f64, max: f64) -> f64 {
        self.next_unit() * (max - min) + min
    }
}

/// `StdRng` behind a mutex so stocks, the engine and the news desk can share it.
/// A seed of 0 means "seed from entropy".
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            StdRng::from_entropy()
        } else {
            StdRng::seed_from_u64(seed)
        };
        Self { rng: Mutex::new(rng) }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&self) -> f64 {
        self.rng.lock().unwrap().gen::<f64>()
    }

    fn next_u64(&self) -> u64 {
        self.rng.lock().unwrap().gen::<u64>()
    }
}

/// Always yields the same unit value. Handy for pinning a price path.
#[derive(Clone, Copy, Debug)]
pub struct ConstantRandom(pub f64);

impl RandomSource for ConstantRandom {
    fn next_unit(&self) -> f64 {
        self.0
    }

    fn next_u64(&self) -> u64 {
        0
    }
}
