//! Shared white-noise buffer
//!
//! Noise-based percussion reads slices of one buffer instead of
//! generating fresh noise per hit. The buffer is created on first use and
//! is immutable afterwards.

use std::sync::{Arc, OnceLock};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Length of the shared noise buffer in seconds. Longer bursts loop over it.
pub const NOISE_SECONDS: f64 = 1.5;

/// Lazily generated white noise, one per engine
#[derive(Debug)]
pub struct NoiseCache {
    sample_rate: f64,
    seed: u64,
    buffer: OnceLock<Arc<[f32]>>,
}

impl NoiseCache {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_seed(sample_rate, 0x5eed_0c7a)
    }

    pub fn with_seed(sample_rate: f64, seed: u64) -> Self {
        Self {
            sample_rate,
            seed,
            buffer: OnceLock::new(),
        }
    }

    /// The noise buffer, generated on the first call
    pub fn buffer(&self) -> Arc<[f32]> {
        self.buffer
            .get_or_init(|| {
                let len = (self.sample_rate * NOISE_SECONDS).ceil() as usize;
                let mut rng = StdRng::seed_from_u64(self.seed);
                (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
            })
            .clone()
    }

    /// Whether the buffer has been generated yet
    pub fn is_generated(&self) -> bool {
        self.buffer.get().is_some()
    }
}
