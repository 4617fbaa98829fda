//! Multi-octave fractal Brownian motion (fBm) noise on a grid.

use serde::{Deserialize, Serialize};
use simdnoise::NoiseBuilder;

use crate::grid::Grid;

/// Configuration for multi-octave fractal noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalNoiseConfig {
    /// Number of noise octaves.
    pub octaves: u8,
    /// Base frequency in cycles per cell.
    pub frequency: f32,
    /// Frequency multiplier per octave (typically 2.0).
    pub lacunarity: f32,
    /// Amplitude decay per octave.
    pub persistence: f32,
    pub seed: i32,
}

impl Default for FractalNoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 8,
            frequency: 0.05,
            lacunarity: 2.0,
            persistence: 0.5,
            seed: 1,
        }
    }
}

impl FractalNoiseConfig {
    /// Default octaves with the given base frequency and seed.
    pub fn new(frequency: f32, seed: i32) -> Self {
        Self {
            frequency,
            seed,
            ..Default::default()
        }
    }
}

/// Fractal gradient noise sampled on an `nx` x `ny` grid.
///
/// Each octave uses its own seed and the sum is divided by the total
/// amplitude. The raw range depends on the simdnoise backend, so callers
/// remap the result.
pub fn fbm_grid(nx: usize, ny: usize, config: &FractalNoiseConfig) -> Grid {
    let mut total = Grid::new(nx, ny);
    if total.is_empty() {
        return total;
    }
    let mut amplitude = 1.0f32;
    let mut frequency = config.frequency;
    let mut max_amplitude = 0.0f32;

    for octave in 0..config.octaves {
        let octave_seed = config.seed.wrapping_add(octave as i32 * 31337);
        // simdnoise fills x fastest, so x runs along j.
        let values = NoiseBuilder::gradient_2d(ny, nx)
            .with_seed(octave_seed)
            .with_freq(frequency)
            .generate()
            .0;
        for (t, v) in total.as_mut_slice().iter_mut().zip(values) {
            *t += amplitude * v;
        }

        max_amplitude += amplitude;
        amplitude *= config.persistence;
        frequency *= config.lacunarity;
    }

    if max_amplitude > 0.0 {
        total *= 1.0 / max_amplitude;
    }
    total
}
