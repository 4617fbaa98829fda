//! Gridded noise for perturbing erosion patterns.
//!
//! Uses simdnoise for SIMD-accelerated gradient noise.

mod fractal;

pub use fractal::{fbm_grid, FractalNoiseConfig};
