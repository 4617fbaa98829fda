//! Procedural gully carving from oriented Gabor noise.
//!
//! Instead of simulating water, this engine builds a phase field whose
//! isolines follow the local slope direction, maps the phase through an
//! erosion profile and digs the resulting ridge pattern into the terrain.

use std::f32::consts::{FRAC_PI_2, PI};

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::erosion::{ensure_layers, ErosionProfile, ProceduralConfig};
use crate::error::Result;
use crate::grid::filters::smooth_cpulse;
use crate::grid::gradient::{gradient_angle, gradient_norm};
use crate::grid::kernels::{gabor, smoothstep3};
use crate::grid::{lerp, Grid};
use crate::noise::{fbm_grid, FractalNoiseConfig};

/// Gabor kernels per cell, times `density_factor / width²`.
const KERNEL_DENSITY: f32 = 5.0;
/// Samples used to average a profile over one period.
const PROFILE_SAMPLES: usize = 50;
/// Crest noise frequency, in cycles per ridge wavelength.
const CREST_NOISE_CYCLES: f32 = 4.0;

/// Phase folded into `[-1, 1)`, one period per `2π`.
#[inline]
fn fold(phi: f32) -> f32 {
    (phi / PI + 2.0) % 2.0 - 1.0
}

type ProfileFn = Box<dyn Fn(f32) -> f32 + Send + Sync>;

impl ErosionProfile {
    /// The profile as a function of the phase, with sharpness `delta`.
    fn function(self, delta: f32) -> ProfileFn {
        match self {
            ErosionProfile::Cosine => Box::new(|phi: f32| 0.5 - 0.5 * phi.cos()),
            ErosionProfile::SawSharp => Box::new(|phi: f32| {
                let t = fold(phi);
                t - t.trunc()
            }),
            ErosionProfile::SawSmooth => {
                let n = 1.0 + 0.02 / delta;
                let dn = 2.0 * n + 1.0;
                let coeff = 1.0 / ((1.0 / dn).powf(0.5 / n) * 2.0 * n / dn);
                Box::new(move |phi: f32| {
                    let t = fold(phi);
                    0.5 * (1.0 + coeff * t * (1.0 - t.abs().powf(2.0 * n)))
                })
            }
            ErosionProfile::SharpValleys => Box::new(move |phi: f32| {
                let t = fold(phi);
                (1.0 - t * t) / (1.0 + t * t / delta)
            }),
            ErosionProfile::SquareSmooth => {
                Box::new(move |phi: f32| 2.0 * (phi.sin() / 25.0 / delta).atan() / PI)
            }
            ErosionProfile::TriangleGrenier => {
                let sd = delta.sqrt();
                Box::new(move |phi: f32| {
                    let t = fold(phi);
                    ((1.0 + 2.0 * sd) * t * t + delta).sqrt() - sd
                })
            }
            ErosionProfile::TriangleSharp => Box::new(|phi: f32| 1.0 + fold(phi).abs()),
            ErosionProfile::TriangleSmooth => {
                let coeff = 0.5 / ((delta - 1.0).acos() / PI - 0.5);
                Box::new(move |phi: f32| 0.5 + coeff * (((1.0 - delta) * phi.sin()).acos() / PI - 0.5))
            }
        }
    }
}

/// Mean of `f` over evenly spaced phases in `[-π, π]`, end points included.
fn profile_average(f: &ProfileFn) -> f32 {
    let step = 2.0 * PI / (PROFILE_SAMPLES - 1) as f32;
    (0..PROFILE_SAMPLES).map(|k| f(-PI + step * k as f32)).sum::<f32>() / PROFILE_SAMPLES as f32
}

/// Sum of randomly placed Gabor kernels oriented by `theta`.
///
/// Returns the in-phase and quadrature responses.
fn gabor_noise(theta: &Grid, width: usize, kw: f32, density_factor: f32, seed: u64) -> (Grid, Grid) {
    let (nx, ny) = theta.shape();
    let density = density_factor * KERNEL_DENSITY / (width * width) as f32;
    let npoints = (density * (nx * ny) as f32) as usize;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut gx = theta.zeros_like();
    let mut gy = theta.zeros_like();

    for _ in 0..npoints {
        let i = rng.random_range(0..nx);
        let j = rng.random_range(0..ny);
        let angle = theta[(i, j)].to_degrees();
        gx.add_kernel(&gabor(width, kw, angle, false), i, j);
        gy.add_kernel(&gabor(width, kw, angle, true), i, j);
    }
    (gx, gy)
}

/// Default carving mask: steep mid-elevation terrain.
fn default_mask(z: &Grid, zf: &Grid, talus: f32, (vmin, vmax): (f32, f32)) -> Grid {
    let mut mask = gradient_norm(zf).map(|g| smoothstep3(g.min(talus) / talus));
    let range = (vmax - vmin).max(f32::EPSILON);
    mask.zip_apply(z, |m, h| {
        let zn = (h - vmin) / range;
        m * 4.0 * zn * (1.0 - zn)
    });
    mask
}

/// Carves procedural gullies into `z` and returns the ridge mask.
///
/// A Gabor noise oriented along the smoothed slope (across it with
/// `rotate90`) gives a phase field whose isolines run downhill, spaced
/// `ridge_wavelength · nx` cells apart. The phase is mapped through the
/// chosen [`ErosionProfile`], faded toward the profile average where the
/// Gabor response is weak, roughened with crest noise, shifted down by one
/// and added to `z` scaled by `ridge_scaling`.
///
/// The carving is blended in with `mask` when given. Otherwise, with
/// `use_default_mask`, it is restricted to slopes steeper than `talus_mask`
/// and to the middle of `elevation_range`. The returned ridge mask is the
/// unshifted profile times that blending mask.
pub fn hydraulic_procedural(z: &mut Grid, config: &ProceduralConfig, mask: Option<&Grid>) -> Result<Grid> {
    config.validate()?;
    z.ensure_min_size(3)?;
    ensure_layers(z, &[("mask", mask)])?;

    let (nx, ny) = z.shape();
    let ridge_ir = ((config.ridge_wavelength * nx as f32) as usize).max(1);
    let width = ((config.kernel_width_ratio * ridge_ir as f32) as usize).max(1);
    let kw = config.kernel_width_ratio;
    let prefilter_ir = config
        .prefilter_ir
        .unwrap_or_else(|| ((0.25 * width as f32) as usize).max(1));
    let elevation_range = config.elevation_range.unwrap_or_else(|| (z.min(), z.max()));
    debug!(
        "hydraulic_procedural: shape={:?} profile={:?} kernel_width={} prefilter_ir={}",
        z.shape(),
        config.profile,
        width,
        prefilter_ir
    );

    let mut zf = z.clone();
    smooth_cpulse(&mut zf, prefilter_ir);

    // Pass 1 (phase field)
    let mut theta = gradient_angle(&zf, false);
    theta += if config.rotate90 { PI } else { FRAC_PI_2 };
    if config.phase_noise_amp > 0.0 {
        let seed = config.seed.wrapping_add(2) as i32;
        let mut perturbation = fbm_grid(nx, ny, &FractalNoiseConfig::new(1.0 / width as f32, seed));
        perturbation.remap(-config.phase_noise_amp, config.phase_noise_amp);
        theta += &perturbation;
    }
    let (gx, gy) = gabor_noise(&theta, width, kw, config.density_factor, config.seed);
    let mut phase = gy.clone();
    phase.zip_apply(&gx, f32::atan2);
    if config.reverse_phase {
        phase *= -1.0;
    }

    // Pass 2 (profile)
    let profile = config.profile.function(config.delta);
    let average = profile_average(&profile);
    let mut ridges = Grid::par_from_fn(nx, ny, |i, j| {
        let rho = 2.0 / PI * (config.phase_smoothing * gx[(i, j)].hypot(gy[(i, j)])).atan();
        rho * profile(phase[(i, j)]) + (1.0 - rho) * average
    });

    // Pass 3 (crest noise)
    let mut ridge_mask = ridges.clone();
    if config.noise_ratio > 0.0 {
        let frequency = CREST_NOISE_CYCLES / (config.ridge_wavelength * nx as f32);
        let seed = config.seed.wrapping_add(1) as i32;
        let mut noise = fbm_grid(nx, ny, &FractalNoiseConfig::new(frequency, seed));
        noise.remap(0.0, config.noise_ratio);
        ridges.zip_apply(&noise, |r, n| r * (1.0 + n));
    }
    ridges += -1.0;

    // Pass 4 (masked carving)
    let mask = match mask {
        Some(m) => m.clone(),
        None if config.use_default_mask => {
            let talus = config.talus_mask.unwrap_or(2.0 / nx as f32);
            default_mask(z, &zf, talus, elevation_range)
        }
        None => z.filled_like(1.0),
    };
    ridge_mask *= &mask;

    let carved = &*z + &(&ridges * config.ridge_scaling);
    *z = lerp(z, &carved, &mask);
    Ok(ridge_mask)
}
