//! Scree deposition by flood-filling from stable cells.

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::erosion::{DepositionTracker, ErosionMaps, MapRequest, ScreeConfig};
use crate::error::{ErosionError, Result};
use crate::grid::gradient::gradient_talus;
use crate::grid::neighbors::MOORE;
use crate::grid::Grid;

/// Width of the frame that is never raised and is extrapolated at the end.
const FRAME: usize = 2;

/// Uniform multiplier in `[1 - ratio, 1 + ratio]`.
#[inline]
fn jitter(rng: &mut ChaCha8Rng, ratio: f32) -> f32 {
    1.0 + ratio * (2.0 * rng.random::<f32>() - 1.0)
}

/// Drapes scree slopes of gradient `talus` below the stable cells of `z`.
///
/// Seeds are the cells of the inner area (two cells away from the border)
/// with `zmin < z < zmax · rd`, where `rd` is a random factor in
/// `[1 − noise_ratio, 1 + noise_ratio]`; with `talus_constraint` the local
/// slope must also be below `talus`. Seeds are processed highest first from
/// a stack. A popped cell raises every neighbour lying more than
/// `dist · talus · rd` below it up to that level and pushes it on the stack,
/// so each seed spreads a talus-sloped apron until it meets higher ground.
///
/// With `landing_talus_ratio < 1` the slope flattens to that ratio near the
/// original ground and steepens back to the full talus over a height of
/// `talus / landing_width_ratio`.
pub fn thermal_scree(z: &mut Grid, talus: f32, config: &ScreeConfig, maps: MapRequest) -> Result<ErosionMaps> {
    if !(talus > 0.0) {
        return Err(ErosionError::NonPositiveTalus(talus));
    }
    z.ensure_min_size(2 * FRAME + 1)?;
    config.validate()?;

    let tracker = DepositionTracker::begin(z, maps);
    let (nx, ny) = z.shape();
    let zmax = config.zmax.unwrap_or_else(|| z.max());
    let zmin = config.zmin.unwrap_or_else(|| z.min());
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let local_talus = config.talus_constraint.then(|| gradient_talus(z));
    let mut seeds = Vec::new();
    for i in FRAME..nx - FRAME {
        for j in FRAME..ny - FRAME {
            let rd = jitter(&mut rng, config.noise_ratio);
            let h = z[(i, j)];
            let stable = local_talus.as_ref().map_or(true, |t| t[(i, j)] <= talus);
            if h > zmin && h < zmax * rd && stable {
                seeds.push((h, i, j));
            }
        }
    }
    seeds.sort_by(|a, b| a.0.total_cmp(&b.0));
    debug!(
        "thermal_scree: shape={:?} talus={} seeds={}",
        z.shape(),
        talus,
        seeds.len()
    );

    let mut stack: Vec<(usize, usize)> = seeds.into_iter().map(|(_, i, j)| (i, j)).collect();
    let soft_landing = config.landing_talus_ratio != 1.0;
    let z0 = soft_landing.then(|| z.clone());
    let inside = |p: usize, q: usize| p >= FRAME && q >= FRAME && p < nx - FRAME && q < ny - FRAME;

    while let Some((i, j)) = stack.pop() {
        for o in MOORE {
            let (p, q) = o.apply(i, j);
            let rd = jitter(&mut rng, config.noise_ratio);
            if !inside(p, q) {
                continue;
            }
            let mut dz = o.dist * talus * rd;
            if let Some(z0) = &z0 {
                let r = config.landing_talus_ratio;
                let closeness = (config.landing_width_ratio * (z[(i, j)] - z0[(p, q)]).abs() / talus).min(1.0);
                dz *= r + (1.0 - r) * closeness;
            }
            let h = z[(i, j)] - dz;
            if h > z[(p, q)] {
                z[(p, q)] = h;
                stack.push((p, q));
            }
        }
    }

    z.extrapolate_borders_n(FRAME);
    Ok(tracker.finish(z))
}
