use log::debug;

use crate::erosion::{thermal_scree, MapRequest, RidgeConfig, ScreeConfig};
use crate::error::Result;
use crate::grid::filters::{clamp_max_smooth, smooth_cpulse};
use crate::grid::Grid;
use crate::hydrology::flow_accumulation_dinf;

/// Tilt added along `i`, per grid length, so flat areas still route.
const FLAT_TILT: f32 = 1e-3;
const LANDING_WIDTH_RATIO: f32 = 0.1;

/// Carves ridge-and-gully patterns along the drainage network.
///
/// The log of the D-infinity contributing area, saturated at
/// `erosion_factor`, gives a channel depth in `[0, 1]`. That depth is widened
/// into talus-sloped gullies with [`thermal_scree`] (soft landing ratio
/// `smoothing_factor`) and subtracted from `z` scaled by `intensity`.
pub fn hydraulic_ridge(z: &mut Grid, config: &RidgeConfig) -> Result<()> {
    config.validate()?;
    z.ensure_min_size(5)?;
    debug!(
        "hydraulic_ridge: shape={:?} talus={} intensity={}",
        z.shape(),
        config.talus,
        config.intensity
    );

    let tilt = FLAT_TILT / z.nx() as f32;
    let mut depth = Grid::par_from_fn(z.nx(), z.ny(), |i, j| z[(i, j)] + tilt * i as f32);
    smooth_cpulse(&mut depth, config.prefilter_ir);

    depth = flow_accumulation_dinf(&depth, config.talus)?;
    depth.map_inplace(f32::log10);
    let ceiling = depth.filled_like(config.erosion_factor);
    clamp_max_smooth(&mut depth, &ceiling, config.erosion_factor);
    depth.clamp_min(0.0);
    depth.remap(0.0, 1.0);

    let scree = ScreeConfig {
        seed: config.seed,
        zmax: Some(2.0 * config.erosion_factor),
        zmin: Some(0.0),
        noise_ratio: config.noise_ratio,
        landing_talus_ratio: config.smoothing_factor,
        landing_width_ratio: LANDING_WIDTH_RATIO,
        talus_constraint: false,
    };
    thermal_scree(&mut depth, config.talus, &scree, MapRequest::NONE)?;

    depth *= config.intensity;
    *z -= &depth;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slope(n: usize) -> Grid {
        Grid::from_fn(n, n, |i, j| 1.0 - i as f32 / n as f32 + 0.02 * (0.7 * j as f32).sin())
    }

    /// Largest and smallest carving depth away from the extrapolated frame.
    fn carved_range(before: &Grid, after: &Grid) -> (f32, f32) {
        let n = before.nx();
        let mut range = (f32::MAX, f32::MIN);
        for i in 2..n - 2 {
            for j in 2..n - 2 {
                let d = before[(i, j)] - after[(i, j)];
                range = (range.0.min(d), range.1.max(d));
            }
        }
        range
    }

    #[test]
    fn test_only_lowers_terrain() {
        let mut z = slope(32);
        let before = z.clone();
        hydraulic_ridge(&mut z, &RidgeConfig::default()).unwrap();
        let (lo, hi) = carved_range(&before, &z);
        assert!(lo >= -1e-6);
        assert!(hi > 0.0);
    }

    #[test]
    fn test_carving_depth_bounded_by_intensity() {
        let mut z = slope(32);
        let before = z.clone();
        let cfg = RidgeConfig {
            intensity: 0.25,
            ..Default::default()
        };
        hydraulic_ridge(&mut z, &cfg).unwrap();
        let (_, hi) = carved_range(&before, &z);
        assert!(hi <= 0.25 + 1e-5);
    }

    #[test]
    fn test_rejects_non_positive_talus() {
        let mut z = slope(16);
        let cfg = RidgeConfig {
            talus: 0.0,
            ..Default::default()
        };
        assert!(hydraulic_ridge(&mut z, &cfg).is_err());
    }
}
