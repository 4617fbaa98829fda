use log::debug;

use crate::erosion::{ensure_layers, AlgebraicConfig, DepositionTracker, ErosionMaps, MapRequest};
use crate::error::Result;
use crate::grid::filters::smooth_cpulse;
use crate::grid::gradient::gradient_talus;
use crate::grid::Grid;

/// Algebraic erosion: a closed-form relaxation toward the reference slope.
///
/// Cells steeper than `talus_ref` are lowered by
/// `c_erosion · (talus / talus_ref − 1)`, gentler ones are raised by
/// `c_deposition · (1 − talus / talus_ref)`. The slope is measured on a
/// presmoothed copy when `prefilter_ir > 0`. The field never drops below
/// `bedrock`.
pub fn hydraulic_algebric(
    z: &mut Grid,
    config: &AlgebraicConfig,
    bedrock: Option<&Grid>,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    config.validate()?;
    ensure_layers(z, &[("bedrock", bedrock)])?;
    debug!(
        "hydraulic_algebric: shape={:?} talus_ref={} iterations={}",
        z.shape(),
        config.talus_ref,
        config.iterations
    );

    let tracker = DepositionTracker::begin(z, maps);
    let tr = config.talus_ref;
    let (ce, cd) = (config.c_erosion, config.c_deposition);

    for _ in 0..config.iterations {
        let talus = if config.prefilter_ir > 0 {
            let mut zf = z.clone();
            smooth_cpulse(&mut zf, config.prefilter_ir);
            gradient_talus(&zf)
        } else {
            gradient_talus(z)
        };

        z.zip_apply(&talus, |h, t| {
            if t > tr {
                h - ce * (t / tr - 1.0)
            } else {
                h + cd * (1.0 - t / tr)
            }
        });
        z.clamp_to_bedrock(bedrock);
    }

    Ok(tracker.finish(z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_ground_aggrades() {
        let mut z = Grid::new(6, 6);
        let cfg = AlgebraicConfig::default();
        let maps = hydraulic_algebric(&mut z, &cfg, None, MapRequest::BOTH).unwrap();
        for v in z.as_slice() {
            assert_relative_eq!(*v, cfg.c_deposition);
        }
        assert_eq!(maps.erosion.unwrap().max(), 0.0);
    }

    #[test]
    fn test_steep_ground_erodes_down_to_bedrock() {
        let mut z = Grid::from_fn(6, 6, |i, _| i as f32);
        let bedrock = Grid::from_fn(6, 6, |i, _| i as f32 - 0.01);
        let cfg = AlgebraicConfig {
            iterations: 3,
            ..Default::default()
        };
        hydraulic_algebric(&mut z, &cfg, Some(&bedrock), MapRequest::NONE).unwrap();
        for (h, b) in z.as_slice().iter().zip(bedrock.as_slice()) {
            assert!(*h >= *b);
        }
        assert!(z[(3, 3)] < 3.0);
    }
}
