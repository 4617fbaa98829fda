use log::debug;

use crate::erosion::{ensure_layers, DepositionTracker, ErosionMaps, MapRequest, SplConfig};
use crate::error::Result;
use crate::grid::filters::{minimum_local, smooth_cpulse};
use crate::grid::gradient::gradient_norm;
use crate::grid::Grid;
use crate::hydrology::flow_accumulation_dinf;

/// Drainage-area exponent of the stream power law.
const AREA_EXPONENT: f32 = 0.8;

/// Stream power law erosion, `dz = −c_erosion · moisture · A^0.8 · S²`.
///
/// `A` is the D-infinity flow accumulation and `S` the gradient norm of a
/// presmoothed copy of the field, expressed per grid length along `i`. The
/// field is floored by `bedrock`, or without one by the local minimum of the
/// initial field over a `16 · prefilter_ir + 1` window so valleys cannot
/// deepen indefinitely.
pub fn hydraulic_spl(
    z: &mut Grid,
    config: &SplConfig,
    bedrock: Option<&Grid>,
    moisture: Option<&Grid>,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    config.validate()?;
    z.ensure_min_size(3)?;
    ensure_layers(z, &[("bedrock", bedrock), ("moisture", moisture)])?;
    debug!(
        "hydraulic_spl: shape={:?} c_erosion={} iterations={}",
        z.shape(),
        config.c_erosion,
        config.iterations
    );

    let tracker = DepositionTracker::begin(z, maps);
    let default_floor;
    let floor = match bedrock {
        Some(b) => b,
        None => {
            default_floor = minimum_local(z, 8 * config.prefilter_ir);
            &default_floor
        }
    };
    let scale = z.nx() as f32;

    for _ in 0..config.iterations {
        let facc = flow_accumulation_dinf(z, config.talus_ref)?;

        let mut zf = z.clone();
        smooth_cpulse(&mut zf, config.prefilter_ir);
        let slope = gradient_norm(&zf);

        let mut power = facc.map(|a| a.powf(AREA_EXPONENT));
        power.zip_apply(&slope, |p, s| {
            let s = s * scale;
            -config.c_erosion * p * s * s
        });
        if let Some(m) = moisture {
            power *= m;
        }
        *z += &power;
        z.maximum(floor);
    }

    Ok(tracker.finish(z))
}
