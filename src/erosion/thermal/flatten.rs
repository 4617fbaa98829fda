use log::debug;

use super::check_thermal_inputs;
use crate::erosion::Talus;
use crate::error::Result;
use crate::grid::filters::{maximum_smooth, smooth_cpulse};
use crate::grid::neighbors::NeighborOrder;
use crate::grid::Grid;

/// Blending width of the smooth maximum against the initial field.
const RESTORE_SMOOTHING: f32 = 0.01;

/// Flattening erosion: the inverse of classic thermal erosion.
///
/// Cells above `bedrock` move half of their steepest drop to that neighbour,
/// but only when the drop is still below the talus, so gentle slopes level
/// out into terraces while steep faces are preserved. The result is
/// smoothed with a cubic pulse of radius `post_filter_ir`, blended back over
/// the initial relief with a smooth maximum and clamped to the bedrock.
pub fn thermal_flatten(
    z: &mut Grid,
    talus: Talus<'_>,
    bedrock: &Grid,
    iterations: u32,
    post_filter_ir: usize,
) -> Result<()> {
    check_thermal_inputs(z, &talus, iterations, Some(bedrock))?;
    debug!(
        "thermal_flatten: shape={:?} iterations={} post_filter_ir={}",
        z.shape(),
        iterations,
        post_filter_ir
    );

    let (nx, ny) = z.shape();
    let z_init = z.clone();
    let mut order = NeighborOrder::new();

    for _ in 0..iterations {
        order.advance();
        for j in 1..ny - 1 {
            for i in 1..nx - 1 {
                if z[(i, j)] <= bedrock[(i, j)] {
                    continue;
                }
                let mut dmax = 0.0f32;
                let mut target = None;
                for o in order.iter() {
                    let (p, q) = o.apply(i, j);
                    let dz = (z[(i, j)] - z[(p, q)]) / o.dist;
                    if dz > dmax {
                        dmax = dz;
                        target = Some((p, q));
                    }
                }
                if let Some(nb) = target {
                    if dmax < talus.at(i, j) {
                        let amount = 0.5 * dmax;
                        z[(i, j)] -= amount;
                        z[nb] += amount;
                    }
                }
            }
        }
    }

    z.extrapolate_borders();
    smooth_cpulse(z, post_filter_ir);
    *z = maximum_smooth(z, &z_init, RESTORE_SMOOTHING);
    z.maximum(bedrock);
    Ok(())
}

/// [`thermal_flatten`] with a uniform talus and a bedrock far below the field.
pub fn thermal_flatten_uniform(z: &mut Grid, talus: f32, iterations: u32, post_filter_ir: usize) -> Result<()> {
    let bedrock = z.filled_like(z.min() - z.ptp());
    thermal_flatten(z, Talus::Uniform(talus), &bedrock, iterations, post_filter_ir)
}
