//! Olsen's avalanche variant of thermal erosion.

use log::debug;

use super::check_thermal_inputs;
use crate::erosion::{DepositionTracker, ErosionMaps, MapRequest, Talus};
use crate::error::Result;
use crate::grid::neighbors::{NeighborOrder, SweepOrder};
use crate::grid::Grid;

/// Avalanching intensity: half of the excess drop moves per iteration.
const INTENSITY: f32 = 0.5;

/// Thermal erosion with Olsen's (1998) avalanche rule.
///
/// For a cell whose drop to at least one neighbour exceeds `dist · talus`,
/// let `dmax` be the largest and `dsum` the total of those excess drops.
/// Every neighbour `k` then receives `0.5 · (dmax − dist_k · talus) · dz_k /
/// dsum`, which is negative for neighbours standing above the cell. The cell
/// itself is left as is, so mass is not conserved. With a bedrock, cells
/// below it are skipped and each transfer is capped at the height of the
/// cell above its bedrock.
pub fn thermal_olsen(
    z: &mut Grid,
    talus: Talus<'_>,
    iterations: u32,
    bedrock: Option<&Grid>,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    check_thermal_inputs(z, &talus, iterations, bedrock)?;
    debug!("thermal_olsen: shape={:?} iterations={}", z.shape(), iterations);

    let tracker = DepositionTracker::begin(z, maps);
    let (nx, ny) = z.shape();
    let mut order = NeighborOrder::new();
    let mut dz = [0.0f32; 8];

    for it in 0..iterations as usize {
        order.advance();
        SweepOrder::for_iteration(it).visit((1, nx - 1), (1, ny - 1), |i, j| {
            let h = z[(i, j)];
            let headroom = match bedrock {
                Some(b) if h < b[(i, j)] => return,
                Some(b) => h - b[(i, j)],
                None => f32::MAX,
            };
            let t = talus.at(i, j);

            let mut dmax = 0.0f32;
            let mut dsum = 0.0f32;
            for (k, o) in order.iter().enumerate() {
                dz[k] = h - z[o.apply(i, j)];
                if dz[k] > t * o.dist {
                    dsum += dz[k];
                    dmax = dmax.max(dz[k]);
                }
            }
            if dmax <= 0.0 {
                return;
            }

            for (k, o) in order.iter().enumerate() {
                let amount = INTENSITY * (dmax - t * o.dist) * dz[k] / dsum;
                z[o.apply(i, j)] += amount.min(headroom);
            }
        });
    }

    z.extrapolate_borders();
    z.clamp_to_bedrock(bedrock);
    Ok(tracker.finish(z))
}
