use log::{debug, trace};

use crate::erosion::{ensure_layers, DepositionTracker, ErosionMaps, MapRequest, MusgraveConfig};
use crate::error::Result;
use crate::grid::filters::laplace;
use crate::grid::neighbors::NeighborOrder;
use crate::grid::Grid;

/// Light smoothing applied to the elevation every few iterations.
const SMOOTHING_SIGMA: f32 = 0.05;
const SMOOTHING_PERIOD: u32 = 10;

/// Grid-based water and sediment exchange (Musgrave et al. 1989).
///
/// Every cell carries a water column and a suspended sediment load. Each
/// iteration the water relaxes toward `water_level · moisture`, then every
/// interior cell exchanges water with its neighbours. Where water moves
/// (`dw > 0`), half the transferred amount flows and carries up to
/// `c_capacity · dw` of sediment: a surplus is dropped at `c_deposition`, a
/// deficit is picked up from the ground at `c_erosion`. Where the water
/// surface is already level, sediment settles at `c_deposition`.
pub fn hydraulic_musgrave(
    z: &mut Grid,
    config: &MusgraveConfig,
    moisture: Option<&Grid>,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    config.validate()?;
    z.ensure_min_size(3)?;
    ensure_layers(z, &[("moisture", moisture)])?;
    debug!(
        "hydraulic_musgrave: shape={:?} iterations={} c_capacity={}",
        z.shape(),
        config.iterations,
        config.c_capacity
    );

    let tracker = DepositionTracker::begin(z, maps);
    let (nx, ny) = z.shape();
    let moisture = match moisture {
        Some(m) => m.clone(),
        None => z.filled_like(1.0),
    };
    let mut s = z.zeros_like();
    let mut w = moisture.map(|m| config.water_level * m);
    let mut order = NeighborOrder::new();

    for it in 0..config.iterations {
        w.zip_apply(&moisture, |wv, m| {
            (1.0 - config.evap_rate) * wv + config.evap_rate * m * config.water_level
        });
        order.advance();

        for j in 1..ny - 1 {
            for i in 1..nx - 1 {
                for o in order.iter() {
                    let (p, q) = o.apply(i, j);
                    let head = w[(i, j)] + z[(i, j)] - w[(p, q)] - z[(p, q)];
                    let dw = w[(i, j)].min(head / o.dist);

                    if dw <= 0.0 {
                        z[(i, j)] += config.c_deposition * s[(i, j)];
                        s[(i, j)] *= 1.0 - config.c_deposition;
                        continue;
                    }

                    w[(i, j)] -= 0.5 * dw;
                    w[(p, q)] += 0.5 * dw;
                    let capacity = config.c_capacity * dw;
                    let surplus = s[(i, j)] - capacity;
                    if surplus > 0.0 {
                        s[(p, q)] += capacity;
                        z[(i, j)] += config.c_deposition * surplus;
                        s[(i, j)] = (1.0 - config.c_deposition) * surplus;
                    } else {
                        s[(p, q)] += s[(i, j)] - config.c_erosion * surplus;
                        z[(i, j)] += config.c_erosion * surplus;
                        s[(i, j)] = 0.0;
                    }
                }
            }
        }

        z.fill_borders();
        w.fill_borders();
        s.fill_borders();

        if it % SMOOTHING_PERIOD == 0 {
            trace!("hydraulic_musgrave: iteration {it}, water={}", w.sum());
            laplace(z, SMOOTHING_SIGMA, 1);
        }
    }

    z.extrapolate_borders();
    laplace(z, SMOOTHING_SIGMA, 1);
    Ok(tracker.finish(z))
}
