use log::{debug, trace};

use crate::erosion::{ensure_layers, BenesConfig, DepositionTracker, ErosionMaps, MapRequest};
use crate::error::Result;
use crate::grid::filters::laplace;
use crate::grid::neighbors::NeighborOrder;
use crate::grid::Grid;

/// Water below this fraction of the initial maximum depth is dropped.
const WATER_MIN_RATIO: f32 = 0.01;
const SMOOTHING_SIGMA: f32 = 0.2;
const SMOOTHING_ITERATIONS: usize = 3;

/// Positive water-surface drops toward each neighbour, in the current order.
fn surface_drops(z: &Grid, w: &Grid, order: &NeighborOrder, i: usize, j: usize) -> [f32; 8] {
    let mut dz = [0.0; 8];
    let h = z[(i, j)] + w[(i, j)];
    for (k, o) in order.iter().enumerate() {
        let (p, q) = o.apply(i, j);
        dz[k] = h - z[(p, q)] - w[(p, q)];
    }
    dz
}

/// Hydraulic erosion after Beneš and Forsbach (2002).
///
/// Each iteration has two sweeps over the interior. The transport sweep
/// moves water (and proportionally the suspended sediment) downhill toward
/// every lower neighbour, in proportion to the water-surface drop, until the
/// cell surface sits at the average of its lower neighbours. The erosion
/// sweep then compares the load with a capacity of `c_capacity · w · v`,
/// where `v` is the water moved out of the cell, and picks up or drops the
/// difference at `c_erosion` / `c_deposition`, spreading the exchanged
/// material downhill with the same proportions.
///
/// Water is replenished toward its initial level at `rain_rate` and
/// evaporates at `evap_rate`; the water and sediment layers are lightly
/// diffused after every iteration.
pub fn hydraulic_benes(
    z: &mut Grid,
    config: &BenesConfig,
    bedrock: Option<&Grid>,
    moisture: Option<&Grid>,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    config.validate()?;
    z.ensure_min_size(3)?;
    ensure_layers(z, &[("bedrock", bedrock), ("moisture", moisture)])?;
    debug!(
        "hydraulic_benes: shape={:?} iterations={} c_capacity={}",
        z.shape(),
        config.iterations,
        config.c_capacity
    );

    let tracker = DepositionTracker::begin(z, maps);
    let (nx, ny) = z.shape();

    let w_init = match moisture {
        Some(m) => m.map(|v| config.water_level * v),
        None => z.filled_like(config.water_level),
    };
    let mut w = w_init.clone();
    let mut s = z.zeros_like();
    let mut vel = z.zeros_like();
    let wmin = WATER_MIN_RATIO * w.max();
    let mut order = NeighborOrder::new();

    for it in 0..config.iterations {
        order.advance();
        w.zip_apply(&w_init, |wv, w0| (1.0 - config.rain_rate) * wv + config.rain_rate * w0);

        // Pass 1 (transport): water and load flow toward lower surfaces.
        for j in 1..ny - 1 {
            for i in 1..nx - 1 {
                let dz = surface_drops(z, &w, &order, i, j);
                let mut dsum = 0.0;
                let mut zs_avg = 0.0;
                let mut n_avg = 0;
                for (k, o) in order.iter().enumerate() {
                    if dz[k] > 0.0 {
                        let (p, q) = o.apply(i, j);
                        dsum += dz[k];
                        zs_avg += z[(p, q)] + w[(p, q)];
                        n_avg += 1;
                    }
                }

                let wc = w[(i, j)];
                if dsum <= 0.0 || wc <= wmin {
                    vel[(i, j)] = 0.0;
                    continue;
                }
                zs_avg /= n_avg as f32;
                let dw = wc.min(z[(i, j)] + wc - zs_avg);
                let ds = if wc > 0.0 { s[(i, j)] * dw / wc } else { 0.0 };

                w[(i, j)] -= dw;
                s[(i, j)] -= ds;
                vel[(i, j)] = dw;
                for (k, o) in order.iter().enumerate() {
                    if dz[k] > 0.0 {
                        let (p, q) = o.apply(i, j);
                        let r = dz[k] / dsum;
                        w[(p, q)] += dw * r;
                        s[(p, q)] += ds * r;
                    }
                }
            }
        }

        // Pass 2 (erosion/deposition): relax the load toward capacity.
        for i in 1..nx - 1 {
            for j in 1..ny - 1 {
                let dz = surface_drops(z, &w, &order, i, j);
                let dsum: f32 = dz.iter().filter(|d| **d > 0.0).sum();
                if dsum <= 0.0 {
                    continue;
                }
                let excess = config.c_capacity * w[(i, j)] * vel[(i, j)] - s[(i, j)];
                let amount = if excess > 0.0 {
                    config.c_erosion * excess
                } else {
                    config.c_deposition * excess
                };
                z[(i, j)] -= amount;
                s[(i, j)] += amount;
                for (k, o) in order.iter().enumerate() {
                    if dz[k] > 0.0 {
                        let (p, q) = o.apply(i, j);
                        let r = dz[k] / dsum;
                        z[(p, q)] -= amount * r;
                        s[(p, q)] += amount * r;
                    }
                }
            }
        }

        // Pass 3 (evaporation and cleanup)
        w *= 1.0 - config.evap_rate;
        w.chop(wmin);
        z.extrapolate_borders();
        w.fill_borders();
        s.fill_borders();
        laplace(&mut w, SMOOTHING_SIGMA, SMOOTHING_ITERATIONS);
        laplace(&mut s, SMOOTHING_SIGMA, SMOOTHING_ITERATIONS);
        z.clamp_to_bedrock(bedrock);

        if it % 10 == 0 {
            trace!("hydraulic_benes: iteration {it}, load={}", s.sum());
        }
    }

    Ok(tracker.finish(z))
}
