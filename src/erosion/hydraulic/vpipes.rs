//! Virtual pipes shallow-water erosion (Mei et al. 2007).
//!
//! Water sits on top of the terrain and flows between 4-connected cells
//! through virtual pipes whose flux is driven by the hydrostatic head
//! difference. The flow field drives sediment pick-up and semi-Lagrangian
//! sediment transport.

use log::{debug, trace};

use crate::erosion::{ensure_layers, DepositionTracker, ErosionMaps, MapRequest, VpipesConfig};
use crate::error::Result;
use crate::grid::filters::laplace;
use crate::grid::gradient::gradient_norm;
use crate::grid::Grid;

const DT: f32 = 0.5;
const GRAVITY: f32 = 1.0;
const PIPE_LENGTH: f32 = 1.0;
const EPS: f32 = 1e-6;
const MIN_SIN_ALPHA: f32 = 0.001;

/// Pipe directions as `(di, dj)`: left, right, top, bottom.
/// Pipe `k ^ 1` points the opposite way.
const PIPES: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, 1), (0, -1)];

fn neighbour(i: usize, j: usize, k: usize, nx: usize, ny: usize) -> Option<(usize, usize)> {
    let (di, dj) = PIPES[k];
    let p = i as i64 + di as i64;
    let q = j as i64 + dj as i64;
    (p >= 0 && q >= 0 && p < nx as i64 && q < ny as i64).then_some((p as usize, q as usize))
}

/// Hydraulic erosion with the virtual pipes model.
///
/// Per iteration: rain relaxes the water depth toward
/// `water_height · moisture`; pipe fluxes grow with the head difference and
/// are scaled so no cell drains more water than it holds; depth follows the
/// net flux; velocity is the mean through-flux over the mean depth. The
/// transport capacity is `c_capacity · |v| · sin(α)`, sediment is picked up
/// or dropped at `c_erosion` / `c_deposition`, carried by backtracing along
/// the velocity, and water evaporates. Fluxes leaving through the border are
/// lost, so the domain drains.
pub fn hydraulic_vpipes(
    z: &mut Grid,
    config: &VpipesConfig,
    bedrock: Option<&Grid>,
    moisture: Option<&Grid>,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    config.validate()?;
    z.ensure_min_size(3)?;
    ensure_layers(z, &[("bedrock", bedrock), ("moisture", moisture)])?;
    debug!(
        "hydraulic_vpipes: shape={:?} iterations={} water_height={}",
        z.shape(),
        config.iterations,
        config.water_height
    );

    let tracker = DepositionTracker::begin(z, maps);
    let (nx, ny) = z.shape();
    let talus_scaling = nx.min(ny) as f32;

    let rain_map = match moisture {
        Some(m) => m.map(|v| config.water_height * v),
        None => z.filled_like(config.water_height),
    };
    let mut d = rain_map.clone();
    let mut s = z.zeros_like();
    let mut flux: [Grid; 4] = std::array::from_fn(|_| z.zeros_like());
    let mut flux_next: [Grid; 4] = std::array::from_fn(|_| z.zeros_like());

    for it in 0..config.iterations {
        if it % 10 == 0 {
            trace!("hydraulic_vpipes: iteration {it}");
        }

        // Pass 1 (rain): relax toward the rain map.
        let mut d1 = d.clone();
        d1.zip_apply(&rain_map, |w, r| (1.0 - DT * config.rain_rate) * w + DT * config.rain_rate * r);

        // Pass 2 (flux): grow outflows from the head difference.
        for (k, f_next) in flux_next.iter_mut().enumerate() {
            for i in 0..nx {
                for j in 0..ny {
                    f_next[(i, j)] = match neighbour(i, j, k, nx, ny) {
                        Some((p, q)) => {
                            let dh = z[(i, j)] + d1[(i, j)] - z[(p, q)] - d1[(p, q)];
                            (flux[k][(i, j)] + DT * GRAVITY * dh / PIPE_LENGTH).max(0.0)
                        }
                        None => 0.0,
                    };
                }
            }
            f_next.fill_borders();
        }
        for i in 0..nx {
            for j in 0..ny {
                let out: f32 = flux_next.iter().map(|f| f[(i, j)]).sum();
                let scale = (d1[(i, j)] * PIPE_LENGTH * PIPE_LENGTH / (out + EPS) / DT).min(1.0);
                for f in flux_next.iter_mut() {
                    f[(i, j)] *= scale;
                }
            }
        }
        std::mem::swap(&mut flux, &mut flux_next);

        // Pass 3 (water): net flux, corners averaged from their edges.
        let mut d2 = d1.clone();
        for i in 0..nx {
            for j in 0..ny {
                let corner = (i == 0 || i == nx - 1) && (j == 0 || j == ny - 1);
                if corner {
                    continue;
                }
                let outflow: f32 = flux.iter().map(|f| f[(i, j)]).sum();
                let inflow: f32 = (0..4)
                    .filter_map(|k| neighbour(i, j, k, nx, ny).map(|(p, q)| flux[k ^ 1][(p, q)]))
                    .sum();
                d2[(i, j)] = d1[(i, j)] + DT * (inflow - outflow) / (PIPE_LENGTH * PIPE_LENGTH);
            }
        }
        d2[(0, 0)] = 0.5 * (d2[(1, 0)] + d2[(0, 1)]);
        d2[(nx - 1, 0)] = 0.5 * (d2[(nx - 2, 0)] + d2[(nx - 1, 1)]);
        d2[(nx - 1, ny - 1)] = 0.5 * (d2[(nx - 1, ny - 2)] + d2[(nx - 2, ny - 1)]);
        d2[(0, ny - 1)] = 0.5 * (d2[(0, ny - 2)] + d2[(1, ny - 1)]);

        // Pass 4 (velocity): mean through-flux over mean depth.
        let [fl, fr, ft, fb] = &flux;
        let dmin = 0.5 * config.water_height * DT;
        let mut u = z.zeros_like();
        let mut v = z.zeros_like();
        for i in 1..nx - 1 {
            for j in 1..ny - 1 {
                let dmean = (0.5 * (d1[(i, j)] + d2[(i, j)])).max(dmin);
                u[(i, j)] = 0.5 * (fr[(i - 1, j)] - fl[(i, j)] + fr[(i, j)] - fl[(i + 1, j)]) / dmean;
                v[(i, j)] = 0.5 * (ft[(i, j - 1)] - fb[(i, j)] + ft[(i, j)] - fb[(i, j + 1)]) / dmean;
            }
        }
        u.fill_borders();
        v.fill_borders();

        // Pass 5 (erosion/deposition)
        let mut surface = &d1 + &d2;
        surface *= 0.5;
        surface += &*z;
        let mut talus = gradient_norm(&surface);
        talus *= talus_scaling;
        laplace(&mut talus, 0.25, 1);

        let mut s1 = s.clone();
        for i in 1..nx - 1 {
            for j in 1..ny - 1 {
                let t = talus[(i, j)];
                let sin_alpha = (t / 1.0f32.hypot(t)).max(MIN_SIN_ALPHA);
                let capacity = config.c_capacity * u[(i, j)].hypot(v[(i, j)]) * sin_alpha;
                let delta = DT * (capacity - s[(i, j)]);
                let amount = if delta > 0.0 {
                    config.c_erosion * delta
                } else {
                    config.c_deposition * delta
                };
                s1[(i, j)] += amount;
                z[(i, j)] -= amount;
            }
        }
        s1.fill_borders();
        z.fill_borders();
        z.clamp_to_bedrock(bedrock);

        // Pass 6 (sediment transport): sample upstream along the velocity.
        let (xmax, ymax) = ((nx - 1) as f32, (ny - 1) as f32);
        for i in 1..nx - 1 {
            for j in 1..ny - 1 {
                let x = (i as f32 - DT * u[(i, j)]).clamp(0.0, xmax);
                let y = (j as f32 - DT * v[(i, j)]).clamp(0.0, ymax);
                let ip = (x as usize).min(nx - 2);
                let jp = (y as usize).min(ny - 2);
                s[(i, j)] = s1.value_bilinear_at(ip, jp, x - ip as f32, y - jp as f32);
            }
        }
        s.fill_borders();

        // Pass 7 (evaporation)
        d = d2;
        d *= 1.0 - DT * config.evap_rate;
        d.clamp_min(0.0);
        s.clamp_min(0.0);
    }

    Ok(tracker.finish(z))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hill(n: usize) -> Grid {
        let c = (n as f32 - 1.0) * 0.5;
        Grid::from_fn(n, n, |i, j| {
            let r2 = ((i as f32 - c).powi(2) + (j as f32 - c).powi(2)) / (c * c);
            (-3.0 * r2).exp()
        })
    }

    #[test]
    fn test_hill_is_reshaped() {
        let mut z = hill(24);
        let cfg = VpipesConfig {
            iterations: 20,
            ..Default::default()
        };
        let maps = hydraulic_vpipes(&mut z, &cfg, None, None, MapRequest::BOTH).unwrap();
        assert!(z.as_slice().iter().all(|v| v.is_finite()));
        assert!(maps.erosion.unwrap().max() > 0.0);
    }

    #[test]
    fn test_bedrock_invariant() {
        let mut z = hill(20);
        let bedrock = z.map(|v| v - 1e-3);
        let cfg = VpipesConfig {
            iterations: 15,
            c_erosion: 0.5,
            ..Default::default()
        };
        hydraulic_vpipes(&mut z, &cfg, Some(&bedrock), None, MapRequest::NONE).unwrap();
        for (h, b) in z.as_slice().iter().zip(bedrock.as_slice()) {
            assert!(*h >= *b);
        }
    }

    #[test]
    fn test_moisture_shape_checked() {
        let mut z = hill(10);
        let wet = Grid::constant(10, 11, 1.0);
        assert!(hydraulic_vpipes(&mut z, &VpipesConfig::default(), None, Some(&wet), MapRequest::NONE).is_err());
    }
}
