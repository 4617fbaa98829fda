use log::debug;

use crate::erosion::ensure_layers;
use crate::error::{ensure_iterations, Result};
use crate::grid::filters::median_3x3;
use crate::grid::neighbors::MOORE;
use crate::grid::Grid;

/// Rib-forming erosion.
///
/// Every iteration lowers each cell by the 3x3 median of the smallest
/// distance-normalised elevation difference to its neighbours. Flat spots
/// stay put while uniformly sloping ground is eaten away, which leaves
/// rib-like ridges behind. The field never drops below `bedrock`.
pub fn thermal_rib(z: &mut Grid, iterations: u32, bedrock: Option<&Grid>) -> Result<()> {
    z.ensure_min_size(3)?;
    ensure_iterations(iterations)?;
    ensure_layers(z, &[("bedrock", bedrock)])?;
    debug!("thermal_rib: shape={:?} iterations={}", z.shape(), iterations);

    let (nx, ny) = z.shape();
    for _ in 0..iterations {
        let mut de = Grid::par_from_fn(nx, ny, |i, j| {
            if !z.is_interior(i, j) {
                return 0.0;
            }
            MOORE
                .iter()
                .map(|o| {
                    let (p, q) = o.apply(i, j);
                    (z[(i, j)] - z[(p, q)]).abs() / o.dist
                })
                .fold(f32::MAX, f32::min)
        });
        de.fill_borders();
        median_3x3(&mut de);
        *z -= &de;
        z.clamp_to_bedrock(bedrock);
    }
    Ok(())
}
