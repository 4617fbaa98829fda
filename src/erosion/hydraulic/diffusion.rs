use log::debug;

use crate::error::{ensure_iterations, ErosionError, Result};
use crate::grid::gradient::{gradient_x, gradient_y};
use crate::grid::Grid;

/// Lower bound of the `1 - (dz / talus)²` denominator.
const MIN_DENOMINATOR: f32 = 1e-2;

fn nonlinear_flux(slope: &Grid, c_diffusion: f32, talus: f32) -> Grid {
    slope.map(|d| {
        let denom = (1.0 - d * d / (talus * talus)).max(MIN_DENOMINATOR);
        c_diffusion * d / denom
    })
}

/// Nonlinear hillslope diffusion.
///
/// Each iteration computes the flux `q = c · ∇z / (1 − (∇z / talus)²)` along
/// both axes and adds its divergence to `z`. The flux diverges as the slope
/// approaches `talus`, so steep faces relax much faster than gentle ones.
/// The denominator is floored at 0.01 to keep slopes past the talus finite.
pub fn hydraulic_diffusion(z: &mut Grid, c_diffusion: f32, talus: f32, iterations: u32) -> Result<()> {
    ensure_iterations(iterations)?;
    if !(talus > 0.0) {
        return Err(ErosionError::NonPositiveTalus(talus));
    }
    if !(c_diffusion >= 0.0) {
        return Err(ErosionError::parameter(
            "c_diffusion",
            format!("must be non-negative, got {c_diffusion}"),
        ));
    }
    z.ensure_min_size(3)?;
    debug!(
        "hydraulic_diffusion: shape={:?} c_diffusion={} talus={} iterations={}",
        z.shape(),
        c_diffusion,
        talus,
        iterations
    );

    for _ in 0..iterations {
        let qx = nonlinear_flux(&gradient_x(z), c_diffusion, talus);
        let qy = nonlinear_flux(&gradient_y(z), c_diffusion, talus);
        *z += &gradient_x(&qx);
        *z += &gradient_y(&qy);
    }
    Ok(())
}
