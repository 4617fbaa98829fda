use log::debug;

use super::{check_thermal_inputs, relax};
use crate::erosion::{DepositionTracker, ErosionMaps, MapRequest, Talus};
use crate::error::{ensure_iterations, ErosionError, Result};
use crate::grid::Grid;

/// Lays a loose sediment layer of up to `max_deposition` over `z` and lets it
/// settle.
///
/// The layer grows in `iterations` equal steps. After each step the combined
/// surface is relaxed by `thermal_subiterations` sweeps of thermal erosion
/// with the underlying ground as bedrock, so sediment slides into hollows
/// and never erodes the ground itself.
pub fn sediment_deposition(
    z: &mut Grid,
    talus: Talus<'_>,
    max_deposition: f32,
    iterations: u32,
    thermal_subiterations: u32,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    check_thermal_inputs(z, &talus, iterations, None)?;
    ensure_iterations(thermal_subiterations)?;
    if !(max_deposition >= 0.0) {
        return Err(ErosionError::parameter(
            "max_deposition",
            format!("must be non-negative, got {max_deposition}"),
        ));
    }
    debug!(
        "sediment_deposition: shape={:?} max_deposition={} iterations={}",
        z.shape(),
        max_deposition,
        iterations
    );

    let tracker = DepositionTracker::begin(z, maps);
    let step = max_deposition / iterations as f32;
    let mut sediment = z.zeros_like();

    for _ in 0..iterations {
        sediment += step;
        let mut surface = &*z + &sediment;
        relax(&mut surface, talus, thermal_subiterations, Some(&*z));
        sediment = &surface - &*z;
    }

    *z += &sediment;
    Ok(tracker.finish(z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_ground_gets_uniform_layer() {
        let mut z = Grid::constant(10, 10, 1.0);
        let maps = sediment_deposition(&mut z, Talus::Uniform(0.1), 0.05, 5, 3, MapRequest::DEPOSITION).unwrap();
        for v in z.as_slice() {
            assert_relative_eq!(*v, 1.05, epsilon = 1e-5);
        }
        assert_relative_eq!(maps.deposition.unwrap().mean(), 0.05, epsilon = 1e-5);
    }

    #[test]
    fn test_sediment_never_erodes_ground() {
        let mut z = Grid::from_fn(16, 16, |i, j| if (i + j) % 5 == 0 { 0.3 } else { 0.0 });
        let ground = z.clone();
        sediment_deposition(&mut z, Talus::Uniform(0.01), 0.02, 4, 5, MapRequest::NONE).unwrap();
        for (a, b) in z.as_slice().iter().zip(ground.as_slice()) {
            assert!(*a >= *b);
        }
    }
}
