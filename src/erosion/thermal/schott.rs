use log::debug;

use super::check_thermal_inputs;
use crate::erosion::Talus;
use crate::error::{ErosionError, Result};
use crate::grid::neighbors::MOORE;
use crate::grid::Grid;

/// Default elevation step per vote.
pub const SCHOTT_DEFAULT_INTENSITY: f32 = 0.001;

/// Vote-counting thermal erosion (Schott et al. 2023).
///
/// Each interior cell counts the neighbours it overhangs by more than the
/// talus (`down`) and those overhanging it (`up`), then moves by
/// `intensity · (up − down)`. All cells update from the same snapshot, and
/// borders are extrapolated after every iteration.
pub fn thermal_schott(z: &mut Grid, talus: Talus<'_>, iterations: u32, intensity: f32) -> Result<()> {
    check_thermal_inputs(z, &talus, iterations, None)?;
    if !(intensity >= 0.0) {
        return Err(ErosionError::parameter(
            "intensity",
            format!("must be non-negative, got {intensity}"),
        ));
    }
    debug!(
        "thermal_schott: shape={:?} iterations={} intensity={}",
        z.shape(),
        iterations,
        intensity
    );

    for _ in 0..iterations {
        let src = z.clone();
        *z = Grid::par_from_fn(src.nx(), src.ny(), |i, j| {
            let h = src[(i, j)];
            if !src.is_interior(i, j) {
                return h;
            }
            let t = talus.at(i, j);
            let votes: i32 = MOORE
                .iter()
                .map(|o| {
                    let (p, q) = o.apply(i, j);
                    let slope = (h - src[(p, q)]) / o.dist;
                    if slope > t {
                        -1
                    } else if slope < -t {
                        1
                    } else {
                        0
                    }
                })
                .sum();
            h + intensity * votes as f32
        });
        z.extrapolate_borders();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_isolated_spike_loses_eight_votes() {
        let mut z = Grid::new(5, 5);
        z[(2, 2)] = 1.0;
        thermal_schott(&mut z, Talus::Uniform(0.1), 1, 0.01).unwrap();
        assert_relative_eq!(z[(2, 2)], 1.0 - 8.0 * 0.01);
        // Each direct neighbour is overhung by the spike only.
        assert_relative_eq!(z[(1, 2)], 0.01);
    }

    #[test]
    fn test_gentle_slope_is_untouched() {
        let plane = Grid::from_fn(8, 8, |i, j| 0.01 * (i + j) as f32);
        let mut z = plane.clone();
        thermal_schott(&mut z, Talus::Uniform(0.1), 5, SCHOTT_DEFAULT_INTENSITY).unwrap();
        for (a, b) in z.as_slice().iter().zip(plane.as_slice()) {
            assert_relative_eq!(a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_negative_intensity_is_rejected() {
        let mut z = Grid::new(5, 5);
        assert!(thermal_schott(&mut z, Talus::Uniform(0.1), 1, -1.0).is_err());
    }
}
