//! Thermal weathering: material slides off slopes steeper than the talus.
//!
//! All variants share the same skeleton. Interior cells are swept with a
//! [`SweepOrder`] that changes every iteration, and the 8 neighbours are
//! visited in a [`NeighborOrder`] advanced once per iteration, so no corner
//! or direction of the grid is systematically favoured.

mod deposition;
mod flatten;
mod olsen;
mod rib;
mod schott;
mod scree;

pub use deposition::sediment_deposition;
pub use flatten::{thermal_flatten, thermal_flatten_uniform};
pub use olsen::thermal_olsen;
pub use rib::thermal_rib;
pub use schott::thermal_schott;
pub use scree::thermal_scree;

use log::debug;

use super::{ensure_layers, DepositionTracker, ErosionMaps, MapRequest, Talus};
use crate::error::{ensure_iterations, Result};
use crate::grid::neighbors::{NeighborOrder, SweepOrder};
use crate::grid::Grid;

/// Fraction of the excess drop moved per exchange.
const EXCHANGE_RATE: f32 = 0.2;

/// Number of weathering cycles of [`thermal_auto_bedrock`].
const AUTO_BEDROCK_CYCLES: u32 = 10;

/// Elevation change of a cell at height `h` exchanging with a neighbour at
/// `h_nb`, `dist` away, under the drop limit `max_dif`.
#[inline]
fn exchange(h: f32, h_nb: f32, dist: f32, max_dif: f32) -> f32 {
    let dif = h - h_nb;
    if dif.abs() > max_dif {
        -dif.signum() * EXCHANGE_RATE * (dif.abs() - max_dif) / dist
    } else {
        0.0
    }
}

/// Shared precondition check of the talus-driven variants.
pub(crate) fn check_thermal_inputs(
    z: &Grid,
    talus: &Talus<'_>,
    iterations: u32,
    bedrock: Option<&Grid>,
) -> Result<()> {
    z.ensure_min_size(3)?;
    talus.validate(z)?;
    ensure_iterations(iterations)?;
    ensure_layers(z, &[("bedrock", bedrock)])
}

/// Classic thermal erosion.
///
/// Every interior cell exchanges material with each neighbour whose drop
/// exceeds `dist · talus`, moving a fifth of the excess per exchange. With a
/// bedrock, cells already below it are left alone and the final field is
/// clamped to it.
///
/// Borders are extrapolated from the interior at the end.
pub fn thermal(
    z: &mut Grid,
    talus: Talus<'_>,
    iterations: u32,
    bedrock: Option<&Grid>,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    check_thermal_inputs(z, &talus, iterations, bedrock)?;
    debug!(
        "thermal: shape={:?} iterations={} bedrock={}",
        z.shape(),
        iterations,
        bedrock.is_some()
    );

    let tracker = DepositionTracker::begin(z, maps);
    relax(z, talus, iterations, bedrock);
    Ok(tracker.finish(z))
}

/// Sweep loop of [`thermal`], without validation.
pub(crate) fn relax(z: &mut Grid, talus: Talus<'_>, iterations: u32, bedrock: Option<&Grid>) {
    let (nx, ny) = z.shape();
    let mut order = NeighborOrder::new();

    for it in 0..iterations as usize {
        order.advance();
        SweepOrder::for_iteration(it).visit((1, nx - 1), (1, ny - 1), |i, j| {
            let h = z[(i, j)];
            if bedrock.is_some_and(|b| h < b[(i, j)]) {
                return;
            }
            let t = talus.at(i, j);
            let amount: f32 = order
                .iter()
                .map(|o| {
                    let (p, q) = o.apply(i, j);
                    exchange(h, z[(p, q)], o.dist, o.dist * t)
                })
                .sum();
            z[(i, j)] = h + amount;
        });
    }

    z.extrapolate_borders();
    z.clamp_to_bedrock(bedrock);
}

/// Thermal erosion that never digs below the initial ground.
///
/// Runs ten short weathering cycles. After each one the field is raised back
/// to its initial elevation, then the bedrock of the next cycle is set to the
/// initial elevation wherever the field still lies below it and to
/// `-f32::MAX` elsewhere. Only material sliding on top of the initial relief
/// remains, so the result is pure deposition.
pub fn thermal_auto_bedrock(
    z: &mut Grid,
    talus: Talus<'_>,
    iterations: u32,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    check_thermal_inputs(z, &talus, iterations, None)?;
    debug!("thermal_auto_bedrock: shape={:?} iterations={}", z.shape(), iterations);

    let tracker = DepositionTracker::begin(z, maps);
    let z_init = z.clone();
    let mut bedrock = z.filled_like(-f32::MAX);
    let per_cycle = (iterations / AUTO_BEDROCK_CYCLES).max(1);

    for _ in 0..AUTO_BEDROCK_CYCLES {
        relax(z, talus, per_cycle, Some(&bedrock));
        z.maximum(&z_init);

        bedrock = z_init.clone();
        bedrock.zip_apply(z, |a, b| if a > b { a } else { -f32::MAX });
    }

    Ok(tracker.finish(z))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::grid::neighbors::MOORE;
    use approx::assert_abs_diff_eq;

    /// Cone-shaped peak of height `h` centred in an `n` x `n` grid.
    pub(crate) fn peak(n: usize, h: f32) -> Grid {
        let c = (n as f32 - 1.0) * 0.5;
        Grid::from_fn(n, n, |i, j| {
            let r = (i as f32 - c).hypot(j as f32 - c) / c;
            h * (1.0 - r).max(0.0)
        })
    }

    /// Largest interior drop to any neighbour, divided by the step length.
    pub(crate) fn max_interior_slope(z: &Grid) -> f32 {
        let (nx, ny) = z.shape();
        let mut s = 0.0f32;
        for i in 1..nx - 1 {
            for j in 1..ny - 1 {
                for o in MOORE {
                    let (p, q) = o.apply(i, j);
                    s = s.max((z[(i, j)] - z[(p, q)]).abs() / o.dist);
                }
            }
        }
        s
    }

    #[test]
    fn test_exchange_is_antisymmetric() {
        assert_abs_diff_eq!(exchange(1.0, 0.0, 1.0, 0.5), -0.1);
        assert_abs_diff_eq!(exchange(0.0, 1.0, 1.0, 0.5), 0.1);
        assert_eq!(exchange(0.2, 0.0, 1.0, 0.5), 0.0);
    }

    #[test]
    fn test_flat_field_is_stable() {
        let mut z = Grid::constant(8, 8, 0.5);
        let maps = thermal(&mut z, Talus::Uniform(0.1), 10, None, MapRequest::BOTH).unwrap();
        assert_eq!(z, Grid::constant(8, 8, 0.5));
        assert_eq!(maps.deposition.unwrap().max(), 0.0);
    }

    #[test]
    fn test_thermal_reduces_steep_slopes() {
        let mut z = Grid::new(16, 16);
        z[(8, 8)] = 1.0;
        let before = max_interior_slope(&z);
        thermal(&mut z, Talus::Uniform(0.01), 20, None, MapRequest::NONE).unwrap();
        assert!(max_interior_slope(&z) < 0.5 * before);
        assert!(z[(8, 8)] < 0.5);
    }

    #[test]
    fn test_thermal_respects_bedrock() {
        let mut z = peak(24, 1.0);
        let bedrock = Grid::constant(24, 24, 0.2);
        thermal(&mut z, Talus::Uniform(0.01), 30, Some(&bedrock), MapRequest::NONE).unwrap();
        assert!(z.min() >= 0.2);
    }

    #[test]
    fn test_thermal_validates_before_mutating() {
        let mut z = peak(8, 1.0);
        let before = z.clone();
        assert!(thermal(&mut z, Talus::Uniform(-1.0), 5, None, MapRequest::NONE).is_err());
        assert!(thermal(&mut z, Talus::Uniform(0.1), 0, None, MapRequest::NONE).is_err());
        let bedrock = Grid::new(4, 4);
        assert!(thermal(&mut z, Talus::Uniform(0.1), 5, Some(&bedrock), MapRequest::NONE).is_err());
        assert_eq!(z, before);
    }

    #[test]
    fn test_auto_bedrock_only_deposits() {
        let mut z = peak(24, 1.0);
        let z_init = z.clone();
        let maps = thermal_auto_bedrock(&mut z, Talus::Uniform(0.01), 40, MapRequest::BOTH).unwrap();
        for (a, b) in z.as_slice().iter().zip(z_init.as_slice()) {
            assert!(a >= b);
        }
        assert_eq!(maps.erosion.unwrap().max(), 0.0);
    }

    #[test]
    fn test_auto_bedrock_matches_clamped_cycles() {
        let talus = Talus::Uniform(0.01);
        let mut z = peak(20, 1.0);
        let z_init = z.clone();
        thermal_auto_bedrock(&mut z, talus, 20, MapRequest::NONE).unwrap();

        let mut expected = z_init.clone();
        let open = z_init.filled_like(-f32::MAX);
        for _ in 0..AUTO_BEDROCK_CYCLES {
            thermal(&mut expected, talus, 2, Some(&open), MapRequest::NONE).unwrap();
            expected.maximum(&z_init);
        }
        assert_eq!(z, expected);
    }
}
