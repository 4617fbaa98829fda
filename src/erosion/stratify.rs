//! Terraced strata.

use log::debug;

use crate::erosion::ensure_layers;
use crate::error::{ErosionError, Result};
use crate::grid::Grid;

/// Sharpness of the step at the bottom of every stratum, divided by its gamma.
const STEP_SHARPNESS: f32 = 50.0;

/// Cuts the elevation range into strata and reshapes each one into a terrace.
///
/// `hs` lists increasing stratum boundaries and `gamma` one exponent per
/// stratum. A cell at relative height `v` in `[hs[k], hs[k+1])` is moved to
/// `v^γ · (1 - exp(-50 v / γ))` of the stratum, so every stratum starts with
/// a steep riser and flattens into a ledge (or the reverse for `γ < 1`).
/// `noise` shifts each cell's position within its stratum by `noise ·
/// stratum height`. Cells outside `[hs[0], hs[last])` are left alone.
pub fn stratify(z: &mut Grid, hs: &[f32], gamma: &[f32], noise: Option<&Grid>) -> Result<()> {
    if hs.len() < 2 || hs.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(ErosionError::parameter(
            "hs",
            format!("needs at least two strictly increasing boundaries, got {hs:?}"),
        ));
    }
    if gamma.len() + 1 != hs.len() {
        return Err(ErosionError::parameter(
            "gamma",
            format!("needs one value per stratum ({}), got {}", hs.len() - 1, gamma.len()),
        ));
    }
    if let Some(g) = gamma.iter().find(|g| !(**g > 0.0)) {
        return Err(ErosionError::parameter(
            "gamma",
            format!("must be strictly positive, got {g}"),
        ));
    }
    ensure_layers(z, &[("noise", noise)])?;
    debug!("stratify: shape={:?} strata={}", z.shape(), gamma.len());

    let (nx, ny) = z.shape();
    let src = &*z;
    let terraced = Grid::par_from_fn(nx, ny, |i, j| {
        let h = src[(i, j)];
        for (k, &g) in gamma.iter().enumerate() {
            let dh = hs[k + 1] - hs[k];
            let dn = noise.map_or(0.0, |n| n[(i, j)] * dh);
            let zt = h - dn;
            if zt >= hs[k] && zt < hs[k + 1] {
                let v = (zt - hs[k]) / dh;
                let v = v.powf(g) * (1.0 - (-STEP_SHARPNESS / g * v).exp());
                return dn + hs[k] + v * dh;
            }
        }
        h
    });
    *z = terraced;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cells_outside_the_strata_are_untouched() {
        let mut z = Grid::from_vec(1, 3, vec![-0.5, 1.0, 1.5]).unwrap();
        let before = z.clone();
        stratify(&mut z, &[0.0, 1.0], &[1.0], None).unwrap();
        assert_eq!(z, before);
    }

    #[test]
    fn test_terrace_profile() {
        let mut z = Grid::from_vec(1, 4, vec![0.01, 0.5, 2.0, 1.0]).unwrap();
        stratify(&mut z, &[0.0, 1.0, 3.0], &[1.0, 2.0], None).unwrap();
        // riser at the bottom of the first stratum
        assert_abs_diff_eq!(z[(0, 0)], 0.01 * (1.0 - (-0.5f32).exp()), epsilon = 1e-6);
        assert_abs_diff_eq!(z[(0, 1)], 0.5, epsilon = 1e-5);
        // v = 0.5 with gamma 2 lands a quarter of the way up the second stratum
        assert_abs_diff_eq!(z[(0, 2)], 1.5, epsilon = 1e-5);
        // boundaries are fixed points
        assert_abs_diff_eq!(z[(0, 3)], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_noise_shifts_the_strata() {
        let mut plain = Grid::constant(2, 2, 0.3);
        let mut shifted = plain.clone();
        stratify(&mut plain, &[0.0, 1.0], &[2.0], None).unwrap();
        stratify(&mut shifted, &[0.0, 1.0], &[2.0], Some(&Grid::constant(2, 2, 0.2))).unwrap();
        assert_abs_diff_eq!(plain[(0, 0)], 0.09, epsilon = 1e-4);
        // the cell sits at 0.1 of a stratum that starts at 0.2
        assert_abs_diff_eq!(shifted[(0, 0)], 0.2 + 0.01 * (1.0 - (-2.5f32).exp()), epsilon = 1e-5);
    }

    #[test]
    fn test_invalid_strata_leave_the_field_untouched() {
        let mut z = Grid::constant(3, 3, 0.5);
        assert!(stratify(&mut z, &[0.0], &[], None).is_err());
        assert!(stratify(&mut z, &[0.0, 1.0, 1.0], &[1.0, 1.0], None).is_err());
        assert!(stratify(&mut z, &[0.0, 1.0], &[1.0, 1.0], None).is_err());
        assert!(stratify(&mut z, &[0.0, 1.0], &[0.0], None).is_err());
        assert!(stratify(&mut z, &[0.0, 1.0], &[1.0], Some(&Grid::new(2, 3))).is_err());
        assert_eq!(z, Grid::constant(3, 3, 0.5));
    }
}
