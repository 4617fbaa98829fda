//! Mask-weighted application of any engine.

use crate::error::Result;
use crate::grid::{lerp, Grid};

/// Runs `engine` on `z`, blending the result with the original by `mask`.
///
/// Without a mask the engine mutates `z` directly. With a mask the engine
/// runs on a copy and every cell becomes
/// `original + mask · (eroded − original)`: 0 keeps the cell, 1 takes the
/// full engine result. The mask shape must match `z`; on error `z` is left
/// untouched.
///
/// Maps returned by the engine describe the unmasked run.
pub fn apply_masked<T>(
    z: &mut Grid,
    mask: Option<&Grid>,
    engine: impl FnOnce(&mut Grid) -> Result<T>,
) -> Result<T> {
    let Some(mask) = mask else {
        return engine(z);
    };
    z.ensure_same_shape("mask", mask)?;

    let mut eroded = z.clone();
    let out = engine(&mut eroded)?;
    *z = lerp(z, &eroded, mask);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErosionError;

    fn bump(z: &mut Grid) -> Result<u32> {
        *z += 1.0;
        Ok(7)
    }

    #[test]
    fn test_zero_mask_is_identity() {
        let mut z = Grid::from_fn(3, 3, |i, j| (i + j) as f32);
        let before = z.clone();
        let mask = Grid::new(3, 3);
        assert_eq!(apply_masked(&mut z, Some(&mask), bump).unwrap(), 7);
        assert_eq!(z, before);
    }

    #[test]
    fn test_unit_mask_matches_unmasked() {
        let mut a = Grid::from_fn(3, 3, |i, j| (i * j) as f32);
        let mut b = a.clone();
        apply_masked(&mut a, Some(&Grid::constant(3, 3, 1.0)), bump).unwrap();
        apply_masked(&mut b, None, bump).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shape_mismatch_leaves_field_untouched() {
        let mut z = Grid::new(3, 3);
        let err = apply_masked(&mut z, Some(&Grid::new(2, 3)), bump).unwrap_err();
        assert!(matches!(err, ErosionError::ShapeMismatch { field: "mask", .. }));
        assert_eq!(z, Grid::new(3, 3));
    }
}
