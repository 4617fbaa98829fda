//! Slope thresholds, either one value for the whole field or one per cell.

use crate::error::{ErosionError, Result};
use crate::grid::Grid;

/// Maximum stable slope (elevation difference per unit cell distance).
#[derive(Debug, Clone, Copy)]
pub enum Talus<'a> {
    Uniform(f32),
    Field(&'a Grid),
}

impl<'a> Talus<'a> {
    /// Checks that the threshold is strictly positive everywhere and, for a
    /// per-cell field, that it matches the heightfield shape.
    pub fn validate(&self, z: &Grid) -> Result<()> {
        match *self {
            Talus::Uniform(t) => {
                if !(t > 0.0) {
                    return Err(ErosionError::NonPositiveTalus(t));
                }
            }
            Talus::Field(g) => {
                z.ensure_same_shape("talus", g)?;
                if let Some(&t) = g.as_slice().iter().find(|t| !(**t > 0.0)) {
                    return Err(ErosionError::NonPositiveTalus(t));
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn at(&self, i: usize, j: usize) -> f32 {
        match *self {
            Talus::Uniform(t) => t,
            Talus::Field(g) => g[(i, j)],
        }
    }

    /// Expands to a grid of the given shape.
    pub fn to_grid(&self, nx: usize, ny: usize) -> Grid {
        match *self {
            Talus::Uniform(t) => Grid::constant(nx, ny, t),
            Talus::Field(g) => g.clone(),
        }
    }
}

impl From<f32> for Talus<'_> {
    fn from(t: f32) -> Self {
        Talus::Uniform(t)
    }
}

impl<'a> From<&'a Grid> for Talus<'a> {
    fn from(g: &'a Grid) -> Self {
        Talus::Field(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        let z = Grid::new(4, 4);
        assert!(Talus::Uniform(0.1).validate(&z).is_ok());
        assert_eq!(
            Talus::Uniform(0.0).validate(&z),
            Err(ErosionError::NonPositiveTalus(0.0))
        );
        assert!(Talus::Uniform(f32::NAN).validate(&z).is_err());

        let mut field = Grid::constant(4, 4, 0.2);
        assert!(Talus::from(&field).validate(&z).is_ok());
        field[(1, 2)] = -0.1;
        assert!(Talus::from(&field).validate(&z).is_err());

        let wrong = Grid::constant(3, 4, 0.2);
        assert!(matches!(
            Talus::from(&wrong).validate(&z),
            Err(ErosionError::ShapeMismatch { field: "talus", .. })
        ));
    }

    #[test]
    fn test_lookup() {
        let field = Grid::from_fn(2, 2, |i, j| 1.0 + (i * 2 + j) as f32);
        assert_eq!(Talus::from(&field).at(1, 0), 3.0);
        assert_eq!(Talus::from(0.5).at(1, 1), 0.5);
        assert_eq!(Talus::from(0.5).to_grid(2, 3).shape(), (2, 3));
    }
}
