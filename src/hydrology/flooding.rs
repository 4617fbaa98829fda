use log::debug;

use crate::error::{ErosionError, Result};
use crate::grid::neighbors::MOORE;
use crate::grid::Grid;

/// Water depth of the lake that fills up to the elevation of `(i, j)`.
///
/// Starting from the source cell, every 8-connected cell strictly below the
/// source elevation is flooded to that level; cells at or above it stop the
/// spread. The returned grid holds the water depth, zero on dry ground and
/// at the source itself.
pub fn flooding_from_point(z: &Grid, i: usize, j: usize) -> Result<Grid> {
    let (nx, ny) = z.shape();
    if i >= nx || j >= ny {
        return Err(ErosionError::parameter(
            "source",
            format!("({i}, {j}) lies outside a grid of shape {:?}", z.shape()),
        ));
    }

    let level = z[(i, j)];
    let mut depth = z.zeros_like();
    let mut stack = vec![(i, j)];

    while let Some((i, j)) = stack.pop() {
        for o in MOORE {
            let Some((p, q)) = o.checked_apply(i, j, nx, ny) else {
                continue;
            };
            let dz = level - z[(p, q)];
            if dz > 0.0 && dz > depth[(p, q)] {
                depth[(p, q)] = dz;
                stack.push((p, q));
            }
        }
    }
    Ok(depth)
}

/// Cell-wise maximum of [`flooding_from_point`] over several sources.
pub fn flooding_from_points(z: &Grid, sources: &[(usize, usize)]) -> Result<Grid> {
    debug!("flooding_from_points: shape={:?} sources={}", z.shape(), sources.len());
    let mut depth = z.zeros_like();
    for &(i, j) in sources {
        depth.maximum(&flooding_from_point(z, i, j)?);
    }
    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Two basins split by a wall in column 4: the left one at 0, the right
    /// one at 0.5, rim and wall at 1 and 2.
    fn basins() -> Grid {
        Grid::from_fn(7, 9, |i, j| {
            if i == 0 || i == 6 || j == 0 || j == 8 {
                1.0
            } else if j == 4 {
                2.0
            } else if j < 4 {
                0.0
            } else {
                0.5
            }
        })
    }

    #[test]
    fn test_rim_source_fills_only_the_connected_basin() {
        let z = basins();
        let depth = flooding_from_point(&z, 0, 0).unwrap();
        assert_abs_diff_eq!(depth[(1, 1)], 1.0);
        assert_abs_diff_eq!(depth[(3, 2)], 1.0);
        // lower than the source but walled off by cells at or above it
        assert_eq!(depth[(3, 6)], 0.0);
        assert_eq!(depth[(3, 4)], 0.0);
        assert_eq!(depth[(0, 0)], 0.0);
        assert_eq!(depth[(0, 5)], 0.0);
    }

    #[test]
    fn test_wall_stops_a_basin_source() {
        let z = basins();
        let depth = flooding_from_point(&z, 3, 6).unwrap();
        // nothing is strictly below the right basin floor
        assert_eq!(depth.max(), 0.0);

        let mut z = basins();
        z[(3, 6)] = 0.8;
        let depth = flooding_from_point(&z, 3, 6).unwrap();
        assert_abs_diff_eq!(depth[(2, 5)], 0.3, epsilon = 1e-6);
        assert_eq!(depth[(2, 2)], 0.0);
    }

    #[test]
    fn test_several_sources_take_the_deepest_water() {
        let mut z = basins();
        z[(3, 2)] = 0.4;
        z[(3, 6)] = 0.8;
        let depth = flooding_from_points(&z, &[(3, 2), (3, 6)]).unwrap();
        assert_abs_diff_eq!(depth[(1, 1)], 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(depth[(1, 7)], 0.3, epsilon = 1e-6);
        assert_eq!(depth[(3, 4)], 0.0);
    }

    #[test]
    fn test_source_outside_the_grid_is_rejected() {
        assert!(flooding_from_point(&basins(), 7, 0).is_err());
        assert!(flooding_from_points(&basins(), &[(1, 1), (0, 9)]).is_err());
    }
}
