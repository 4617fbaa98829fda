//! Finite-difference derivatives.
//!
//! All of these assume a grid of at least 2x2 (3x3 for the Laplacian); the
//! engines check the size before calling in.

use super::Grid;

/// Derivative along `i`: central difference inside, one-sided on the first and last rows.
pub fn gradient_x(z: &Grid) -> Grid {
    let (nx, ny) = z.shape();
    Grid::par_from_fn(nx, ny, |i, j| {
        if i == 0 {
            z[(1, j)] - z[(0, j)]
        } else if i == nx - 1 {
            z[(i, j)] - z[(i - 1, j)]
        } else {
            0.5 * (z[(i + 1, j)] - z[(i - 1, j)])
        }
    })
}

/// Derivative along `j`: central difference inside, one-sided on the first and last columns.
pub fn gradient_y(z: &Grid) -> Grid {
    let (nx, ny) = z.shape();
    Grid::par_from_fn(nx, ny, |i, j| {
        if j == 0 {
            z[(i, 1)] - z[(i, 0)]
        } else if j == ny - 1 {
            z[(i, j)] - z[(i, j - 1)]
        } else {
            0.5 * (z[(i, j + 1)] - z[(i, j - 1)])
        }
    })
}

/// Magnitude of the finite-difference gradient.
pub fn gradient_norm(z: &Grid) -> Grid {
    let dx = gradient_x(z);
    let dy = gradient_y(z);
    let mut out = dx;
    out.zip_apply(&dy, f32::hypot);
    out
}

/// Direction of the gradient, `atan2(dy, dx)`, in radians.
///
/// With `downward` the angle of the steepest descent is returned instead.
pub fn gradient_angle(z: &Grid, downward: bool) -> Grid {
    let mut dx = gradient_x(z);
    let dy = gradient_y(z);
    let sign = if downward { -1.0 } else { 1.0 };
    dx.zip_apply(&dy, |a, b| (sign * b).atan2(sign * a));
    dx
}

/// Local "talus": the largest absolute elevation step to a 4-connected neighbour.
pub fn gradient_talus(z: &Grid) -> Grid {
    let (nx, ny) = z.shape();
    Grid::par_from_fn(nx, ny, |i, j| {
        let h = z[(i, j)];
        let mut t = 0.0f32;
        if i > 0 {
            t = t.max((h - z[(i - 1, j)]).abs());
        }
        if i + 1 < nx {
            t = t.max((h - z[(i + 1, j)]).abs());
        }
        if j > 0 {
            t = t.max((h - z[(i, j - 1)]).abs());
        }
        if j + 1 < ny {
            t = t.max((h - z[(i, j + 1)]).abs());
        }
        t
    })
}

/// Five-point Laplacian, borders extrapolated.
pub fn laplacian(z: &Grid) -> Grid {
    let (nx, ny) = z.shape();
    let mut delta = Grid::par_from_fn(nx, ny, |i, j| {
        if z.is_interior(i, j) {
            z[(i + 1, j)] + z[(i - 1, j)] + z[(i, j - 1)] + z[(i, j + 1)] - 4.0 * z[(i, j)]
        } else {
            0.0
        }
    });
    delta.extrapolate_borders();
    delta
}
