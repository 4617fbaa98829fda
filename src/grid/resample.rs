//! Resampling to a new shape.
//!
//! Both grids are laid over the unit square with cell-centred samples, so
//! target cell `k` of `n_t` reads the source at `(k + 0.5) n_s / n_t - 0.5`.
//! Resampling to the same shape is the identity.

use super::Grid;

#[inline]
fn source_coord(k: usize, n_source: usize, n_target: usize) -> f32 {
    (k as f32 + 0.5) * n_source as f32 / n_target as f32 - 0.5
}

/// Catmull-Rom interpolation of `p[1]..p[2]` at `x` in `[0, 1]`.
#[inline]
fn cubic_interpolate(p: [f32; 4], x: f32) -> f32 {
    p[1] + 0.5
        * x
        * (p[2] - p[0]
            + x * (2.0 * p[0] - 5.0 * p[1] + 4.0 * p[2] - p[3] + x * (3.0 * (p[1] - p[2]) + p[3] - p[0])))
}

impl Grid {
    /// Bilinear resampling to shape `(nx, ny)`; coordinates are clamped to
    /// the source so the edges never extrapolate.
    pub fn resample_bilinear(&self, nx: usize, ny: usize) -> Grid {
        let (sx, sy) = self.shape();
        Grid::par_from_fn(nx, ny, |i, j| {
            let x = source_coord(i, sx, nx).clamp(0.0, (sx - 1) as f32);
            let y = source_coord(j, sy, ny).clamp(0.0, (sy - 1) as f32);
            let (i0, j0) = (x as usize, y as usize);
            let (i1, j1) = ((i0 + 1).min(sx - 1), (j0 + 1).min(sy - 1));
            let (u, v) = (x - i0 as f32, y - j0 as f32);

            let f00 = self[(i0, j0)];
            let a10 = self[(i1, j0)] - f00;
            let a01 = self[(i0, j1)] - f00;
            let a11 = self[(i1, j1)] - self[(i1, j0)] - self[(i0, j1)] + f00;
            f00 + a10 * u + a01 * v + a11 * u * v
        })
    }

    /// Bicubic (Catmull-Rom) resampling to shape `(nx, ny)` over a 4x4
    /// stencil with edge-clamped indices.
    pub fn resample_bicubic(&self, nx: usize, ny: usize) -> Grid {
        let (sx, sy) = self.shape();
        let clamp_i = |p: i64| p.clamp(0, sx as i64 - 1) as usize;
        let clamp_j = |q: i64| q.clamp(0, sy as i64 - 1) as usize;

        Grid::par_from_fn(nx, ny, |i, j| {
            let x = source_coord(i, sx, nx);
            let y = source_coord(j, sy, ny);
            let (i0, j0) = (x.floor(), y.floor());
            let (u, v) = (x - i0, y - j0);
            let (i0, j0) = (i0 as i64, j0 as i64);

            let mut rows = [0.0; 4];
            for (m, row) in rows.iter_mut().enumerate() {
                let p = clamp_i(i0 + m as i64 - 1);
                let mut col = [0.0; 4];
                for (n, c) in col.iter_mut().enumerate() {
                    *c = self[(p, clamp_j(j0 + n as i64 - 1))];
                }
                *row = cubic_interpolate(col, v);
            }
            cubic_interpolate(rows, u)
        })
    }
}
