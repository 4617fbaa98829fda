//! Elementwise algebra on grids.
//!
//! Everything here is cell-independent, so the heavier maps go through rayon.

use std::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

use rayon::prelude::*;

use super::Grid;

/// Linear blend `a + t * (b - a)` evaluated per cell.
///
/// All three grids must share a shape; callers validate beforehand.
pub fn lerp(a: &Grid, b: &Grid, t: &Grid) -> Grid {
    debug_assert_eq!(a.shape(), b.shape());
    debug_assert_eq!(a.shape(), t.shape());
    let data = a
        .as_slice()
        .par_iter()
        .zip(b.as_slice().par_iter())
        .zip(t.as_slice().par_iter())
        .map(|((&a, &b), &t)| a + t * (b - a))
        .collect();
    Grid {
        nx: a.nx,
        ny: a.ny,
        data,
    }
}

impl Grid {
    /// Parallel counterpart of [`Grid::from_fn`], one rayon task per row.
    pub fn par_from_fn(nx: usize, ny: usize, f: impl Fn(usize, usize) -> f32 + Sync + Send) -> Grid {
        let mut data = vec![0.0f32; nx * ny];
        if ny > 0 {
            data.par_chunks_mut(ny).enumerate().for_each(|(i, row)| {
                for (j, v) in row.iter_mut().enumerate() {
                    *v = f(i, j);
                }
            });
        }
        Grid { nx, ny, data }
    }

    /// Applies `f` to every cell in place.
    pub fn map_inplace(&mut self, f: impl Fn(f32) -> f32 + Sync + Send) {
        self.data.par_iter_mut().for_each(|v| *v = f(*v));
    }

    /// Returns a new grid with `f` applied to every cell.
    pub fn map(&self, f: impl Fn(f32) -> f32 + Sync + Send) -> Grid {
        let mut out = self.clone();
        out.map_inplace(f);
        out
    }

    /// Combines `self` with `other` cell by cell, writing into `self`.
    pub fn zip_apply(&mut self, other: &Grid, f: impl Fn(f32, f32) -> f32 + Sync + Send) {
        debug_assert_eq!(self.shape(), other.shape());
        self.data
            .par_iter_mut()
            .zip(other.data.par_iter())
            .for_each(|(a, &b)| *a = f(*a, b));
    }

    /// Cellwise `max(self, floor)`.
    pub fn maximum(&mut self, floor: &Grid) {
        self.zip_apply(floor, f32::max);
    }

    /// Cellwise `min(self, ceil)`.
    pub fn minimum(&mut self, ceil: &Grid) {
        self.zip_apply(ceil, f32::min);
    }

    /// Applies a bedrock floor when one is given.
    pub fn clamp_to_bedrock(&mut self, bedrock: Option<&Grid>) {
        if let Some(b) = bedrock {
            self.maximum(b);
        }
    }

    pub fn clamp_min(&mut self, vmin: f32) {
        self.map_inplace(|v| v.max(vmin));
    }

    pub fn clamp(&mut self, vmin: f32, vmax: f32) {
        self.map_inplace(|v| v.clamp(vmin, vmax));
    }

    /// Sets every value strictly below `vmin` to zero.
    pub fn chop(&mut self, vmin: f32) {
        self.map_inplace(|v| if v < vmin { 0.0 } else { v });
    }

    /// Linearly rescales values into `[vmin, vmax]`.
    ///
    /// A constant grid is left untouched.
    pub fn remap(&mut self, vmin: f32, vmax: f32) {
        let (lo, hi) = (self.min(), self.max());
        if lo == hi {
            return;
        }
        let scale = (vmax - vmin) / (hi - lo);
        self.map_inplace(|v| vmin + (v - lo) * scale);
    }

    /// `x^gamma` on values assumed to lie in `[0, 1]`.
    pub fn gamma_correction(&mut self, gamma: f32) {
        self.map_inplace(|v| v.max(0.0).powf(gamma));
    }
}

impl AddAssign<&Grid> for Grid {
    fn add_assign(&mut self, rhs: &Grid) {
        self.zip_apply(rhs, |a, b| a + b);
    }
}

impl SubAssign<&Grid> for Grid {
    fn sub_assign(&mut self, rhs: &Grid) {
        self.zip_apply(rhs, |a, b| a - b);
    }
}

impl MulAssign<&Grid> for Grid {
    fn mul_assign(&mut self, rhs: &Grid) {
        self.zip_apply(rhs, |a, b| a * b);
    }
}

impl AddAssign<f32> for Grid {
    fn add_assign(&mut self, rhs: f32) {
        self.map_inplace(|a| a + rhs);
    }
}

impl MulAssign<f32> for Grid {
    fn mul_assign(&mut self, rhs: f32) {
        self.map_inplace(|a| a * rhs);
    }
}

impl Add<&Grid> for &Grid {
    type Output = Grid;

    fn add(self, rhs: &Grid) -> Grid {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl Sub<&Grid> for &Grid {
    type Output = Grid;

    fn sub(self, rhs: &Grid) -> Grid {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl Mul<f32> for &Grid {
    type Output = Grid;

    fn mul(self, rhs: f32) -> Grid {
        let mut out = self.clone();
        out *= rhs;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lerp_endpoints() {
        let a = Grid::constant(3, 3, 1.0);
        let b = Grid::constant(3, 3, 5.0);
        let zero = Grid::new(3, 3);
        let one = Grid::constant(3, 3, 1.0);
        assert_eq!(lerp(&a, &b, &zero), a);
        assert_eq!(lerp(&a, &b, &one), b);
        let half = Grid::constant(3, 3, 0.5);
        assert_abs_diff_eq!(lerp(&a, &b, &half)[(1, 1)], 3.0);
    }

    #[test]
    fn test_remap_and_constant_grid() {
        let mut g = Grid::from_fn(2, 3, |i, j| (i * 3 + j) as f32);
        g.remap(0.0, 1.0);
        assert_abs_diff_eq!(g.min(), 0.0);
        assert_abs_diff_eq!(g.max(), 1.0);

        let mut c = Grid::constant(2, 2, 4.0);
        c.remap(0.0, 1.0);
        assert_eq!(c, Grid::constant(2, 2, 4.0));
    }

    #[test]
    fn test_chop_and_bedrock_floor() {
        let mut g = Grid::from_vec(1, 4, vec![0.001, 0.5, -1.0, 2.0]).unwrap();
        g.chop(0.01);
        assert_eq!(g.as_slice(), &[0.0, 0.5, 0.0, 2.0]);

        let floor = Grid::constant(1, 4, 0.25);
        g.clamp_to_bedrock(Some(&floor));
        assert_eq!(g.as_slice(), &[0.25, 0.5, 0.25, 2.0]);
    }

    #[test]
    fn test_operators() {
        let a = Grid::constant(2, 2, 2.0);
        let b = Grid::constant(2, 2, 0.5);
        assert_eq!((&a - &b)[(0, 0)], 1.5);
        assert_eq!((&a + &b)[(1, 1)], 2.5);
        assert_eq!((&a * 3.0)[(0, 1)], 6.0);
    }
}
