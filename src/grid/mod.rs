//! Dense 2D float grid used for heightfields and every auxiliary layer.
//!
//! Storage is row-major: cell `(i, j)` lives at `i * ny + j`, where `i` runs
//! over the `nx` rows and `j` over the `ny` columns. Every operator in this
//! crate works on `Grid` values owned by the caller.

pub mod boundary;
pub mod filters;
pub mod gradient;
pub mod kernels;
pub mod neighbors;
mod ops;
pub mod pyramid;
mod resample;

pub use ops::lerp;

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::error::{ErosionError, Result};

/// A dense, fixed-shape 2D field of `f32` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    nx: usize,
    ny: usize,
    data: Vec<f32>,
}

impl Grid {
    /// Creates a grid of shape `(nx, ny)` filled with zeros.
    pub fn new(nx: usize, ny: usize) -> Self {
        Self::constant(nx, ny, 0.0)
    }

    /// Creates a grid of shape `(nx, ny)` filled with `value`.
    pub fn constant(nx: usize, ny: usize, value: f32) -> Self {
        Self {
            nx,
            ny,
            data: vec![value; nx * ny],
        }
    }

    /// Wraps an existing row-major buffer.
    pub fn from_vec(nx: usize, ny: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != nx * ny {
            return Err(ErosionError::parameter(
                "data",
                format!("has {} values, expected {}x{} = {}", data.len(), nx, ny, nx * ny),
            ));
        }
        Ok(Self { nx, ny, data })
    }

    /// Builds a grid by evaluating `f(i, j)` for every cell.
    pub fn from_fn(nx: usize, ny: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(nx * ny);
        for i in 0..nx {
            for j in 0..ny {
                data.push(f(i, j));
            }
        }
        Self { nx, ny, data }
    }

    /// A zero grid with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::new(self.nx, self.ny)
    }

    /// A constant grid with the same shape as `self`.
    pub fn filled_like(&self, value: f32) -> Self {
        Self::constant(self.nx, self.ny, value)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Linear index of cell `(i, j)`.
    #[inline]
    pub fn index_of(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny);
        i * self.ny + j
    }

    /// Inverse of [`Grid::index_of`].
    #[inline]
    pub fn coords_of(&self, idx: usize) -> (usize, usize) {
        (idx / self.ny, idx % self.ny)
    }

    /// True when `(i, j)` is not on the outermost ring of cells.
    #[inline]
    pub fn is_interior(&self, i: usize, j: usize) -> bool {
        i > 0 && j > 0 && i + 1 < self.nx && j + 1 < self.ny
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[self.index_of(i, j)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f32) {
        let idx = self.index_of(i, j);
        self.data[idx] = value;
    }

    /// Value at `(i + di, j + dj)`; the caller guarantees the offset stays in bounds.
    #[inline]
    pub(crate) fn at_offset(&self, i: usize, j: usize, di: i32, dj: i32) -> f32 {
        self.get((i as i64 + di as i64) as usize, (j as i64 + dj as i64) as usize)
    }

    pub fn min(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Peak-to-peak amplitude (`max - min`).
    pub fn ptp(&self) -> f32 {
        self.max() - self.min()
    }

    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            0.0
        } else {
            self.sum() / self.data.len() as f32
        }
    }

    /// Bilinear interpolation inside the cell `(i, j)` at local offset `(u, v)` in `[0, 1)`.
    ///
    /// Requires `i + 1 < nx` and `j + 1 < ny`.
    pub fn value_bilinear_at(&self, i: usize, j: usize, u: f32, v: f32) -> f32 {
        let f00 = self.get(i, j);
        let a10 = self.get(i + 1, j) - f00;
        let a01 = self.get(i, j + 1) - f00;
        let a11 = self.get(i + 1, j + 1) - self.get(i + 1, j) - self.get(i, j + 1) + f00;
        f00 + a10 * u + a01 * v + a11 * u * v
    }

    /// Bilinearly interpolated backward/forward difference along `i`.
    ///
    /// Requires `1 <= i` and `i + 1 < nx`, `j + 1 < ny`.
    pub fn gradient_x_bilinear_at(&self, i: usize, j: usize, u: f32, v: f32) -> f32 {
        let f00 = self.get(i, j) - self.get(i - 1, j);
        let f10 = self.get(i + 1, j) - self.get(i, j);
        let f01 = self.get(i, j + 1) - self.get(i - 1, j + 1);
        let f11 = self.get(i + 1, j + 1) - self.get(i, j + 1);
        let a10 = f10 - f00;
        let a01 = f01 - f00;
        let a11 = f11 - f10 - f01 + f00;
        f00 + a10 * u + a01 * v + a11 * u * v
    }

    /// Bilinearly interpolated backward/forward difference along `j`.
    ///
    /// Requires `1 <= j` and `j + 1 < ny`, `i + 1 < nx`.
    pub fn gradient_y_bilinear_at(&self, i: usize, j: usize, u: f32, v: f32) -> f32 {
        let f00 = self.get(i, j) - self.get(i, j - 1);
        let f10 = self.get(i + 1, j) - self.get(i + 1, j - 1);
        let f01 = self.get(i, j + 1) - self.get(i, j);
        let f11 = self.get(i + 1, j + 1) - self.get(i + 1, j);
        let a10 = f10 - f00;
        let a01 = f01 - f00;
        let a11 = f11 - f10 - f01 + f00;
        f00 + a10 * u + a01 * v + a11 * u * v
    }

    /// Spreads `amount` over the four corners of cell `(i, j)` with bilinear weights.
    pub fn deposit_bilinear_at(&mut self, i: usize, j: usize, u: f32, v: f32, amount: f32) {
        self[(i, j)] += amount * (1.0 - u) * (1.0 - v);
        self[(i + 1, j)] += amount * u * (1.0 - v);
        self[(i, j + 1)] += amount * (1.0 - u) * v;
        self[(i + 1, j + 1)] += amount * u * v;
    }

    /// Spreads `amount` over a `(2 ir + 1)²` cone footprint centred on the
    /// sub-cell position `(i + u, j + v)`.
    ///
    /// The caller guarantees the footprint stays inside the grid.
    pub fn deposit_kernel_bilinear_at(&mut self, i: usize, j: usize, u: f32, v: f32, ir: usize, amount: f32) {
        let n = 2 * ir + 1;
        let mut kernel = Grid::new(n, n);
        for p in 0..n {
            for q in 0..n {
                let x = p as f32 - ir as f32 - u;
                let y = q as f32 - ir as f32 - v;
                kernel[(p, q)] = (1.0 - x.hypot(y)).max(0.0);
            }
        }
        kernel.normalize();

        for p in 0..n {
            for q in 0..n {
                self[(i + p - ir, j + q - ir)] += amount * kernel[(p, q)];
            }
        }
    }

    /// Scales values so that they sum to one (no-op for a zero-sum grid).
    pub fn normalize(&mut self) {
        let sum = self.sum();
        if sum != 0.0 {
            for v in &mut self.data {
                *v /= sum;
            }
        }
    }

    /// Fails unless `other` has the same shape as `self`.
    pub fn ensure_same_shape(&self, field: &'static str, other: &Grid) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(ErosionError::ShapeMismatch {
                field,
                expected: self.shape(),
                found: other.shape(),
            });
        }
        Ok(())
    }

    /// Like [`Grid::ensure_same_shape`] for an optional auxiliary layer.
    pub fn ensure_same_shape_opt(&self, field: &'static str, other: Option<&Grid>) -> Result<()> {
        match other {
            Some(g) => self.ensure_same_shape(field, g),
            None => Ok(()),
        }
    }

    /// Fails unless both dimensions are at least `min`.
    pub fn ensure_min_size(&self, min: usize) -> Result<()> {
        if self.nx < min || self.ny < min {
            return Err(ErosionError::GridTooSmall {
                min,
                shape: self.shape(),
            });
        }
        Ok(())
    }
}

impl Index<(usize, usize)> for Grid {
    type Output = f32;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &f32 {
        &self.data[i * self.ny + j]
    }
}

impl IndexMut<(usize, usize)> for Grid {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f32 {
        &mut self.data[i * self.ny + j]
    }
}
