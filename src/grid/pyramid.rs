//! Laplacian-style pyramid decomposition.
//!
//! Each level stores the high-pass residue `low - laplace(low)`; the filtered
//! field is then halved with bilinear resampling and passed to the next
//! level. Reconstruction walks back up with bicubic upsampling.

use log::debug;

use super::filters::laplace;
use super::Grid;
use crate::error::Result;

const LOW_PASS_SIGMA: f32 = 0.25;

/// Number of halvings before the smaller side of `(nx, ny)` drops below one.
fn max_levels(nx: usize, ny: usize) -> usize {
    nx.min(ny).max(1).ilog2() as usize
}

/// Multi-level band decomposition of a grid, finest level first.
#[derive(Debug, Clone)]
pub struct Pyramid {
    components: Vec<Grid>,
    residual: Grid,
}

impl Pyramid {
    /// Decomposes `z` into `nlevels` bands.
    ///
    /// A non-positive `nlevels` counts back from the deepest possible level,
    /// so `-4` stops while the coarsest level still has about 32 cells on its
    /// smaller side at 512². At least one level is always built.
    pub fn decompose(z: &Grid, nlevels: i32) -> Pyramid {
        let deepest = max_levels(z.nx(), z.ny()) as i32;
        let requested = if nlevels <= 0 { deepest + nlevels } else { nlevels.min(deepest) };
        let effective = requested.max(1) as usize;
        if effective as i32 != nlevels {
            debug!("pyramid: levels adjusted to {effective} (requested {nlevels}, deepest {deepest})");
        }

        let mut components = Vec::with_capacity(effective);
        let mut low = z.clone();
        for n in 0..effective {
            let mut filtered = low.clone();
            laplace(&mut filtered, LOW_PASS_SIGMA, 1);
            components.push(&low - &filtered);

            if n + 1 == effective {
                low = filtered;
                break;
            }
            low = filtered.resample_bilinear((low.nx() / 2).max(1), (low.ny() / 2).max(1));
        }

        Pyramid {
            components,
            residual: low,
        }
    }

    pub fn levels(&self) -> usize {
        self.components.len()
    }

    /// High-pass band of level `n` (0 is the finest).
    pub fn component(&self, n: usize) -> &Grid {
        &self.components[n]
    }

    /// Low-pass field left at the coarsest level.
    pub fn residual(&self) -> &Grid {
        &self.residual
    }

    /// Sums the bands back into a grid of the original shape.
    pub fn reconstruct(&self) -> Grid {
        let mut out = self.residual.clone();
        for n in (0..self.levels()).rev() {
            out += &self.components[n];
            if n > 0 {
                let (nx, ny) = self.components[n - 1].shape();
                out = out.resample_bicubic(nx, ny);
            }
        }
        out
    }

    /// Reconstructs the field while applying `f(field, level)` to the partial
    /// reconstruction at every level down to `finest_level`.
    ///
    /// Levels finer than `finest_level` are added back untouched.
    pub fn transform<F>(&self, finest_level: usize, mut f: F) -> Result<Grid>
    where
        F: FnMut(&Grid, usize) -> Result<Grid>,
    {
        let mut out = self.residual.clone();
        for n in (0..self.levels()).rev() {
            out += &self.components[n];
            if n >= finest_level {
                out = f(&out, n)?;
            }
            if n > 0 {
                let (nx, ny) = self.components[n - 1].shape();
                out = out.resample_bicubic(nx, ny);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn waves(nx: usize, ny: usize) -> Grid {
        Grid::from_fn(nx, ny, |i, j| (0.3 * i as f32).sin() + (0.17 * j as f32).cos())
    }

    #[test]
    fn test_level_count() {
        assert_eq!(Pyramid::decompose(&waves(64, 64), -4).levels(), 2);
        assert_eq!(Pyramid::decompose(&waves(64, 40), 10).levels(), 5);
        assert_eq!(Pyramid::decompose(&waves(16, 16), -4).levels(), 1);
        assert_eq!(Pyramid::decompose(&waves(16, 16), 3).levels(), 3);
    }

    #[test]
    fn test_odd_shapes_come_back_to_the_input_shape() {
        let z = waves(33, 21);
        let pyr = Pyramid::decompose(&z, 3);
        assert_eq!(pyr.component(1).shape(), (16, 10));
        assert_eq!(pyr.residual().shape(), (8, 5));
        assert_eq!(pyr.reconstruct().shape(), (33, 21));
    }

    #[test]
    fn test_single_level_reconstruction_is_exact() {
        let z = waves(20, 24);
        let out = Pyramid::decompose(&z, 1).reconstruct();
        for (a, b) in out.as_slice().iter().zip(z.as_slice()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_constant_survives_any_depth() {
        let z = Grid::constant(32, 32, 0.7);
        let out = Pyramid::decompose(&z, 4).reconstruct();
        for v in out.as_slice() {
            assert_abs_diff_eq!(*v, 0.7, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_transform_visits_levels_coarse_to_fine() {
        let z = waves(32, 32);
        let pyr = Pyramid::decompose(&z, 3);
        let mut seen = Vec::new();
        let out = pyr
            .transform(1, |g, n| {
                seen.push((n, g.shape()));
                Ok(g.clone())
            })
            .unwrap();
        assert_eq!(seen, vec![(2, (8, 8)), (1, (16, 16))]);

        // an identity transform is a plain reconstruction
        assert_eq!(out, pyr.reconstruct());
    }
}
