//! Small convolution and splatting kernels.
//!
//! Radial kernels are evaluated on a normalised radius
//! `r = hypot(x / (ri + 1), y / (rj + 1))` measured from the array centre,
//! with `ri = (n - 1) / 2`.

use std::f32::consts::PI;

use super::Grid;

fn radial(nx: usize, ny: usize, profile: impl Fn(f32) -> f32) -> Grid {
    let ri = (nx as f32 - 1.0) * 0.5;
    let rj = (ny as f32 - 1.0) * 0.5;
    Grid::from_fn(nx, ny, |i, j| {
        let x = (i as f32 - ri) / (ri + 1.0);
        let y = (j as f32 - rj) / (rj + 1.0);
        profile(x.hypot(y))
    })
}

/// Linear cone, `max(0, 1 - r)`.
pub fn cone(nx: usize, ny: usize) -> Grid {
    radial(nx, ny, |r| (1.0 - r).max(0.0))
}

/// Tricube, `(1 - r³)³` inside the unit radius.
pub fn tricube(nx: usize, ny: usize) -> Grid {
    radial(nx, ny, |r| {
        if r < 1.0 {
            (1.0 - r * r * r).powi(3)
        } else {
            0.0
        }
    })
}

/// Cubic pulse, `1 - r²(3 - 2r)` inside the unit radius.
pub fn cubic_pulse(nx: usize, ny: usize) -> Grid {
    radial(nx, ny, |r| {
        if r < 1.0 {
            1.0 - r * r * (3.0 - 2.0 * r)
        } else {
            0.0
        }
    })
}

/// Smoothstep polynomial `x²(3 - 2x)` on `x` in `[0, 1]`.
#[inline]
pub fn smoothstep3(x: f32) -> f32 {
    x * x * (3.0 - 2.0 * x)
}

/// Square Gabor kernel of side `n`: cubic-pulse envelope times a cosine carrier
/// with `kw` half-periods across the kernel, oriented at `angle_deg`.
///
/// With `quadrature` the carrier is a sine, giving the 90° phase-shifted pair.
pub fn gabor(n: usize, kw: f32, angle_deg: f32, quadrature: bool) -> Grid {
    let envelope = cubic_pulse(n, n);
    let (sa, ca) = angle_deg.to_radians().sin_cos();
    let step = 2.0 / n as f32;
    Grid::from_fn(n, n, |i, j| {
        let x = -1.0 + step * i as f32;
        let y = -1.0 + step * j as f32;
        let phase = PI * kw * (x * ca + y * sa);
        let carrier = if quadrature { phase.sin() } else { phase.cos() };
        envelope[(i, j)] * carrier
    })
}

impl Grid {
    /// Adds `kernel` to `self`, centred on `(ic, jc)` and truncated at the edges.
    pub fn add_kernel(&mut self, kernel: &Grid, ic: usize, jc: usize) {
        let (nx, ny) = self.shape();
        let (kx, ky) = kernel.shape();
        let (hx, hy) = (kx as i64 / 2, ky as i64 / 2);
        for p in 0..kx {
            let i = ic as i64 + p as i64 - hx;
            if i < 0 || i >= nx as i64 {
                continue;
            }
            for q in 0..ky {
                let j = jc as i64 + q as i64 - hy;
                if j < 0 || j >= ny as i64 {
                    continue;
                }
                self[(i as usize, j as usize)] += kernel[(p, q)];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_radial_kernels_peak_at_centre() {
        for k in [cone(5, 5), tricube(5, 5), cubic_pulse(5, 5)] {
            assert_abs_diff_eq!(k[(2, 2)], 1.0);
            assert!(k[(0, 2)] < k[(1, 2)]);
            assert!(k.min() >= 0.0);
        }
    }

    #[test]
    fn test_gabor_pair_is_symmetric() {
        let g = gabor(8, 2.0, 30.0, false);
        let q = gabor(8, 2.0, 30.0, true);
        assert_eq!(g.shape(), (8, 8));
        // the cosine carrier is one at the origin, the sine carrier zero
        assert_abs_diff_eq!(g[(4, 4)], cubic_pulse(8, 8)[(4, 4)], epsilon = 1e-6);
        assert_abs_diff_eq!(q[(4, 4)], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_add_kernel_truncates() {
        let mut z = Grid::new(4, 4);
        let k = Grid::constant(3, 3, 1.0);
        z.add_kernel(&k, 0, 0);
        assert_abs_diff_eq!(z.sum(), 4.0);
        z.add_kernel(&k, 2, 2);
        assert_abs_diff_eq!(z.sum(), 13.0);
    }

    #[test]
    fn test_smoothstep_endpoints() {
        assert_eq!(smoothstep3(0.0), 0.0);
        assert_eq!(smoothstep3(1.0), 1.0);
        assert_abs_diff_eq!(smoothstep3(0.5), 0.5);
    }
}
