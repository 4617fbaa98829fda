//! Smoothing and local-extremum filters.

use rayon::prelude::*;

use super::gradient::laplacian;
use super::kernels::smoothstep3;
use super::Grid;

/// Mirror an out-of-range index back into `[0, n)`.
#[inline]
fn reflect(k: i64, n: usize) -> usize {
    let n = n as i64;
    let r = if k < 0 {
        -k
    } else if k >= n {
        2 * n - 2 - k
    } else {
        k
    };
    r.clamp(0, n - 1) as usize
}

/// Separable convolution along `i` with a centred 1D kernel of odd length.
fn convolve1d_i(z: &Grid, kernel: &[f32]) -> Grid {
    let (nx, ny) = z.shape();
    let half = (kernel.len() / 2) as i64;
    Grid::par_from_fn(nx, ny, |i, j| {
        kernel
            .iter()
            .enumerate()
            .map(|(p, w)| w * z[(reflect(i as i64 + p as i64 - half, nx), j)])
            .sum()
    })
}

/// Separable convolution along `j` with a centred 1D kernel of odd length.
fn convolve1d_j(z: &Grid, kernel: &[f32]) -> Grid {
    let (nx, ny) = z.shape();
    let half = (kernel.len() / 2) as i64;
    Grid::par_from_fn(nx, ny, |i, j| {
        kernel
            .iter()
            .enumerate()
            .map(|(q, w)| w * z[(i, reflect(j as i64 + q as i64 - half, ny))])
            .sum()
    })
}

/// Direct 2D convolution with a centred kernel, borders reflected.
pub fn convolve2d(z: &Grid, kernel: &Grid) -> Grid {
    let (nx, ny) = z.shape();
    let (kx, ky) = kernel.shape();
    let (hx, hy) = ((kx / 2) as i64, (ky / 2) as i64);
    Grid::par_from_fn(nx, ny, |i, j| {
        let mut acc = 0.0;
        for p in 0..kx {
            let ii = reflect(i as i64 + p as i64 - hx, nx);
            for q in 0..ky {
                let jj = reflect(j as i64 + q as i64 - hy, ny);
                acc += kernel[(p, q)] * z[(ii, jj)];
            }
        }
        acc
    })
}

/// Normalised 1D cubic-pulse weights of length `2 ir + 1`.
fn cubic_pulse_1d(ir: usize) -> Vec<f32> {
    let mut k: Vec<f32> = (0..2 * ir + 1)
        .map(|p| {
            let x = (p as f32 - ir as f32).abs() / (ir as f32 + 1.0);
            1.0 - smoothstep3(x)
        })
        .collect();
    let sum: f32 = k.iter().sum();
    for w in &mut k {
        *w /= sum;
    }
    k
}

/// Separable low-pass filter with a cubic-pulse kernel of radius `ir`.
///
/// `ir == 0` leaves the grid untouched.
pub fn smooth_cpulse(z: &mut Grid, ir: usize) {
    if ir == 0 {
        return;
    }
    let k = cubic_pulse_1d(ir);
    let tmp = convolve1d_i(z, &k);
    *z = convolve1d_j(&tmp, &k);
}

/// Explicit diffusion, `z += sigma * laplacian(z)` repeated `iterations` times.
pub fn laplace(z: &mut Grid, sigma: f32, iterations: usize) {
    for _ in 0..iterations {
        let delta = laplacian(z);
        z.zip_apply(&delta, |a, d| a + sigma * d);
    }
}

/// 3x3 median filter on interior cells; the outer ring keeps its values.
pub fn median_3x3(z: &mut Grid) {
    let src = z.clone();
    let (nx, ny) = z.shape();
    z.as_mut_slice()
        .par_chunks_mut(ny)
        .enumerate()
        .filter(|(i, _)| *i > 0 && *i + 1 < nx)
        .for_each(|(i, row)| {
            let mut v = [0.0f32; 9];
            for j in 1..ny.saturating_sub(1) {
                let mut n = 0;
                for p in i - 1..=i + 1 {
                    for q in j - 1..=j + 1 {
                        v[n] = src[(p, q)];
                        n += 1;
                    }
                }
                v.sort_by(f32::total_cmp);
                row[j] = v[4];
            }
        });
}

/// Separable moving maximum over a `(2 ir + 1)²` window.
pub fn maximum_local(z: &Grid, ir: usize) -> Grid {
    let (nx, ny) = z.shape();
    let rows = Grid::par_from_fn(nx, ny, |i, j| {
        let (i1, i2) = (i.saturating_sub(ir), (i + ir + 1).min(nx));
        (i1..i2).map(|u| z[(u, j)]).fold(f32::NEG_INFINITY, f32::max)
    });
    Grid::par_from_fn(nx, ny, |i, j| {
        let (j1, j2) = (j.saturating_sub(ir), (j + ir + 1).min(ny));
        (j1..j2).map(|v| rows[(i, v)]).fold(f32::NEG_INFINITY, f32::max)
    })
}

/// Separable moving minimum over a `(2 ir + 1)²` window.
pub fn minimum_local(z: &Grid, ir: usize) -> Grid {
    let neg = z.map(|v| -v);
    maximum_local(&neg, ir).map(|v| -v)
}

/// Polynomial smooth maximum of two grids with blending width `k`.
pub fn maximum_smooth(a: &Grid, b: &Grid, k: f32) -> Grid {
    let mut out = a.clone();
    out.zip_apply(b, |a, b| {
        let h = (k - (a - b).abs()).max(0.0) / k;
        a.max(b) + h * h * h * k / 6.0
    });
    out
}

/// Smooth upper clamp against a per-cell ceiling, blending width `k`.
pub fn clamp_max_smooth(z: &mut Grid, vmax: &Grid, k: f32) {
    z.zip_apply(vmax, |x, m| {
        let h = (k - (x - m).abs()).max(0.0) / k;
        x.min(m) - h * h * h * k / 6.0
    });
}
