//! Border treatments applied after stencil sweeps that leave the outer rings stale.

use super::Grid;

impl Grid {
    /// Copies the first interior ring outward onto the outermost ring.
    pub fn fill_borders(&mut self) {
        self.fill_borders_n(1);
    }

    /// Copies values outward so that the `n` outermost rings repeat ring `n`.
    pub fn fill_borders_n(&mut self, n: usize) {
        let (nx, ny) = self.shape();
        if nx <= n || ny <= n {
            return;
        }
        for j in 0..ny {
            for k in (0..n).rev() {
                self[(k, j)] = self[(k + 1, j)];
                self[(nx - 1 - k, j)] = self[(nx - 2 - k, j)];
            }
        }
        for k in (0..n).rev() {
            for i in 0..nx {
                self[(i, k)] = self[(i, k + 1)];
                self[(i, ny - 1 - k)] = self[(i, ny - 2 - k)];
            }
        }
    }

    /// Linear extrapolation of the outermost ring from the two next rings.
    pub fn extrapolate_borders(&mut self) {
        self.extrapolate_borders_n(1);
    }

    /// Linear extrapolation of the `n` outermost rings, working outward.
    pub fn extrapolate_borders_n(&mut self, n: usize) {
        let (nx, ny) = self.shape();
        if nx < n + 2 || ny < n + 2 {
            return;
        }
        for j in 0..ny {
            for k in (0..n).rev() {
                self[(k, j)] = 2.0 * self[(k + 1, j)] - self[(k + 2, j)];
                self[(nx - 1 - k, j)] = 2.0 * self[(nx - 2 - k, j)] - self[(nx - 3 - k, j)];
            }
        }
        for i in 0..nx {
            for k in (0..n).rev() {
                self[(i, k)] = 2.0 * self[(i, k + 1)] - self[(i, k + 2)];
                self[(i, ny - 1 - k)] = 2.0 * self[(i, ny - 2 - k)] - self[(i, ny - 3 - k)];
            }
        }
    }
}
