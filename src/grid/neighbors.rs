//! 8-connected neighbour stencils and the visiting orders used by cellular engines.
//!
//! The cellular engines need two kinds of ordering freedom to avoid
//! directional bias:
//!
//! - [`NeighborOrder`] permutes which neighbour is looked at first. It is a
//!   cyclic offset into [`MOORE`], advanced once per iteration.
//! - [`SweepOrder`] mirrors the traversal of the interior so consecutive
//!   iterations do not always sweep from the same corner.

use std::f32::consts::SQRT_2;

/// One entry of an 8-neighbour stencil.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offset {
    pub di: i32,
    pub dj: i32,
    /// Euclidean length of the step, 1 or √2.
    pub dist: f32,
}

const fn offset(di: i32, dj: i32, dist: f32) -> Offset {
    Offset { di, dj, dist }
}

/// Moore neighbourhood: the four cardinal steps first, then the diagonals.
pub const MOORE: [Offset; 8] = [
    offset(-1, 0, 1.0),
    offset(0, 1, 1.0),
    offset(0, -1, 1.0),
    offset(1, 0, 1.0),
    offset(-1, -1, SQRT_2),
    offset(-1, 1, SQRT_2),
    offset(1, -1, SQRT_2),
    offset(1, 1, SQRT_2),
];

impl Offset {
    /// Index of the neighbour, assuming `(i, j)` is at least one cell away from the edge.
    #[inline]
    pub fn apply(&self, i: usize, j: usize) -> (usize, usize) {
        (
            (i as i64 + self.di as i64) as usize,
            (j as i64 + self.dj as i64) as usize,
        )
    }

    /// Index of the neighbour, or `None` when it falls outside an `nx` x `ny` grid.
    #[inline]
    pub fn checked_apply(&self, i: usize, j: usize, nx: usize, ny: usize) -> Option<(usize, usize)> {
        let p = i as i64 + self.di as i64;
        let q = j as i64 + self.dj as i64;
        if p < 0 || q < 0 || p >= nx as i64 || q >= ny as i64 {
            None
        } else {
            Some((p as usize, q as usize))
        }
    }
}

/// Cyclic permutation of [`MOORE`].
///
/// Step `k` of the iteration visits `MOORE[(k + shift) % 8]`. Advancing the
/// order once per iteration reproduces a stencil that is rotated by one slot
/// every sweep, without touching the stencil itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighborOrder {
    shift: usize,
}

impl NeighborOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rotate by one slot.
    pub fn advance(&mut self) {
        self.shift = (self.shift + 1) % MOORE.len();
    }

    pub fn shift(&self) -> usize {
        self.shift
    }

    /// Neighbours in the current order.
    pub fn iter(&self) -> impl Iterator<Item = Offset> + '_ {
        (0..MOORE.len()).map(move |k| MOORE[(k + self.shift) % MOORE.len()])
    }
}

/// One of the four mirrored raster orders over a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOrder {
    /// `i` descending, `j` ascending.
    ReverseI,
    /// `i` ascending, `j` descending.
    ReverseJ,
    /// Both descending.
    ReverseBoth,
    /// Both ascending.
    Forward,
}

impl SweepOrder {
    /// The order used at iteration `it`; cycles with period 4.
    pub fn for_iteration(it: usize) -> Self {
        match it % 4 {
            0 => SweepOrder::ReverseI,
            1 => SweepOrder::ReverseJ,
            2 => SweepOrder::ReverseBoth,
            _ => SweepOrder::Forward,
        }
    }

    /// Visits every `(i, j)` with `i` in `[i0, i1)` and `j` in `[j0, j1)`, `j` in the outer loop.
    pub fn visit(self, (i0, i1): (usize, usize), (j0, j1): (usize, usize), mut f: impl FnMut(usize, usize)) {
        let rev_i = matches!(self, SweepOrder::ReverseI | SweepOrder::ReverseBoth);
        let rev_j = matches!(self, SweepOrder::ReverseJ | SweepOrder::ReverseBoth);
        let js: Box<dyn Iterator<Item = usize>> = if rev_j {
            Box::new((j0..j1).rev())
        } else {
            Box::new(j0..j1)
        };
        for j in js {
            if rev_i {
                for i in (i0..i1).rev() {
                    f(i, j);
                }
            } else {
                for i in i0..i1 {
                    f(i, j);
                }
            }
        }
    }
}
