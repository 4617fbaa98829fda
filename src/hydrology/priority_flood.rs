//! Priority-Flood depression filling (Barnes et al. 2014).
//!
//! The grid boundary is the outlet: every border cell seeds the heap and the
//! flood proceeds inward through the 8-neighbourhood, lowest cell first.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::debug;

use crate::error::{ErosionError, Result};
use crate::grid::neighbors::MOORE;
use crate::grid::Grid;

#[derive(Clone, Copy, Debug)]
struct HeapItem {
    height: f32,
    idx: usize,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapItem {}

// Min-heap by height via reversed ordering; index breaks ties so the
// fill is deterministic.
impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .height
            .total_cmp(&self.height)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Raises every closed depression to its spill elevation.
///
/// With `epsilon > 0` each filled cell is set `epsilon` above the cell it was
/// reached from, so the result drains monotonically toward the border and
/// D8 routing finds a receiver everywhere. `epsilon == 0` gives flat lakes.
pub fn depression_filling(z: &mut Grid, epsilon: f32) -> Result<()> {
    if !(epsilon >= 0.0) {
        return Err(ErosionError::parameter(
            "epsilon",
            format!("must be non-negative, got {epsilon}"),
        ));
    }
    let (nx, ny) = z.shape();
    let mut visited = vec![false; nx * ny];
    let mut heap = BinaryHeap::<HeapItem>::new();

    // Seed outlets
    for i in 0..nx {
        for j in 0..ny {
            if !z.is_interior(i, j) {
                let idx = z.index_of(i, j);
                visited[idx] = true;
                heap.push(HeapItem { height: z[(i, j)], idx });
            }
        }
    }

    let mut raised = 0usize;
    while let Some(HeapItem { height: h_cur, idx }) = heap.pop() {
        let (i, j) = z.coords_of(idx);

        for o in MOORE {
            let Some((p, q)) = o.checked_apply(i, j, nx, ny) else {
                continue;
            };
            let n_idx = p * ny + q;
            if visited[n_idx] {
                continue;
            }
            visited[n_idx] = true;

            let h_n = z[(p, q)];
            let new_h = if h_n <= h_cur { h_cur + epsilon } else { h_n };
            if new_h != h_n {
                raised += 1;
            }
            z[(p, q)] = new_h;
            heap.push(HeapItem { height: new_h, idx: n_idx });
        }
    }

    debug!("depression_filling: raised {raised} cells (epsilon {epsilon})");
    Ok(())
}
