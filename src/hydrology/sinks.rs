//! Pit detection.

use crate::grid::neighbors::MOORE;
use crate::grid::Grid;

/// Interior cells strictly lower than all eight neighbours, in row-major order.
pub fn find_flow_sinks(z: &Grid) -> Vec<(usize, usize)> {
    let (nx, ny) = z.shape();
    let mut sinks = Vec::new();
    for i in 1..nx.saturating_sub(1) {
        for j in 1..ny.saturating_sub(1) {
            let h = z[(i, j)];
            if MOORE.iter().all(|o| h < z[o.apply(i, j)]) {
                sinks.push((i, j));
            }
        }
    }
    sinks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_isolated_pits_only() {
        let mut z = Grid::constant(7, 7, 1.0);
        z[(2, 2)] = 0.0;
        z[(4, 5)] = 0.5;
        // a flat-bottomed pair is not a strict sink
        z[(5, 1)] = 0.0;
        z[(5, 2)] = 0.0;
        assert_eq!(find_flow_sinks(&z), vec![(2, 2), (4, 5)]);
    }
}
