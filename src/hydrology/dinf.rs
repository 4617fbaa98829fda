//! Multiple-direction (D-infinity) flow routing.
//!
//! Flow is split between all lower neighbours with weights
//! `(drop · c_k)^p · ecl_k`, where `c_k` is 1 or 1/√2, `ecl_k` is the
//! effective contour length (0.5 cardinal, 0.354 diagonal) and the exponent
//! `p` grows from 1 on flat ground to 11 on slopes at or above `talus_ref`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::d8::fill_unfed_borders;
use crate::error::{ErosionError, Result};
use crate::grid::filters::laplace;
use crate::grid::gradient::gradient_talus;
use crate::grid::neighbors::MOORE;
use crate::grid::Grid;

/// Index of the stencil entry pointing the other way.
const OPPOSITE: [usize; 8] = [3, 2, 1, 0, 7, 6, 5, 4];

/// Per-cell flow fractions toward each [`MOORE`] neighbour.
///
/// Each row sums to one for cells with at least one lower neighbour and is
/// all zeros otherwise (border ring included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DinfPartition {
    nx: usize,
    ny: usize,
    weights: Vec<[f32; 8]>,
}

impl DinfPartition {
    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn get(&self, i: usize, j: usize) -> &[f32; 8] {
        &self.weights[i * self.ny + j]
    }
}

fn ensure_talus_ref(talus_ref: f32) -> Result<()> {
    if !(talus_ref > 0.0) {
        return Err(ErosionError::parameter(
            "talus_ref",
            format!("must be strictly positive, got {talus_ref}"),
        ));
    }
    Ok(())
}

/// Slope-adaptive flow partition of every interior cell.
pub fn flow_direction_dinf(z: &Grid, talus_ref: f32) -> Result<DinfPartition> {
    ensure_talus_ref(talus_ref)?;
    z.ensure_min_size(3)?;
    let (nx, ny) = z.shape();

    let exponent = gradient_talus(z).map(|t| 10.0 * (t / talus_ref).min(1.0) + 1.0);
    let mut weights = vec![[0.0f32; 8]; nx * ny];

    for i in 1..nx - 1 {
        for j in 1..ny - 1 {
            let h = z[(i, j)];
            let p = exponent[(i, j)];
            let w = &mut weights[i * ny + j];
            for (k, o) in MOORE.iter().enumerate() {
                let (pi, qj) = o.apply(i, j);
                let drop = h - z[(pi, qj)];
                if drop > 0.0 {
                    let ecl = if o.dist > 1.0 { 0.354 } else { 0.5 };
                    w[k] = (drop / o.dist).powf(p) * ecl;
                }
            }
            let sum: f32 = w.iter().sum();
            if sum > 0.0 {
                for v in w.iter_mut() {
                    *v /= sum;
                }
            }
        }
    }

    Ok(DinfPartition { nx, ny, weights })
}

/// Fractional contributing area following the D-infinity partition.
///
/// The elevation is lightly smoothed beforehand so single-cell noise does not
/// fragment the routing. Border handling matches
/// [`flow_accumulation_d8`](super::flow_accumulation_d8).
pub fn flow_accumulation_dinf(z: &Grid, talus_ref: f32) -> Result<Grid> {
    ensure_talus_ref(talus_ref)?;
    z.ensure_min_size(3)?;

    let mut zf = z.clone();
    laplace(&mut zf, 0.2, 3);
    let part = flow_direction_dinf(&zf, talus_ref)?;

    let (nx, ny) = z.shape();
    let mut facc = Grid::constant(nx, ny, 1.0);
    let mut fed = vec![false; nx * ny];
    let mut nidp = vec![0u32; nx * ny];

    for i in 1..nx - 1 {
        for j in 1..ny - 1 {
            for (k, o) in MOORE.iter().enumerate() {
                let (p, q) = o.apply(i, j);
                if part.get(p, q)[OPPOSITE[k]] > 0.0 {
                    nidp[i * ny + j] += 1;
                }
            }
        }
    }

    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    for i in 1..nx - 1 {
        for j in 1..ny - 1 {
            if nidp[i * ny + j] == 0 {
                queue.push_back((i, j));
            }
        }
    }

    while let Some((i, j)) = queue.pop_front() {
        let upstream = facc[(i, j)];
        let w = *part.get(i, j);
        for (k, o) in MOORE.iter().enumerate() {
            if w[k] <= 0.0 {
                continue;
            }
            let (p, q) = o.apply(i, j);
            facc[(p, q)] += upstream * w[k];
            fed[p * ny + q] = true;
            if facc.is_interior(p, q) {
                let n = &mut nidp[p * ny + q];
                *n -= 1;
                if *n == 0 {
                    queue.push_back((p, q));
                }
            }
        }
    }

    fill_unfed_borders(&mut facc, &fed);
    Ok(facc)
}
