//! Single-direction (D8) flow routing and accumulation.

use std::collections::VecDeque;
use std::f32::consts::FRAC_1_SQRT_2;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::Grid;

/// One of the eight D8 receivers, in code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum D8 {
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    North,
    NorthEast,
}

impl D8 {
    /// All directions in code order; ties are resolved in favour of the earlier one.
    pub const ALL: [D8; 8] = [
        D8::East,
        D8::SouthEast,
        D8::South,
        D8::SouthWest,
        D8::West,
        D8::NorthWest,
        D8::North,
        D8::NorthEast,
    ];

    /// Numeric code in `0..8`.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// `(di, dj)` step toward the receiver.
    pub fn offset(self) -> (i32, i32) {
        match self {
            D8::East => (1, 0),
            D8::SouthEast => (1, -1),
            D8::South => (0, -1),
            D8::SouthWest => (-1, -1),
            D8::West => (-1, 0),
            D8::NorthWest => (-1, 1),
            D8::North => (0, 1),
            D8::NorthEast => (1, 1),
        }
    }

    /// Weight applied to the elevation drop, 1 for cardinal steps and 1/√2 for diagonals.
    pub fn weight(self) -> f32 {
        match self.code() % 2 {
            0 => 1.0,
            _ => FRAC_1_SQRT_2,
        }
    }

    /// The direction pointing back.
    pub fn opposite(self) -> D8 {
        D8::ALL[(self.code() as usize + 4) % 8]
    }
}

/// Per-cell D8 receivers.
///
/// `None` marks cells that do not drain anywhere: the border ring, local
/// sinks and flats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct D8Directions {
    nx: usize,
    ny: usize,
    dirs: Vec<Option<D8>>,
}

impl D8Directions {
    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn get(&self, i: usize, j: usize) -> Option<D8> {
        self.dirs[i * self.ny + j]
    }

    /// Linear index of the receiver of linear cell `idx`, if any.
    pub fn receiver(&self, idx: usize) -> Option<usize> {
        self.dirs[idx].map(|d| {
            let (di, dj) = d.offset();
            let i = (idx / self.ny) as i64 + di as i64;
            let j = (idx % self.ny) as i64 + dj as i64;
            i as usize * self.ny + j as usize
        })
    }
}

/// Steepest-descent receiver of every interior cell.
pub fn flow_direction_d8(z: &Grid) -> Result<D8Directions> {
    z.ensure_min_size(3)?;
    let (nx, ny) = z.shape();
    let mut dirs = vec![None; nx * ny];

    for i in 1..nx - 1 {
        for j in 1..ny - 1 {
            let h = z[(i, j)];
            let mut dmax = 0.0f32;
            let mut best = None;
            for d in D8::ALL {
                let (di, dj) = d.offset();
                let drop = (h - z.at_offset(i, j, di, dj)) * d.weight();
                // strict comparison keeps the first maximum found
                if drop > dmax {
                    dmax = drop;
                    best = Some(d);
                }
            }
            dirs[i * ny + j] = best;
        }
    }

    Ok(D8Directions { nx, ny, dirs })
}

/// Number of interior neighbours draining into each cell.
pub fn d8_in_degree(dirs: &D8Directions) -> Vec<u32> {
    let mut nidp = vec![0u32; dirs.nx * dirs.ny];
    for idx in 0..dirs.dirs.len() {
        if let Some(r) = dirs.receiver(idx) {
            nidp[r] += 1;
        }
    }
    nidp
}

/// Contributing area of every cell, in cells, following D8 receivers.
///
/// Cells are drained in topological order with an in-degree counter per cell
/// and a FIFO of cells whose upstream is complete. Border cells are outlets:
/// they keep whatever flow reaches them, and border cells that receive no
/// flow copy the value of their nearest interior cell. Every value is at
/// least 1.
pub fn flow_accumulation_d8(z: &Grid) -> Result<Grid> {
    let dirs = flow_direction_d8(z)?;
    let (nx, ny) = z.shape();
    let mut facc = Grid::constant(nx, ny, 1.0);
    let mut nidp = d8_in_degree(&dirs);
    let mut fed = vec![false; nx * ny];

    let mut queue: VecDeque<usize> = (0..nx * ny)
        .filter(|&idx| {
            let (i, j) = facc.coords_of(idx);
            facc.is_interior(i, j) && nidp[idx] == 0
        })
        .collect();

    while let Some(idx) = queue.pop_front() {
        let Some(r) = dirs.receiver(idx) else {
            continue;
        };
        let upstream = facc.as_slice()[idx];
        facc.as_mut_slice()[r] += upstream;
        fed[r] = true;
        nidp[r] -= 1;
        let (p, q) = facc.coords_of(r);
        if nidp[r] == 0 && facc.is_interior(p, q) {
            queue.push_back(r);
        }
    }

    fill_unfed_borders(&mut facc, &fed);
    Ok(facc)
}

/// Border cells that collected nothing take the value of the closest interior cell.
pub(crate) fn fill_unfed_borders(facc: &mut Grid, fed: &[bool]) {
    let (nx, ny) = facc.shape();
    for i in 0..nx {
        for j in 0..ny {
            if facc.is_interior(i, j) || fed[i * ny + j] {
                continue;
            }
            let p = i.clamp(1, nx - 2);
            let q = j.clamp(1, ny - 2);
            facc[(i, j)] = facc[(p, q)];
        }
    }
}
