//! Heightfield erosion and flow routing.
//!
//! This crate operates on dense, row-major 2D elevation grids ([`Grid`]). It
//! provides thermal weathering and hydraulic erosion engines that mutate a
//! caller-owned field in place, D8 and D-infinity flow routing with flow
//! accumulation, pit detection, depression filling and lake flooding from
//! chosen spill points. Terracing ([`erosion::stratify()`]) and a
//! Laplacian-style pyramid ([`grid::pyramid`]) round out the toolbox.
//!
//! Every engine validates its inputs before touching the field, so on error
//! the heightmap is left exactly as it was.

pub mod error;
pub mod erosion;
pub mod grid;
pub mod hydrology;
pub mod noise;

pub use error::{ErosionError, ErrorKind, Result};
pub use erosion::{apply_masked, DepositionTracker, ErosionMaps, MapRequest, Talus};
pub use grid::Grid;
pub use hydrology::FlowRouter;
pub use noise::FractalNoiseConfig;
