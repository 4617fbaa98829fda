//! Hydraulic erosion engines.
//!
//! Cellular water models (`vpipes`, `musgrave`, `benes`), Lagrangian droplet
//! models (`particle`, its pyramid variant `particle_multiscale`, and the
//! deposit-only `deposition_particle`), flow-accumulation driven stream power
//! laws (`stream`, `spl`, `schott`, `algebraic`) and non-simulating carvers
//! (`ridge`, `procedural`). `diffusion` is the nonlinear hillslope complement.

mod algebraic;
mod benes;
mod deposition_particle;
mod diffusion;
mod musgrave;
mod particle;
mod particle_multiscale;
mod procedural;
mod ridge;
mod schott;
mod spl;
mod stream;
mod vpipes;

pub use algebraic::hydraulic_algebric;
pub use benes::hydraulic_benes;
pub use deposition_particle::sediment_deposition_particle;
pub use diffusion::hydraulic_diffusion;
pub use musgrave::hydraulic_musgrave;
pub use particle::hydraulic_particle;
pub use particle_multiscale::hydraulic_particle_multiscale;
pub use procedural::hydraulic_procedural;
pub use ridge::hydraulic_ridge;
pub use schott::hydraulic_schott;
pub use spl::hydraulic_spl;
pub use stream::{hydraulic_stream, hydraulic_stream_log, hydraulic_stream_upscale_amplification};
pub use vpipes::hydraulic_vpipes;
