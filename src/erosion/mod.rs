//! Erosion engines.
//!
//! Every engine mutates a caller-owned [`Grid`] in place and validates all of
//! its inputs before touching it. Thermal engines relax slopes toward a talus
//! limit; hydraulic engines move material with water. Derived erosion and
//! deposition maps come from [`DepositionTracker`], and any engine can be
//! restricted to a region with [`apply_masked`].

mod config;
pub mod hydraulic;
mod masked;
mod stratify;
mod talus;
pub mod thermal;
mod tracker;

pub use config::{
    AlgebraicConfig, BenesConfig, DepositionParticleConfig, ErosionProfile, MusgraveConfig, ParticleConfig,
    ParticleMultiscaleConfig, ProceduralConfig, RidgeConfig, SchottConfig, ScreeConfig, SplConfig, StreamConfig,
    StreamScaling, StreamUpscaleConfig, VpipesConfig,
};
pub use hydraulic::{
    hydraulic_algebric, hydraulic_benes, hydraulic_diffusion, hydraulic_musgrave, hydraulic_particle,
    hydraulic_particle_multiscale, hydraulic_procedural, hydraulic_ridge, hydraulic_schott, hydraulic_spl,
    hydraulic_stream, hydraulic_stream_log, hydraulic_stream_upscale_amplification, hydraulic_vpipes,
    sediment_deposition_particle,
};
pub use masked::apply_masked;
pub use stratify::stratify;
pub use talus::Talus;
pub use thermal::{
    sediment_deposition, thermal, thermal_auto_bedrock, thermal_flatten, thermal_flatten_uniform,
    thermal_olsen, thermal_rib, thermal_schott, thermal_scree,
};
pub use tracker::{DepositionTracker, ErosionMaps, MapRequest};

use crate::error::Result;
use crate::grid::Grid;

/// Checks the shape of every optional auxiliary layer against `z`.
pub(crate) fn ensure_layers(z: &Grid, layers: &[(&'static str, Option<&Grid>)]) -> Result<()> {
    for &(name, layer) in layers {
        z.ensure_same_shape_opt(name, layer)?;
    }
    Ok(())
}
