//! Engine configuration.
//!
//! Every struct is serde-serialisable and carries the tuning constants of one
//! engine. Mandatory inputs (heightfield, talus, bedrock, masks) stay
//! positional arguments of the engine functions.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_in_range, ensure_iterations, ErosionError, Result};

/// Parameters of [`crate::erosion::thermal_scree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeConfig {
    /// Random seed for the threshold and slope noise.
    pub seed: u64,
    /// Cells at or above `zmax` (times the noise factor) do not seed scree. `None` uses the field maximum.
    pub zmax: Option<f32>,
    /// Cells at or below `zmin` do not seed scree. `None` uses the field minimum.
    pub zmin: Option<f32>,
    /// Relative amplitude of the multiplicative noise on thresholds and slopes.
    pub noise_ratio: f32,
    /// Slope multiplier near the landing zone; 1 disables soft landing.
    pub landing_talus_ratio: f32,
    /// Width of the soft landing transition, relative to the talus.
    pub landing_width_ratio: f32,
    /// Only cells whose local slope is already below the talus seed scree.
    pub talus_constraint: bool,
}

impl Default for ScreeConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            zmax: None,
            zmin: None,
            noise_ratio: 0.3,
            landing_talus_ratio: 1.0,
            landing_width_ratio: 0.0,
            talus_constraint: true,
        }
    }
}

impl ScreeConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_in_range("noise_ratio", self.noise_ratio, 0.0, 1.0)?;
        ensure_in_range("landing_talus_ratio", self.landing_talus_ratio, 0.0, 1.0)?;
        ensure_in_range("landing_width_ratio", self.landing_width_ratio, 0.0, f32::MAX)
    }
}

/// Parameters of [`crate::erosion::hydraulic_algebric`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgebraicConfig {
    /// Reference slope separating erosion (above) from deposition (below).
    pub talus_ref: f32,
    /// Radius of the presmoothing applied before the slope is measured; 0 disables it.
    pub prefilter_ir: usize,
    pub c_erosion: f32,
    pub c_deposition: f32,
    pub iterations: u32,
}

impl Default for AlgebraicConfig {
    fn default() -> Self {
        Self {
            talus_ref: 0.1,
            prefilter_ir: 0,
            c_erosion: 0.05,
            c_deposition: 0.05,
            iterations: 1,
        }
    }
}

impl AlgebraicConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_positive("talus_ref", self.talus_ref)?;
        ensure_iterations(self.iterations)
    }
}

/// Parameters of [`crate::erosion::hydraulic_spl`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplConfig {
    pub c_erosion: f32,
    /// Reference slope of the D-infinity router.
    pub talus_ref: f32,
    pub iterations: u32,
    /// Presmoothing radius for the slope term; the default floor uses `8 * prefilter_ir`.
    pub prefilter_ir: usize,
}

impl Default for SplConfig {
    fn default() -> Self {
        Self {
            c_erosion: 0.05,
            talus_ref: 0.1,
            iterations: 1,
            prefilter_ir: 1,
        }
    }
}

impl SplConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_positive("talus_ref", self.talus_ref)?;
        ensure_iterations(self.iterations)
    }
}

/// How [`crate::erosion::hydraulic_stream`] shapes the accumulation before carving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StreamScaling {
    /// Clip at `clipping_ratio` times the root mean accumulation.
    Clipped { clipping_ratio: f32 },
    /// Take `log10` and apply a gamma curve.
    Log { gamma: f32 },
}

impl Default for StreamScaling {
    fn default() -> Self {
        Self::Clipped { clipping_ratio: 10.0 }
    }
}

/// Parameters of [`crate::erosion::hydraulic_stream`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub c_erosion: f32,
    /// Reference slope of the D-infinity router.
    pub talus_ref: f32,
    /// Radius of the cone kernel widening the streams; values up to 1 keep them one cell wide.
    pub ir: usize,
    pub scaling: StreamScaling,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            c_erosion: 0.05,
            talus_ref: 0.1,
            ir: 1,
            scaling: StreamScaling::default(),
        }
    }
}

impl StreamConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_positive("talus_ref", self.talus_ref)?;
        match self.scaling {
            StreamScaling::Clipped { clipping_ratio } => ensure_positive("clipping_ratio", clipping_ratio),
            StreamScaling::Log { gamma } => ensure_positive("gamma", gamma),
        }
    }
}

/// Parameters of [`crate::erosion::hydraulic_particle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleConfig {
    /// Number of droplets released.
    pub nparticles: u32,
    pub seed: u64,
    /// Radius of the deposition footprint; 0 deposits bilinearly on the four cell corners.
    pub c_radius: usize,
    /// Sediment carried per unit of volume, speed and drop.
    pub c_capacity: f32,
    pub c_erosion: f32,
    pub c_deposition: f32,
    /// Fraction of the velocity lost per step.
    pub drag_rate: f32,
    /// Fraction of the volume lost per step.
    pub evap_rate: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            nparticles: 40_000,
            seed: 1,
            c_radius: 0,
            c_capacity: 10.0,
            c_erosion: 0.05,
            c_deposition: 0.05,
            drag_rate: 0.001,
            evap_rate: 0.001,
        }
    }
}

impl ParticleConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_iterations(self.nparticles)?;
        ensure_in_range("drag_rate", self.drag_rate, 0.0, 1.0)?;
        if !(self.evap_rate > 0.0 && self.evap_rate <= 1.0) {
            return Err(ErosionError::parameter(
                "evap_rate",
                format!("must lie in (0, 1], got {}", self.evap_rate),
            ));
        }
        Ok(())
    }
}

/// Parameters of [`crate::erosion::hydraulic_vpipes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpipesConfig {
    pub iterations: u32,
    /// Water depth the rain relaxes toward (scaled by the moisture map).
    pub water_height: f32,
    pub c_capacity: f32,
    pub c_erosion: f32,
    pub c_deposition: f32,
    pub rain_rate: f32,
    pub evap_rate: f32,
}

impl Default for VpipesConfig {
    fn default() -> Self {
        Self {
            iterations: 50,
            water_height: 0.1,
            c_capacity: 0.1,
            c_erosion: 0.05,
            c_deposition: 0.05,
            rain_rate: 0.0,
            evap_rate: 0.01,
        }
    }
}

impl VpipesConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_iterations(self.iterations)?;
        ensure_positive("water_height", self.water_height)?;
        // Rates are applied with a half time step.
        ensure_in_range("rain_rate", self.rain_rate, 0.0, 2.0)?;
        ensure_in_range("evap_rate", self.evap_rate, 0.0, 2.0)
    }
}

/// Parameters of [`crate::erosion::hydraulic_musgrave`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusgraveConfig {
    pub iterations: u32,
    pub c_capacity: f32,
    pub c_erosion: f32,
    pub c_deposition: f32,
    pub water_level: f32,
    pub evap_rate: f32,
}

impl Default for MusgraveConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            c_capacity: 1.0,
            c_erosion: 0.1,
            c_deposition: 0.1,
            water_level: 0.01,
            evap_rate: 0.01,
        }
    }
}

impl MusgraveConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_iterations(self.iterations)?;
        ensure_in_range("c_deposition", self.c_deposition, 0.0, 1.0)?;
        ensure_in_range("evap_rate", self.evap_rate, 0.0, 1.0)
    }
}

/// Parameters of [`crate::erosion::hydraulic_benes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenesConfig {
    pub iterations: u32,
    pub c_capacity: f32,
    pub c_erosion: f32,
    pub c_deposition: f32,
    pub water_level: f32,
    pub evap_rate: f32,
    pub rain_rate: f32,
}

impl Default for BenesConfig {
    fn default() -> Self {
        Self {
            iterations: 50,
            c_capacity: 40.0,
            c_erosion: 0.2,
            c_deposition: 0.8,
            water_level: 0.005,
            evap_rate: 0.01,
            rain_rate: 0.5,
        }
    }
}

impl BenesConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_iterations(self.iterations)?;
        ensure_positive("water_level", self.water_level)?;
        ensure_in_range("evap_rate", self.evap_rate, 0.0, 1.0)?;
        ensure_in_range("rain_rate", self.rain_rate, 0.0, 1.0)
    }
}

/// Parameters of [`crate::erosion::hydraulic_schott`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchottConfig {
    pub iterations: u32,
    /// Number of deposition iterations as a fraction of `iterations`.
    pub deposition_iterations_ratio: f32,
    pub c_erosion: f32,
    pub c_deposition: f32,
}

impl Default for SchottConfig {
    fn default() -> Self {
        Self {
            iterations: 40,
            deposition_iterations_ratio: 0.5,
            c_erosion: 1.0,
            c_deposition: 0.2,
        }
    }
}

impl SchottConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_iterations(self.iterations)?;
        ensure_in_range(
            "deposition_iterations_ratio",
            self.deposition_iterations_ratio,
            0.0,
            f32::MAX,
        )
    }
}

/// Parameters of [`crate::erosion::hydraulic_ridge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeConfig {
    /// Reference slope for both the router and the scree pass.
    pub talus: f32,
    /// Depth of the carved ridges.
    pub intensity: f32,
    /// Log-accumulation level above which channels saturate.
    pub erosion_factor: f32,
    /// Soft landing ratio of the scree pass.
    pub smoothing_factor: f32,
    pub noise_ratio: f32,
    /// Presmoothing radius before routing; 0 disables it.
    pub prefilter_ir: usize,
    pub seed: u64,
}

impl Default for RidgeConfig {
    fn default() -> Self {
        Self {
            talus: 0.01,
            intensity: 0.5,
            erosion_factor: 1.5,
            smoothing_factor: 0.5,
            noise_ratio: 0.1,
            prefilter_ir: 0,
            seed: 1,
        }
    }
}

impl RidgeConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_positive("talus", self.talus)?;
        ensure_positive("erosion_factor", self.erosion_factor)?;
        ensure_in_range("smoothing_factor", self.smoothing_factor, 0.0, 1.0)?;
        ensure_in_range("noise_ratio", self.noise_ratio, 0.0, 1.0)
    }
}

/// Cross-section of the carved gullies, as a function of the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErosionProfile {
    Cosine,
    SawSharp,
    SawSmooth,
    SharpValleys,
    SquareSmooth,
    TriangleGrenier,
    TriangleSharp,
    #[default]
    TriangleSmooth,
}

/// Parameters of [`crate::erosion::hydraulic_procedural`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProceduralConfig {
    pub seed: u64,
    /// Gully spacing relative to the grid size along `i`.
    pub ridge_wavelength: f32,
    /// Depth of the gullies.
    pub ridge_scaling: f32,
    pub profile: ErosionProfile,
    /// Sharpness of the smooth profiles.
    pub delta: f32,
    /// Amplitude of the crest noise, relative to the profile.
    pub noise_ratio: f32,
    /// Presmoothing radius; `None` derives it from the kernel width.
    pub prefilter_ir: Option<usize>,
    /// Gabor kernel density multiplier.
    pub density_factor: f32,
    /// Gabor kernel width in ridge wavelengths.
    pub kernel_width_ratio: f32,
    /// How quickly the profile fades in with the Gabor amplitude.
    pub phase_smoothing: f32,
    /// Amplitude of the orientation noise, in radians.
    pub phase_noise_amp: f32,
    pub reverse_phase: bool,
    /// Carve across the slope instead of along it.
    pub rotate90: bool,
    /// Without an explicit mask, restrict carving to steep mid-elevation terrain.
    pub use_default_mask: bool,
    /// Slope at which the default mask saturates; `None` uses `2 / nx`.
    pub talus_mask: Option<f32>,
    /// Elevation range of the default mask; `None` uses the field range.
    pub elevation_range: Option<(f32, f32)>,
}

impl Default for ProceduralConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            ridge_wavelength: 0.1,
            ridge_scaling: 0.1,
            profile: ErosionProfile::default(),
            delta: 0.02,
            noise_ratio: 0.2,
            prefilter_ir: None,
            density_factor: 1.0,
            kernel_width_ratio: 2.0,
            phase_smoothing: 2.0,
            phase_noise_amp: PI,
            reverse_phase: false,
            rotate90: false,
            use_default_mask: true,
            talus_mask: None,
            elevation_range: None,
        }
    }
}

impl ProceduralConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_positive("ridge_wavelength", self.ridge_wavelength)?;
        ensure_positive("delta", self.delta)?;
        ensure_positive("kernel_width_ratio", self.kernel_width_ratio)?;
        ensure_in_range("density_factor", self.density_factor, 0.0, f32::MAX)?;
        ensure_in_range("noise_ratio", self.noise_ratio, 0.0, f32::MAX)?;
        if let Some(t) = self.talus_mask {
            ensure_positive("talus_mask", t)?;
        }
        if let Some((lo, hi)) = self.elevation_range {
            if !(hi > lo) {
                return Err(ErosionError::parameter(
                    "elevation_range",
                    format!("must be increasing, got ({lo}, {hi})"),
                ));
            }
        }
        Ok(())
    }
}

/// Parameters of [`crate::erosion::hydraulic_particle_multiscale`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleMultiscaleConfig {
    /// Droplets released per cell at every pyramid level.
    pub particle_density: f32,
    /// Finest pyramid level that is eroded; finer bands are added back untouched.
    pub finest_level: usize,
    /// Droplet physics. `nparticles` is derived per level and ignored here;
    /// `seed` is bumped once per level.
    pub particle: ParticleConfig,
}

impl Default for ParticleMultiscaleConfig {
    fn default() -> Self {
        Self {
            particle_density: 0.5,
            finest_level: 0,
            particle: ParticleConfig {
                c_deposition: 0.01,
                drag_rate: 0.01,
                ..Default::default()
            },
        }
    }
}

impl ParticleMultiscaleConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_positive("particle_density", self.particle_density)?;
        ParticleConfig {
            nparticles: 1,
            ..self.particle.clone()
        }
        .validate()
    }
}

/// Parameters of [`crate::erosion::hydraulic_stream_upscale_amplification`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamUpscaleConfig {
    /// Number of doublings of the resolution; 0 is a plain stream pass.
    pub upscaling_levels: u32,
    /// Erosion scaling applied per doubling.
    pub persistence: f32,
    pub stream: StreamConfig,
}

impl Default for StreamUpscaleConfig {
    fn default() -> Self {
        Self {
            upscaling_levels: 1,
            persistence: 1.0,
            stream: StreamConfig {
                scaling: StreamScaling::Clipped { clipping_ratio: 10.0 },
                ..Default::default()
            },
        }
    }
}

impl StreamUpscaleConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.upscaling_levels > MAX_UPSCALING_LEVELS {
            return Err(ErosionError::parameter(
                "upscaling_levels",
                format!("must be at most {MAX_UPSCALING_LEVELS}, got {}", self.upscaling_levels),
            ));
        }
        ensure_positive("persistence", self.persistence)?;
        self.stream.validate()
    }
}

const MAX_UPSCALING_LEVELS: u32 = 4;

/// Parameters of [`crate::erosion::sediment_deposition_particle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositionParticleConfig {
    pub nparticles: u32,
    pub seed: u64,
    /// Radius of the cone footprint the load is spread over.
    pub ir: usize,
    /// Sediment every particle carries and drops.
    pub initial_sediment: f32,
    /// Speed under which a particle drops its load.
    pub deposition_velocity_limit: f32,
    /// Fraction of the velocity lost per step.
    pub drag_rate: f32,
}

impl Default for DepositionParticleConfig {
    fn default() -> Self {
        Self {
            nparticles: 10_000,
            seed: 1,
            ir: 1,
            initial_sediment: 0.1,
            deposition_velocity_limit: 0.01,
            drag_rate: 0.001,
        }
    }
}

impl DepositionParticleConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_iterations(self.nparticles)?;
        ensure_in_range("initial_sediment", self.initial_sediment, 0.0, f32::MAX)?;
        ensure_positive("deposition_velocity_limit", self.deposition_velocity_limit)?;
        if !(self.drag_rate > 0.0 && self.drag_rate < 1.0) {
            return Err(ErosionError::parameter(
                "drag_rate",
                format!("must lie in (0, 1), got {}", self.drag_rate),
            ));
        }
        Ok(())
    }
}

fn ensure_positive(name: &'static str, value: f32) -> Result<()> {
    if !(value > 0.0) {
        return Err(ErosionError::parameter(
            name,
            format!("must be strictly positive, got {value}"),
        ));
    }
    Ok(())
}
