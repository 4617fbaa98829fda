use log::debug;

use super::hydraulic_particle;
use crate::erosion::{ensure_layers, DepositionTracker, ErosionMaps, MapRequest, ParticleConfig, ParticleMultiscaleConfig};
use crate::error::Result;
use crate::grid::pyramid::Pyramid;
use crate::grid::Grid;

/// Pyramid depth relative to the deepest possible level.
const PYRAMID_LEVELS: i32 = -4;

/// Matches an auxiliary layer to the shape of a pyramid level.
fn at_level(layer: Option<&Grid>, shape: (usize, usize)) -> Option<Grid> {
    layer.map(|g| {
        if g.shape() == shape {
            g.clone()
        } else {
            g.resample_bilinear(shape.0, shape.1)
        }
    })
}

/// [`hydraulic_particle`] run at every level of a pyramid decomposition.
///
/// The field is split into frequency bands. Walking back from the coarsest
/// level, each partial reconstruction is eroded by
/// `particle_density · cells` droplets before the next band is added, so
/// large valleys form at low resolution and detail is carved on top.
/// Bedrock and moisture are resampled to every level; the seed is bumped
/// once per level.
pub fn hydraulic_particle_multiscale(
    z: &mut Grid,
    config: &ParticleMultiscaleConfig,
    bedrock: Option<&Grid>,
    moisture: Option<&Grid>,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    config.validate()?;
    z.ensure_min_size(4)?;
    ensure_layers(z, &[("bedrock", bedrock), ("moisture", moisture)])?;

    let tracker = DepositionTracker::begin(z, maps);
    let pyramid = Pyramid::decompose(z, PYRAMID_LEVELS);
    debug!(
        "hydraulic_particle_multiscale: shape={:?} levels={} density={}",
        z.shape(),
        pyramid.levels(),
        config.particle_density
    );

    let mut seed = config.particle.seed;
    let eroded = pyramid.transform(config.finest_level, |level, n| {
        let mut out = level.clone();
        let nparticles = (config.particle_density * level.len() as f32) as u32;
        if nparticles == 0 || level.nx() < 4 || level.ny() < 4 {
            debug!("hydraulic_particle_multiscale: level {n} skipped");
            return Ok(out);
        }
        seed += 1;
        let particle = ParticleConfig {
            nparticles,
            seed,
            ..config.particle.clone()
        };
        let bedrock = at_level(bedrock, level.shape());
        let moisture = at_level(moisture, level.shape());
        hydraulic_particle(&mut out, &particle, bedrock.as_ref(), moisture.as_ref(), MapRequest::NONE)?;
        Ok(out)
    })?;

    *z = eroded;
    z.clamp_to_bedrock(bedrock);
    Ok(tracker.finish(z))
}
