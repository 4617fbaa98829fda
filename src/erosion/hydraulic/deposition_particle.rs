use glam::Vec2;
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::particle::{draw_spawn, VELOCITY_MIN};
use crate::erosion::{ensure_layers, DepositionParticleConfig, DepositionTracker, ErosionMaps, MapRequest};
use crate::error::Result;
use crate::grid::kernels::cone;
use crate::grid::Grid;

const MAX_STEPS: u32 = 1000;

/// Drops sediment where rolling particles slow down.
///
/// Each particle spawns at rest (redrawn up to 20 times while `spawning` is
/// below 0.1), then accelerates down the bilinear gradient and loses
/// `drag_rate` of its velocity per step. When its speed falls below
/// `deposition_velocity_limit` it spreads `initial_sediment` over a cone
/// footprint of radius `ir` and stops. Particles that never move, leave the
/// domain or stop too close to the border drop nothing. The field only
/// gains material.
pub fn sediment_deposition_particle(
    z: &mut Grid,
    config: &DepositionParticleConfig,
    spawning: Option<&Grid>,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    config.validate()?;
    z.ensure_min_size(4)?;
    ensure_layers(z, &[("spawning", spawning)])?;
    debug!(
        "sediment_deposition_particle: shape={:?} nparticles={} ir={}",
        z.shape(),
        config.nparticles,
        config.ir
    );

    let tracker = DepositionTracker::begin(z, maps);
    let (nx, ny) = z.shape();
    let ir = config.ir;
    let mut kernel = cone(2 * ir + 1, 2 * ir + 1);
    kernel.normalize();
    kernel *= config.initial_sediment;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut deposited = 0u32;

    for _ in 0..config.nparticles {
        let mut pos = draw_spawn(&mut rng, nx, ny, spawning);
        let mut vel = Vec2::ZERO;

        for _ in 0..MAX_STEPS {
            let (i, j) = (pos.x as usize, pos.y as usize);
            let (u, v) = (pos.x - i as f32, pos.y - j as f32);
            let normal = -Vec2::new(z.gradient_x_bilinear_at(i, j, u, v), z.gradient_y_bilinear_at(i, j, u, v));

            vel = (vel + normal) * (1.0 - config.drag_rate);
            let speed = vel.length();
            if speed < VELOCITY_MIN {
                break;
            }
            if speed < config.deposition_velocity_limit {
                if i > ir && i + ir + 1 < nx && j > ir && j + ir + 1 < ny {
                    z.add_kernel(&kernel, i, j);
                    deposited += 1;
                }
                break;
            }

            pos += vel;
            if pos.x < 1.0 || pos.y < 1.0 || pos.x >= (nx - 2) as f32 || pos.y >= (ny - 2) as f32 {
                break;
            }
        }
    }

    z.extrapolate_borders();
    debug!(
        "sediment_deposition_particle: {deposited} of {} particles deposited",
        config.nparticles
    );
    Ok(tracker.finish(z))
}
