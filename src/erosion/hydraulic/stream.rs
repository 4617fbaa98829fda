use log::debug;

use crate::erosion::{
    ensure_layers, DepositionTracker, ErosionMaps, MapRequest, StreamConfig, StreamScaling, StreamUpscaleConfig,
};
use crate::error::Result;
use crate::grid::filters::convolve2d;
use crate::grid::kernels::cone;
use crate::grid::Grid;
use crate::hydrology::flow_accumulation_dinf;

/// Single-pass stream carving from the flow accumulation.
///
/// The D-infinity accumulation is either clipped at `clipping_ratio` times
/// its root mean or log-scaled with a gamma curve, then remapped to `[0, 1]`,
/// widened with a normalised cone kernel of radius `ir` when `ir > 1`, and
/// finally subtracted from the field scaled by `c_erosion` (and moisture).
/// Only erosion is produced; the field never drops below `bedrock`.
pub fn hydraulic_stream(
    z: &mut Grid,
    config: &StreamConfig,
    bedrock: Option<&Grid>,
    moisture: Option<&Grid>,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    config.validate()?;
    z.ensure_min_size(3)?;
    ensure_layers(z, &[("bedrock", bedrock), ("moisture", moisture)])?;
    debug!(
        "hydraulic_stream: shape={:?} c_erosion={} scaling={:?}",
        z.shape(),
        config.c_erosion,
        config.scaling
    );

    let tracker = DepositionTracker::begin(z, maps);
    let mut facc = flow_accumulation_dinf(z, config.talus_ref)?;

    match config.scaling {
        StreamScaling::Clipped { clipping_ratio } => {
            let vmax = clipping_ratio * (facc.sum() / facc.len() as f32).sqrt();
            facc.clamp(0.0, vmax);
            facc.remap(0.0, 1.0);
        }
        StreamScaling::Log { gamma } => {
            facc.map_inplace(f32::log10);
            facc.remap(0.0, 1.0);
            facc.gamma_correction(gamma);
        }
    }

    if config.ir > 1 {
        let mut kernel = cone(config.ir, config.ir);
        kernel.normalize();
        facc = convolve2d(&facc, &kernel);
    }

    facc *= config.c_erosion;
    if let Some(m) = moisture {
        facc *= m;
    }
    *z -= &facc;
    z.clamp_to_bedrock(bedrock);

    Ok(tracker.finish(z))
}

/// [`hydraulic_stream`] with log-scaled accumulation and the given gamma.
pub fn hydraulic_stream_log(
    z: &mut Grid,
    config: &StreamConfig,
    gamma: f32,
    bedrock: Option<&Grid>,
    moisture: Option<&Grid>,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    let config = StreamConfig {
        scaling: StreamScaling::Log { gamma },
        ..config.clone()
    };
    hydraulic_stream(z, &config, bedrock, moisture, maps)
}

/// [`hydraulic_stream`] repeated on successively doubled resolutions.
///
/// The field is bicubically upsampled `upscaling_levels` times; at level `k`
/// streams are carved with `c_erosion · persistenceᵏ`, so the finer levels
/// add thinner tributaries. The result is resampled bilinearly back to the
/// input shape. With zero levels this is a single stream pass.
pub fn hydraulic_stream_upscale_amplification(
    z: &mut Grid,
    config: &StreamUpscaleConfig,
    maps: MapRequest,
) -> Result<ErosionMaps> {
    config.validate()?;
    z.ensure_min_size(3)?;
    debug!(
        "hydraulic_stream_upscale_amplification: shape={:?} levels={} persistence={}",
        z.shape(),
        config.upscaling_levels,
        config.persistence
    );

    let tracker = DepositionTracker::begin(z, maps);
    let (nx, ny) = z.shape();
    let mut level = z.clone();
    for k in 0..=config.upscaling_levels {
        let scale = 1usize << k;
        level = level.resample_bicubic(scale * nx, scale * ny);
        let stream = StreamConfig {
            c_erosion: config.stream.c_erosion * config.persistence.powi(k as i32),
            ..config.stream.clone()
        };
        hydraulic_stream(&mut level, &stream, None, None, MapRequest::NONE)?;
    }
    *z = level.resample_bilinear(nx, ny);

    Ok(tracker.finish(z))
}
