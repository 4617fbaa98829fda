//! End-to-end scenarios across the erosion engines and the routers.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use relief::erosion::{
    hydraulic_algebric, hydraulic_benes, hydraulic_particle, hydraulic_particle_multiscale, hydraulic_spl,
    hydraulic_stream, hydraulic_vpipes, thermal, thermal_olsen, thermal_scree, AlgebraicConfig, BenesConfig,
    ParticleConfig, ParticleMultiscaleConfig, ScreeConfig, SplConfig, StreamConfig, VpipesConfig,
};
use relief::hydrology::{
    depression_filling, find_flow_sinks, flooding_from_point, flow_accumulation_d8, flow_accumulation_dinf,
    flow_direction_d8,
};
use relief::{apply_masked, ErosionMaps, Grid, MapRequest, Result, Talus};

/// Smooth hills with a few sharp bumps, values roughly in `[0, 1]`.
fn terrain(n: usize) -> Grid {
    Grid::from_fn(n, n, |i, j| {
        let x = i as f32 / n as f32;
        let y = j as f32 / n as f32;
        let base = 0.5 + 0.3 * (5.0 * x).sin() * (4.0 * y).cos() + 0.2 * x;
        let bump = if (i * 13 + j * 7) % 23 == 0 { 0.1 } else { 0.0 };
        base + bump
    })
}

fn assert_above(z: &Grid, floor: &Grid) {
    for (h, b) in z.as_slice().iter().zip(floor.as_slice()) {
        assert!(*h >= *b, "{h} < {b}");
    }
}

type Engine = fn(&mut Grid, &Grid) -> Result<ErosionMaps>;

#[test]
fn bedrock_is_respected_by_every_engine() {
    let engines: [(&str, Engine); 9] = [
        ("thermal", |z, b| thermal(z, Talus::Uniform(0.01), 20, Some(b), MapRequest::NONE)),
        ("olsen", |z, b| thermal_olsen(z, Talus::Uniform(0.01), 20, Some(b), MapRequest::NONE)),
        ("algebric", |z, b| {
            hydraulic_algebric(z, &AlgebraicConfig::default(), Some(b), MapRequest::NONE)
        }),
        ("spl", |z, b| {
            let cfg = SplConfig {
                iterations: 5,
                ..Default::default()
            };
            hydraulic_spl(z, &cfg, Some(b), None, MapRequest::NONE)
        }),
        ("stream", |z, b| hydraulic_stream(z, &StreamConfig::default(), Some(b), None, MapRequest::NONE)),
        ("particle", |z, b| {
            let cfg = ParticleConfig {
                nparticles: 500,
                ..Default::default()
            };
            hydraulic_particle(z, &cfg, Some(b), None, MapRequest::NONE)
        }),
        ("particle_multiscale", |z, b| {
            let cfg = ParticleMultiscaleConfig {
                particle_density: 0.5,
                ..Default::default()
            };
            hydraulic_particle_multiscale(z, &cfg, Some(b), None, MapRequest::NONE)
        }),
        ("vpipes", |z, b| {
            let cfg = VpipesConfig {
                iterations: 10,
                ..Default::default()
            };
            hydraulic_vpipes(z, &cfg, Some(b), None, MapRequest::NONE)
        }),
        ("benes", |z, b| {
            let cfg = BenesConfig {
                iterations: 10,
                ..Default::default()
            };
            hydraulic_benes(z, &cfg, Some(b), None, MapRequest::NONE)
        }),
    ];

    for (name, engine) in engines {
        let mut z = terrain(32);
        let bedrock = z.map(|v| v - 0.01);
        engine(&mut z, &bedrock).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_above(&z, &bedrock);
    }
}

#[test]
fn maps_split_the_elevation_change() {
    let mut z = terrain(32);
    let before = z.clone();
    let cfg = ParticleConfig {
        nparticles: 1000,
        ..Default::default()
    };
    let maps = hydraulic_particle(&mut z, &cfg, None, None, MapRequest::BOTH).unwrap();
    let erosion = maps.erosion.unwrap();
    let deposition = maps.deposition.unwrap();
    for k in 0..z.len() {
        let (e, d) = (erosion.as_slice()[k], deposition.as_slice()[k]);
        assert!(e >= 0.0 && d >= 0.0);
        assert!(e == 0.0 || d == 0.0);
        assert_abs_diff_eq!(d - e, z.as_slice()[k] - before.as_slice()[k], epsilon = 1e-6);
    }
}

#[test]
fn zero_mask_leaves_terrain_untouched() {
    let mut z = terrain(24);
    let before = z.clone();
    let mask = z.zeros_like();
    apply_masked(&mut z, Some(&mask), |z| {
        thermal(z, Talus::Uniform(0.005), 10, None, MapRequest::NONE)
    })
    .unwrap();
    assert_eq!(z, before);
}

#[test]
fn unit_mask_matches_the_unmasked_run() {
    let mut masked = terrain(24);
    let mut plain = masked.clone();
    let mask = masked.filled_like(1.0);
    apply_masked(&mut masked, Some(&mask), |z| {
        thermal(z, Talus::Uniform(0.005), 10, None, MapRequest::NONE)
    })
    .unwrap();
    thermal(&mut plain, Talus::Uniform(0.005), 10, None, MapRequest::NONE).unwrap();
    for (a, b) in masked.as_slice().iter().zip(plain.as_slice()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
    }
}

#[test]
fn rejected_inputs_leave_terrain_untouched() {
    let mut z = terrain(16);
    let before = z.clone();
    let bad_bedrock = Grid::new(16, 15);
    assert!(thermal(&mut z, Talus::Uniform(0.1), 5, Some(&bad_bedrock), MapRequest::BOTH).is_err());
    let bad_talus = Grid::constant(16, 16, 0.0);
    assert!(thermal(&mut z, Talus::Field(&bad_talus), 5, None, MapRequest::NONE).is_err());
    let cfg = ParticleConfig {
        evap_rate: 0.0,
        ..Default::default()
    };
    assert!(hydraulic_particle(&mut z, &cfg, None, None, MapRequest::NONE).is_err());
    assert_eq!(z, before);
}

#[test]
fn stable_plane_is_a_thermal_fixed_point() {
    let plane = Grid::from_fn(32, 32, |i, j| 0.005 * i as f32 + 0.003 * j as f32);
    let mut z = plane.clone();
    thermal(&mut z, Talus::Uniform(0.01), 20, None, MapRequest::NONE).unwrap();
    for (a, b) in z.as_slice().iter().zip(plane.as_slice()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
    }
}

/// Largest elevation step between 4-neighbours over the whole grid.
fn max_cardinal_step(z: &Grid) -> f32 {
    let (nx, ny) = z.shape();
    let mut steepest = 0.0f32;
    for i in 0..nx {
        for j in 0..ny {
            if i + 1 < nx {
                steepest = steepest.max((z[(i + 1, j)] - z[(i, j)]).abs());
            }
            if j + 1 < ny {
                steepest = steepest.max((z[(i, j + 1)] - z[(i, j)]).abs());
            }
        }
    }
    steepest
}

#[test]
fn tilted_plane_at_the_talus_stays_within_it() {
    let talus = 1.0 / 64.0;
    let mut z = Grid::from_fn(64, 64, |i, _| i as f32 / 64.0);
    thermal(&mut z, Talus::Uniform(talus), 50, None, MapRequest::NONE).unwrap();
    let steepest = max_cardinal_step(&z);
    assert!(steepest <= talus + 1e-6, "steepest step {steepest}");
}

#[test]
fn cliff_relaxes_under_thermal_erosion() {
    let mut z = Grid::from_fn(64, 64, |i, _| if i >= 32 { 1.0 } else { 0.0 });
    thermal(&mut z, Talus::Uniform(1.0 / 64.0), 50, None, MapRequest::NONE).unwrap();
    let steepest = max_cardinal_step(&z);
    assert!(steepest < 0.5, "steepest step {steepest}");
}

#[test]
fn dinf_cone_drains_every_cell_to_the_border() {
    let n = 21;
    let z = Grid::from_fn(n, n, |i, j| -(i as f32 - 10.0).hypot(j as f32 - 10.0));
    let facc = flow_accumulation_dinf(&z, 0.5).unwrap();
    let mut outflow = 0.0f32;
    for i in 0..n {
        for j in 0..n {
            if !facc.is_interior(i, j) {
                outflow += facc[(i, j)];
            }
        }
    }
    assert_relative_eq!(outflow, (n * n) as f32, max_relative = 1e-4);
}

#[test]
fn scree_fills_a_pit_with_talus_slopes() {
    let talus = 0.05;
    let mut z = Grid::from_fn(32, 32, |i, j| {
        let d = (i as i64 - 16).abs().max((j as i64 - 16).abs());
        if d <= 6 {
            0.0
        } else {
            1.0
        }
    });
    let cfg = ScreeConfig {
        zmax: Some(1.5),
        noise_ratio: 0.0,
        talus_constraint: false,
        ..Default::default()
    };
    let maps = thermal_scree(&mut z, talus, &cfg, MapRequest::BOTH).unwrap();
    // Seven cells from the nearest wall.
    assert_abs_diff_eq!(z[(16, 16)], 1.0 - 7.0 * talus, epsilon = 1e-5);
    assert_eq!(maps.erosion.unwrap().max(), 0.0);
}

#[test]
fn d8_valley_drains_to_a_single_outlet() {
    let (nx, ny) = (20, 11);
    let c = (ny / 2) as f32;
    let z = Grid::from_fn(nx, ny, |i, j| i as f32 + 10.0 * (j as f32 - c).abs());
    let facc = flow_accumulation_d8(&z).unwrap();
    assert_eq!(facc[(0, ny / 2)], ((nx - 2) * (ny - 2) + 1) as f32);
    assert!(facc.min() >= 1.0);
}

#[test]
fn filled_terrain_routes_everywhere() {
    let mut z = terrain(24);
    z[(10, 10)] = -1.0;
    z[(15, 6)] = -0.5;
    assert!(!find_flow_sinks(&z).is_empty());

    depression_filling(&mut z, 1e-4).unwrap();
    assert!(find_flow_sinks(&z).is_empty());
    let dirs = flow_direction_d8(&z).unwrap();
    for i in 1..23 {
        for j in 1..23 {
            assert!(dirs.get(i, j).is_some(), "({i}, {j}) has no receiver");
        }
    }
}

#[test]
fn particle_runs_are_reproducible() {
    let moisture = Grid::from_fn(24, 24, |i, _| i as f32 / 24.0);
    let cfg = ParticleConfig {
        nparticles: 400,
        seed: 99,
        ..Default::default()
    };
    let mut a = terrain(24);
    let mut b = a.clone();
    hydraulic_particle(&mut a, &cfg, None, Some(&moisture), MapRequest::NONE).unwrap();
    hydraulic_particle(&mut b, &cfg, None, Some(&moisture), MapRequest::NONE).unwrap();
    assert_eq!(a, b);
}

#[test]
fn flooding_from_the_spill_point_matches_depression_filling() {
    // paraboloid bowl whose lowest rim cells are the edge midpoints
    let n = 17;
    let z = Grid::from_fn(n, n, |i, j| {
        let (x, y) = (i as f32 - 8.0, j as f32 - 8.0);
        0.01 * (x * x + y * y)
    });
    let mut filled = z.clone();
    depression_filling(&mut filled, 0.0).unwrap();
    let depth = flooding_from_point(&z, 0, 8).unwrap();
    for i in 0..n {
        for j in 0..n {
            assert_abs_diff_eq!(depth[(i, j)], filled[(i, j)] - z[(i, j)], epsilon = 1e-6);
        }
    }
    assert_relative_eq!(depth[(8, 8)], 0.64, epsilon = 1e-6);
}
