//! Property-based tests for the invariants shared by the engines.
//!
//! Heightfields are drawn at random in `[0, 1)` with sides between 5 and 12.

use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use relief::erosion::{thermal, thermal_olsen, ParticleConfig};
use relief::hydrology::{depression_filling, find_flow_sinks, flow_accumulation_d8, flow_accumulation_dinf};
use relief::{apply_masked, Grid, MapRequest, Talus};

fn heightfield() -> impl Strategy<Value = Grid> {
    (5usize..12, 5usize..12).prop_flat_map(|(nx, ny)| {
        prop::collection::vec(0.0f32..1.0, nx * ny)
            .prop_map(move |data| Grid::from_vec(nx, ny, data).expect("matching length"))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn accumulation_is_at_least_one(z in heightfield()) {
        let d8 = flow_accumulation_d8(&z).unwrap();
        let dinf = flow_accumulation_dinf(&z, 0.1).unwrap();
        prop_assert!(d8.min() >= 1.0);
        prop_assert!(dinf.min() >= 1.0 - 1e-5);
    }

    #[test]
    fn thermal_stays_above_bedrock(z in heightfield(), drop in 0.0f32..0.2) {
        let bedrock = z.map(|v| v - drop);
        let mut a = z.clone();
        thermal(&mut a, Talus::Uniform(0.05), 10, Some(&bedrock), MapRequest::NONE).unwrap();
        let mut b = z.clone();
        thermal_olsen(&mut b, Talus::Uniform(0.05), 10, Some(&bedrock), MapRequest::NONE).unwrap();
        for k in 0..z.len() {
            prop_assert!(a.as_slice()[k] >= bedrock.as_slice()[k]);
            prop_assert!(b.as_slice()[k] >= bedrock.as_slice()[k]);
        }
    }

    #[test]
    fn maps_add_up_to_the_change(z in heightfield()) {
        let mut after = z.clone();
        let maps = thermal(&mut after, Talus::Uniform(0.02), 5, None, MapRequest::BOTH).unwrap();
        let erosion = maps.erosion.unwrap();
        let deposition = maps.deposition.unwrap();
        for k in 0..z.len() {
            let change = after.as_slice()[k] - z.as_slice()[k];
            assert_abs_diff_eq!(deposition.as_slice()[k] - erosion.as_slice()[k], change, epsilon = 1e-6);
        }
    }

    #[test]
    fn unit_mask_matches_unmasked_run(z in heightfield(), seed in 0u64..1000) {
        let cfg = ParticleConfig { nparticles: 50, seed, ..Default::default() };
        let mut plain = z.clone();
        relief::erosion::hydraulic_particle(&mut plain, &cfg, None, None, MapRequest::NONE).unwrap();
        let mut masked = z.clone();
        let ones = z.filled_like(1.0);
        apply_masked(&mut masked, Some(&ones), |g| {
            relief::erosion::hydraulic_particle(g, &cfg, None, None, MapRequest::NONE)
        }).unwrap();
        for k in 0..z.len() {
            assert_abs_diff_eq!(masked.as_slice()[k], plain.as_slice()[k], epsilon = 1e-6);
        }
    }

    #[test]
    fn filling_removes_every_sink(z in heightfield()) {
        let mut filled = z.clone();
        depression_filling(&mut filled, 1e-3).unwrap();
        prop_assert!(find_flow_sinks(&filled).is_empty());
        for k in 0..z.len() {
            prop_assert!(filled.as_slice()[k] >= z.as_slice()[k]);
        }
    }
}
