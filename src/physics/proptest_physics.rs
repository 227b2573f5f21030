//! Property-based tests for the physics layer using proptest.
//!
//! These tests verify frame, event and integrator invariants across a wide
//! range of times, positions and orbits.

use bevy::math::DVec3;
use proptest::prelude::*;

use crate::config::BodyParameters;
use crate::physics::{
    AdaptiveIntegrator, EquationsOfMotion, EventFunction, IntegrationScheme, IntegratorConfig,
    NoEvents, PointMassGravity, RiskZoneDetector,
};
use crate::rotation::RotationModel;
use crate::test_utils::{assertions, fixtures};
use crate::types::{State, StateDerivative};

fn vector(range: std::ops::Range<f64>) -> impl Strategy<Value = DVec3> {
    (range.clone(), range.clone(), range).prop_map(|(x, y, z)| DVec3::new(x, y, z))
}

fn body() -> impl Strategy<Value = BodyParameters> {
    (-90.0f64..90.0, 0.0f64..360.0, 3600.0f64..200_000.0).prop_map(|(dec, ra, period)| {
        BodyParameters {
            declination_deg: dec,
            right_ascension_deg: ra,
            spin_period: period,
            ..fixtures::comet_body()
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Body → inertial undoes inertial → body.
    #[test]
    fn prop_rotation_inverse_law(
        body in body(),
        t in -1.0e6f64..1.0e6,
        x in vector(-1.0e4..1.0e4),
    ) {
        let rotation = RotationModel::new(&body);
        let back = rotation.to_inertial_frame(t, rotation.to_body_frame(t, x));
        prop_assert!(
            (back - x).length() <= 1e-9,
            "round trip moved {:?} to {:?}", x, back
        );
    }

    /// Rotations keep distances, and the spin axis is a fixed point.
    #[test]
    fn prop_rotation_is_rigid(
        body in body(),
        t in -1.0e6f64..1.0e6,
        x in vector(-1.0e4..1.0e4),
    ) {
        let rotation = RotationModel::new(&body);
        let rotated = rotation.rotate_point(t, x);
        prop_assert!((rotated.length() - x.length()).abs() <= 1e-9 * x.length().max(1.0));

        let axis = rotation.spin_axis() * 1000.0;
        prop_assert!((rotation.rotate_point(t, axis) - axis).length() < 1e-9);
    }

    /// The quaternion rotation and the Euler–Rodrigues matrix agree.
    #[test]
    fn prop_rotation_matches_matrix(
        body in body(),
        t in -1.0e5f64..1.0e5,
        x in vector(-1.0e4..1.0e4),
    ) {
        let rotation = RotationModel::new(&body);
        let by_quat = rotation.rotate_point(t, x);
        let by_matrix = rotation.rotation_matrix(t) * x;
        prop_assert!((by_quat - by_matrix).length() <= 1e-9 * x.length().max(1.0));
    }

    /// The indicator fires exactly when the position is strictly inside.
    #[test]
    fn prop_risk_zone_indicator(
        radius in 1.0f64..1.0e4,
        position in vector(-2.0e4..2.0e4),
    ) {
        let detector = RiskZoneDetector::new(radius);
        let state = State::new(position, DVec3::ZERO);
        let expected = if position.length() < radius { 1.0 } else { 0.0 };
        prop_assert_eq!(detector.indicator(0.0, &state), expected);
        prop_assert_eq!(detector.is_inside(&state), expected == 1.0);
    }

    /// Evaluating the equations of motion has no side effects.
    #[test]
    fn prop_equations_of_motion_are_pure(
        t in 0.0f64..1.0e5,
        position in vector(2000.0..8000.0),
        velocity in vector(-1.0..1.0),
    ) {
        let rotation = RotationModel::new(&fixtures::comet_body());
        let gravity = PointMassGravity::new(665.666);
        let eom = EquationsOfMotion::new(&rotation, &gravity);
        let state = State::new(position, velocity);

        let first = eom.compute_motion(t, &state);
        let _ = eom.compute_motion(t + 1.0, &state);
        let second = eom.compute_motion(t, &state);
        prop_assert_eq!(first, second);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Specific energy of a bound two-body orbit is conserved by the
    /// default scheme over one period.
    #[test]
    fn prop_energy_conservation_one_orbit(
        periapsis in 0.5f64..2.0,
        eccentricity in 0.0f64..0.6,
    ) {
        // μ = 1; start at periapsis
        let a = periapsis / (1.0 - eccentricity);
        let speed = (2.0 / periapsis - 1.0 / a).sqrt();
        let start = State::new(DVec3::new(periapsis, 0.0, 0.0), DVec3::new(0.0, speed, 0.0));
        let period = std::f64::consts::TAU * a.powf(1.5);

        let two_body = |_t: f64, s: &State| {
            let r = s.position.length();
            StateDerivative::new(s.velocity, -s.position / (r * r * r))
        };
        let integrator = AdaptiveIntegrator::new(
            IntegrationScheme::DormandPrince45,
            IntegratorConfig {
                initial_dt: period / 1000.0,
                atol: 1e-11,
                rtol: 1e-11,
                ..Default::default()
            },
        );
        let output = integrator.integrate(two_body, 0.0, start, period, &NoEvents).unwrap();

        let initial = assertions::specific_energy(&start, 1.0);
        let last = output.samples.last().unwrap();
        let drift = ((assertions::specific_energy(&last.state, 1.0) - initial) / initial).abs();
        prop_assert!(drift < 1e-7, "energy drift {:.3e} (e = {})", drift, eccentricity);
    }
}
