//! Common test utilities for integration tests.

#![allow(dead_code)]

use bevy::math::DVec3;
use toss::{BodyParameters, IntegrationConfig, Mesh, State};

/// Comet 67P gravitational parameter (m³/s²).
pub const MU_67P: f64 = 665.666;

/// Create a circular orbit state of radius `r` around `mu`.
pub fn circular_orbit(r: f64, mu: f64) -> State {
    State::new(DVec3::new(r, 0.0, 0.0), DVec3::new(0.0, (mu / r).sqrt(), 0.0))
}

/// Compute specific orbital energy.
pub fn orbital_energy(state: &State, mu: f64) -> f64 {
    0.5 * state.velocity.length_squared() - mu / state.position.length()
}

/// Compute orbital period for an elliptical orbit.
pub fn orbital_period(semi_major_axis: f64, mu: f64) -> f64 {
    use std::f64::consts::TAU;
    TAU * (semi_major_axis.powi(3) / mu).sqrt()
}

/// Body without gravity, so trajectories are straight lines.
pub fn massless_body() -> BodyParameters {
    BodyParameters {
        mu: 0.0,
        ..BodyParameters::comet_67p()
    }
}

/// Cube of half extent 1 and a 20 s fly-by configuration with a risk zone of radius 3.
pub fn flyby_setup() -> (Mesh, IntegrationConfig) {
    let config = IntegrationConfig {
        start_time: 0.0,
        final_time: 20.0,
        time_step: 1.0,
        risk_zone_radius: 3.0,
        ..Default::default()
    };
    (Mesh::cube(1.0), config)
}

/// Straight fly-by along +x at unit speed, offset from the x axis.
pub fn flyby(offset_y: f64, offset_z: f64) -> [f64; 6] {
    [-10.0, offset_y, offset_z, 1.0, 0.0, 0.0]
}
