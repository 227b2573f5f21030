//! Test utilities for trajectory propagation tests.
//!
//! Provides fixtures for bodies, meshes and orbits, and assertions for
//! physical invariants like energy conservation.

use bevy::math::DVec3;

use crate::config::{BodyParameters, IntegrationConfig};
use crate::mesh::Mesh;
use crate::types::State;

/// Fixtures for creating test bodies and orbital states.
pub mod fixtures {
    use super::*;

    /// Comet 67P-like body parameters.
    pub fn comet_body() -> BodyParameters {
        BodyParameters::comet_67p()
    }

    /// Body with zero mass and a slow spin, for straight-line trajectories.
    pub fn massless_body() -> BodyParameters {
        BodyParameters {
            mu: 0.0,
            ..BodyParameters::comet_67p()
        }
    }

    /// Cube with half extent 1.
    pub fn unit_cube() -> Mesh {
        Mesh::cube(1.0)
    }

    /// Create a satellite in a circular orbit of radius `r` around `mu`.
    ///
    /// Placed on the positive x-axis with velocity in the +y direction.
    pub fn circular_orbit(r: f64, mu: f64) -> State {
        State::new(DVec3::new(r, 0.0, 0.0), DVec3::new(0.0, (mu / r).sqrt(), 0.0))
    }

    /// Integration settings for straight-line fly-bys of [`unit_cube`].
    ///
    /// One-second steps over twenty seconds, risk zone of radius 3.
    pub fn flyby_config() -> IntegrationConfig {
        IntegrationConfig {
            start_time: 0.0,
            final_time: 20.0,
            time_step: 1.0,
            risk_zone_radius: 3.0,
            ..Default::default()
        }
    }
}

/// Assertions for verifying physical invariants.
pub mod assertions {
    use super::*;

    /// Specific orbital energy `v²/2 - μ/r`.
    pub fn specific_energy(state: &State, mu: f64) -> f64 {
        0.5 * state.velocity.length_squared() - mu / state.position.length()
    }

    /// Specific angular momentum `r × v`.
    pub fn angular_momentum(state: &State) -> DVec3 {
        state.position.cross(state.velocity)
    }

    /// Assert that energy is conserved within tolerance.
    ///
    /// # Panics
    /// Panics if relative energy drift exceeds tolerance.
    pub fn assert_energy_conserved(initial_energy: f64, final_energy: f64, tolerance: f64) {
        let drift = if initial_energy.abs() > 1e-10 {
            ((final_energy - initial_energy) / initial_energy).abs()
        } else {
            (final_energy - initial_energy).abs()
        };
        assert!(
            drift <= tolerance,
            "Energy not conserved: initial={initial_energy:.6e}, final={final_energy:.6e}, drift={drift:.6e}, tolerance={tolerance:.6e}"
        );
    }

    /// Assert `|actual - expected| <= rel_tol * max(|expected|, tiny)`.
    ///
    /// # Panics
    /// Panics if the vectors differ by more than the tolerance.
    pub fn assert_vec_relative_eq(actual: DVec3, expected: DVec3, rel_tol: f64) {
        let scale = expected.length().max(f64::MIN_POSITIVE);
        let error = (actual - expected).length();
        assert!(
            error <= rel_tol * scale,
            "Vectors differ: actual={actual:?}, expected={expected:?}, relative error={:.6e}, tolerance={rel_tol:.6e}",
            error / scale
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_circular_orbit_has_correct_velocity() {
        let state = fixtures::circular_orbit(5000.0, 665.666);
        assert_relative_eq!(
            state.velocity.length(),
            (665.666_f64 / 5000.0).sqrt(),
            max_relative = 1e-15
        );
        assert_eq!(state.position.dot(state.velocity), 0.0);
    }

    #[test]
    fn test_circular_orbit_is_bound() {
        let state = fixtures::circular_orbit(5000.0, 665.666);
        let energy = assertions::specific_energy(&state, 665.666);
        // Circular orbit: E = -μ / 2r
        assert_relative_eq!(energy, -665.666 / 10000.0, max_relative = 1e-12);
    }

    #[test]
    fn test_angular_momentum_perpendicular() {
        let state = fixtures::circular_orbit(2.0, 1.0);
        let h = assertions::angular_momentum(&state);
        assert_relative_eq!(h.z, 2.0 * 0.5_f64.sqrt(), max_relative = 1e-15);
        assert_eq!(h.x, 0.0);
        assert_eq!(h.y, 0.0);
    }

    #[test]
    fn test_flyby_config_is_valid_for_unit_cube() {
        let cube = fixtures::unit_cube();
        assert!(
            fixtures::flyby_config()
                .validate(cube.largest_protuberance())
                .is_ok()
        );
    }
}
