//! Gravity models for the central body.
//!
//! The propagation core only needs the acceleration at a body-fixed position,
//! so any field can be plugged in through [`GravityModel`]. Two models are
//! provided: a point mass, and a mascon model that lumps each tetrahedron of
//! the mesh into a point mass at its centroid. An analytic polyhedral
//! evaluator can be wired in the same way.

use bevy::math::DVec3;

use crate::mesh::Mesh;
use crate::types::G;

/// Gravitational field evaluated in the body-fixed frame.
///
/// Implementations must be pure: the integrator calls them for trial steps
/// that may be rejected, and evaluators may share one model across threads.
pub trait GravityModel: Send + Sync {
    /// Acceleration (m/s²) at `position` (body-fixed, meters).
    fn acceleration(&self, position: DVec3) -> DVec3;
}

impl<T: GravityModel + ?Sized> GravityModel for &T {
    #[inline]
    fn acceleration(&self, position: DVec3) -> DVec3 {
        (**self).acceleration(position)
    }
}

/// Point mass at the origin: `a = -μ r / |r|³`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointMassGravity {
    /// Gravitational parameter μ (m³/s²)
    pub mu: f64,
}

impl PointMassGravity {
    pub fn new(mu: f64) -> Self {
        Self { mu }
    }
}

impl GravityModel for PointMassGravity {
    #[inline]
    fn acceleration(&self, position: DVec3) -> DVec3 {
        let r_squared = position.length_squared();
        let r = r_squared.sqrt();
        position * (-self.mu / (r_squared * r))
    }
}

/// Mass concentration ("mascon") model of a homogeneous polyhedron.
///
/// Each face and the origin span a tetrahedron; its mass `ρ·V` is placed at
/// the tetrahedron's centroid. The field is exact for the monopole term and
/// converges to the polyhedral field far from the body. It is singular at the
/// mascon locations, all of which lie inside the body.
#[derive(Clone, Debug)]
pub struct MasconGravity {
    /// (position, GM) per mascon
    mascons: Vec<(DVec3, f64)>,
}

impl MasconGravity {
    /// Build mascons from a mesh with uniform `density` (kg/m³).
    pub fn from_mesh(mesh: &Mesh, density: f64) -> Self {
        let mascons = mesh
            .triangles()
            .map(|[a, b, c]| {
                let volume = a.dot(b.cross(c)) / 6.0;
                ((a + b + c) / 4.0, G * density * volume)
            })
            .collect();
        Self { mascons }
    }

    /// Total gravitational parameter GM of the body.
    pub fn total_gm(&self) -> f64 {
        self.mascons.iter().map(|&(_, gm)| gm).sum()
    }

    pub fn mascons(&self) -> &[(DVec3, f64)] {
        &self.mascons
    }
}

impl GravityModel for MasconGravity {
    fn acceleration(&self, position: DVec3) -> DVec3 {
        let mut acc = DVec3::ZERO;

        for &(mascon_pos, gm) in &self.mascons {
            let delta = mascon_pos - position;
            let r_squared = delta.length_squared();
            let r = r_squared.sqrt();
            // a = GM/r² toward the mascon
            acc += delta * (gm / (r_squared * r));
        }

        acc
    }
}
