//! Collision classification against the body's surface mesh.
//!
//! The risk zone is a sphere that deliberately over-approximates the body, so
//! a risk zone event alone does not mean the satellite hit anything. Points
//! recorded inside the risk zone are checked here against the real mesh.
//!
//! The inside test is the generalized winding number: the signed solid angles
//! subtended by all faces are summed and divided by 4π. For a closed surface
//! this is 1 inside and 0 outside, independent of convexity. Points on or
//! numerically touching the surface count as inside, so borderline near-misses
//! are never rewarded.

use std::f64::consts::PI;

use bevy::math::DVec3;

use crate::mesh::Mesh;

/// Penalty added to the fitness of a trajectory that hits the body.
pub const COLLISION_PENALTY: f64 = 1e30;

/// Distance to the surface, relative to the mesh size, below which a point is
/// treated as touching it.
pub const SURFACE_TOLERANCE: f64 = 1e-9;

/// Classify each point, returning `true` when it lies outside the mesh
/// (no collision). Points must be given in the body-fixed frame.
pub fn point_is_outside_mesh(points: &[DVec3], mesh: &Mesh) -> Vec<bool> {
    points.iter().map(|&point| !mesh.contains(point)).collect()
}

/// Exact inside test used by [`Mesh::contains`].
pub fn point_is_inside(mesh: &Mesh, point: DVec3) -> bool {
    let scale = mesh.largest_protuberance().max(f64::MIN_POSITIVE);

    // Anything beyond the farthest vertex is outside; skips the face loop.
    if point.length() > scale * (1.0 + SURFACE_TOLERANCE) {
        return false;
    }

    let touch_distance = SURFACE_TOLERANCE * scale;
    let mut total_solid_angle = 0.0;
    for [a, b, c] in mesh.triangles() {
        if distance_to_triangle(point, a, b, c) <= touch_distance {
            return true;
        }
        total_solid_angle += solid_angle(point, a, b, c);
    }

    winding_number_is_inside(total_solid_angle / (4.0 * PI))
}

/// Generalized winding number of the mesh around `point`.
pub fn winding_number(mesh: &Mesh, point: DVec3) -> f64 {
    mesh.triangles()
        .map(|[a, b, c]| solid_angle(point, a, b, c))
        .sum::<f64>()
        / (4.0 * PI)
}

#[inline]
fn winding_number_is_inside(winding: f64) -> bool {
    winding.abs() >= 0.5
}

/// Signed solid angle of triangle `abc` seen from `p` (Van Oosterom–Strackee).
fn solid_angle(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> f64 {
    let (ra, rb, rc) = (a - p, b - p, c - p);
    let (la, lb, lc) = (ra.length(), rb.length(), rc.length());

    let numerator = ra.dot(rb.cross(rc));
    let denominator = la * lb * lc + ra.dot(rb) * lc + ra.dot(rc) * lb + rb.dot(rc) * la;

    2.0 * numerator.atan2(denominator)
}

/// Euclidean distance from `p` to the closed triangle `abc`.
///
/// Closest-point search over the Voronoi regions of the triangle
/// (vertices, edges, face interior).
fn distance_to_triangle(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> f64 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return ap.length();
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return bp.length();
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (p - (a + ab * v)).length();
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return cp.length();
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (p - (a + ac * w)).length();
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (p - (b + (c - b) * w)).length();
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    (p - (a + ab * v + ac * w)).length()
}

/// Collision outcome of one trajectory run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionVerdict {
    /// Per candidate point: `true` when the point is outside the body.
    pub outside: Vec<bool>,
}

impl CollisionVerdict {
    /// Verdict for a run that never entered the risk zone.
    pub fn no_events() -> Self {
        Self::default()
    }

    /// Classify body-fixed candidate points.
    ///
    /// With no candidates the classifier is not consulted at all.
    pub fn classify(points: &[DVec3], mesh: &Mesh) -> Self {
        if points.is_empty() {
            return Self::no_events();
        }
        Self::from_outside_flags(point_is_outside_mesh(points, mesh))
    }

    pub fn from_outside_flags(outside: Vec<bool>) -> Self {
        Self { outside }
    }

    /// Whether any candidate point was inside the body.
    pub fn collision(&self) -> bool {
        self.outside.iter().any(|&outside| !outside)
    }

    /// Number of candidate points that were classified.
    pub fn candidates(&self) -> usize {
        self.outside.len()
    }

    /// [`COLLISION_PENALTY`] on collision, otherwise exactly zero.
    pub fn penalty(&self) -> f64 {
        if self.collision() {
            COLLISION_PENALTY
        } else {
            0.0
        }
    }
}
