//! Closed triangulated surface of the central body.
//!
//! The mesh is built once and never modified. Faces index into the vertex
//! list and are wound counter-clockwise when seen from outside the body.
//! Coordinates are body-fixed, relative to the body's reference origin.

pub mod shapes;

use bevy::math::DVec3;

use crate::collision;

/// Invalid mesh topology.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("mesh has no vertices")]
    NoVertices,

    #[error("mesh has no faces")]
    NoFaces,

    #[error("vertex {index} is not finite")]
    NonFiniteVertex { index: usize },

    #[error("face {face} references vertex {index}, but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        face: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("face {face} repeats a vertex index")]
    DegenerateFace { face: usize },
}

/// Immutable triangle mesh.
#[derive(Clone, Debug)]
pub struct Mesh {
    vertices: Vec<DVec3>,
    faces: Vec<[usize; 3]>,
    largest_protuberance: f64,
}

impl Mesh {
    /// Validate and wrap vertex and face data.
    pub fn new(vertices: Vec<DVec3>, faces: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        if vertices.is_empty() {
            return Err(MeshError::NoVertices);
        }
        if faces.is_empty() {
            return Err(MeshError::NoFaces);
        }
        if let Some(index) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(MeshError::NonFiniteVertex { index });
        }

        let vertex_count = vertices.len();
        for (face, &[i, j, k]) in faces.iter().enumerate() {
            if let Some(&index) = [i, j, k].iter().find(|&&index| index >= vertex_count) {
                return Err(MeshError::IndexOutOfRange {
                    face,
                    index,
                    vertex_count,
                });
            }
            if i == j || j == k || i == k {
                return Err(MeshError::DegenerateFace { face });
            }
        }

        let largest_protuberance = vertices
            .iter()
            .map(|v| v.length())
            .fold(0.0_f64, f64::max);

        Ok(Self {
            vertices,
            faces,
            largest_protuberance,
        })
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    /// Largest distance from the reference origin to any vertex.
    ///
    /// Any point of the solid lies within this radius, so a risk zone larger
    /// than it is always crossed before the surface is reached.
    pub fn largest_protuberance(&self) -> f64 {
        self.largest_protuberance
    }

    /// Iterate over the faces as triples of vertex positions.
    pub fn triangles(&self) -> impl Iterator<Item = [DVec3; 3]> + '_ {
        self.faces
            .iter()
            .map(|&[i, j, k]| [self.vertices[i], self.vertices[j], self.vertices[k]])
    }

    /// Enclosed volume, from the divergence theorem.
    ///
    /// Positive for outward-wound faces.
    pub fn volume(&self) -> f64 {
        self.triangles()
            .map(|[a, b, c]| a.dot(b.cross(c)))
            .sum::<f64>()
            / 6.0
    }

    /// Centroid of the enclosed solid (uniform density).
    pub fn centroid(&self) -> DVec3 {
        let mut weighted = DVec3::ZERO;
        let mut total = 0.0;
        for [a, b, c] in self.triangles() {
            // Signed volume of the tetrahedron (origin, a, b, c), centroid at (a + b + c) / 4
            let volume = a.dot(b.cross(c)) / 6.0;
            weighted += (a + b + c) * (volume / 4.0);
            total += volume;
        }
        if total.abs() > 0.0 {
            weighted / total
        } else {
            DVec3::ZERO
        }
    }

    /// Whether `point` (body-fixed) lies inside the solid.
    ///
    /// Points on the surface count as inside.
    pub fn contains(&self, point: DVec3) -> bool {
        collision::point_is_inside(self, point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_empty_mesh() {
        assert_eq!(
            Mesh::new(vec![], vec![[0, 1, 2]]).unwrap_err(),
            MeshError::NoVertices
        );
        assert_eq!(
            Mesh::new(vec![DVec3::X, DVec3::Y, DVec3::Z], vec![]).unwrap_err(),
            MeshError::NoFaces
        );
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let err = Mesh::new(vec![DVec3::X, DVec3::Y, DVec3::Z], vec![[0, 1, 3]]).unwrap_err();
        assert_eq!(
            err,
            MeshError::IndexOutOfRange {
                face: 0,
                index: 3,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn test_rejects_degenerate_face() {
        let err = Mesh::new(vec![DVec3::X, DVec3::Y, DVec3::Z], vec![[0, 1, 1]]).unwrap_err();
        assert_eq!(err, MeshError::DegenerateFace { face: 0 });
    }

    #[test]
    fn test_rejects_non_finite_vertex() {
        let err = Mesh::new(
            vec![DVec3::X, DVec3::new(f64::NAN, 0.0, 0.0), DVec3::Z],
            vec![[0, 1, 2]],
        )
        .unwrap_err();
        assert_eq!(err, MeshError::NonFiniteVertex { index: 1 });
    }

    #[test]
    fn test_cube_derived_quantities() {
        let cube = Mesh::cube(1.0);
        assert_eq!(cube.n_vertices(), 8);
        assert_eq!(cube.n_faces(), 12);
        assert_relative_eq!(cube.largest_protuberance(), 3.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(cube.volume(), 8.0, epsilon = 1e-12);
        assert!(cube.centroid().length() < 1e-12);
    }

    #[test]
    fn test_triangles_follow_faces() {
        let cube = Mesh::cube(2.0);
        let triangles: Vec<_> = cube.triangles().collect();
        assert_eq!(triangles.len(), cube.n_faces());
        let [i, j, k] = cube.faces()[3];
        assert_eq!(
            triangles[3],
            [cube.vertices()[i], cube.vertices()[j], cube.vertices()[k]]
        );
    }
}
