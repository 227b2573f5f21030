//! Simple closed shapes for demos and tests.
//!
//! Real body shapes come from an external mesher; these builders only cover
//! the convex cases needed to exercise the engine without one.

use std::collections::HashMap;

use bevy::math::DVec3;

use super::Mesh;

/// Corner order: bit 0 selects +x, bit 1 selects +y, bit 2 selects +z.
const CUBE_FACES: [[usize; 3]; 12] = [
    // -z
    [0, 2, 1],
    [1, 2, 3],
    // +z
    [4, 5, 6],
    [5, 7, 6],
    // -y
    [0, 1, 5],
    [0, 5, 4],
    // +y
    [2, 6, 7],
    [2, 7, 3],
    // -x
    [0, 4, 6],
    [0, 6, 2],
    // +x
    [1, 3, 7],
    [1, 7, 5],
];

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

impl Mesh {
    /// Axis-aligned cube centered at the origin.
    ///
    /// # Panics
    /// If `half_extent` is not positive.
    pub fn cube(half_extent: f64) -> Self {
        assert!(
            half_extent > 0.0,
            "Tried to create cube mesh with non-positive extent"
        );

        let vertices = (0..8)
            .map(|corner| {
                let sign = |bit: usize| if corner & bit != 0 { 1.0 } else { -1.0 };
                DVec3::new(sign(1), sign(2), sign(4)) * half_extent
            })
            .collect();

        Self::from_valid_parts(vertices, CUBE_FACES.to_vec())
    }

    /// Sphere approximated by a subdivided icosahedron, centered at the origin.
    ///
    /// Every subdivision splits each triangle into four, so the mesh has
    /// `20 * 4^subdivisions` faces.
    ///
    /// # Panics
    /// If `radius` is not positive.
    pub fn icosphere(radius: f64, subdivisions: u32) -> Self {
        assert!(
            radius > 0.0,
            "Tried to create icosphere mesh with non-positive radius"
        );

        let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
        let mut vertices: Vec<DVec3> = [
            [-1.0, t, 0.0],
            [1.0, t, 0.0],
            [-1.0, -t, 0.0],
            [1.0, -t, 0.0],
            [0.0, -1.0, t],
            [0.0, 1.0, t],
            [0.0, -1.0, -t],
            [0.0, 1.0, -t],
            [t, 0.0, -1.0],
            [t, 0.0, 1.0],
            [-t, 0.0, -1.0],
            [-t, 0.0, 1.0],
        ]
        .into_iter()
        .map(|p| DVec3::from_array(p).normalize())
        .collect();
        let mut faces = ICOSAHEDRON_FACES.to_vec();

        for _ in 0..subdivisions {
            let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
            let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<DVec3>| {
                let key = (a.min(b), a.max(b));
                *midpoints.entry(key).or_insert_with(|| {
                    vertices.push(((vertices[a] + vertices[b]) * 0.5).normalize());
                    vertices.len() - 1
                })
            };

            let mut refined = Vec::with_capacity(faces.len() * 4);
            for [a, b, c] in faces {
                let ab = midpoint(a, b, &mut vertices);
                let bc = midpoint(b, c, &mut vertices);
                let ca = midpoint(c, a, &mut vertices);
                refined.extend_from_slice(&[[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
            }
            faces = refined;
        }

        let vertices: Vec<DVec3> = vertices.into_iter().map(|v| v * radius).collect();
        let faces = orient_outward(&vertices, faces);
        Self::from_valid_parts(vertices, faces)
    }

    /// Construct from parts that are valid by construction.
    fn from_valid_parts(vertices: Vec<DVec3>, faces: Vec<[usize; 3]>) -> Self {
        match Self::new(vertices, faces) {
            Ok(mesh) => mesh,
            Err(err) => unreachable!("generated mesh is invalid: {err}"),
        }
    }
}

/// Flip any face whose normal points toward the origin.
///
/// Only meaningful for shapes that are star-shaped around the origin.
fn orient_outward(vertices: &[DVec3], faces: Vec<[usize; 3]>) -> Vec<[usize; 3]> {
    faces
        .into_iter()
        .map(|[a, b, c]| {
            let (pa, pb, pc) = (vertices[a], vertices[b], vertices[c]);
            let normal = (pb - pa).cross(pc - pa);
            if normal.dot(pa + pb + pc) < 0.0 {
                [a, c, b]
            } else {
                [a, b, c]
            }
        })
        .collect()
}
