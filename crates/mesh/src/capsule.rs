//! Capsule built from a cube-projected sphere.
//!
//! The sphere is a six-face cube grid pushed onto the unit sphere. Each cap
//! is the part of it on one side of the equator plane, offset along z by one
//! unit; the band is an open tube whose rims trace the same equator points,
//! so band and caps meet without cracks once scaled by radius and
//! half-length.

use glam::Vec3;

use crate::clip::clip_to_half_space;
use crate::error::MeshError;
use crate::mesh::{Mesh, Vertex};
use crate::weld::{WeldConfig, WeldTable};

/// The three pieces of a unit capsule: band rims at z = +/-1, cap equators
/// at z = +/-1 and poles at z = +/-2.
#[derive(Debug, Clone, PartialEq)]
pub struct CapsuleParts {
    pub band: Mesh,
    pub cap_top: Mesh,
    pub cap_bottom: Mesh,
}

impl CapsuleParts {
    /// Unit capsule (length 2, radius 1) as one welded mesh. Closed exactly
    /// when the band rims and cap rims coincide.
    pub fn assembled(&self, weld: WeldConfig) -> Mesh {
        let mut table = WeldTable::new(weld);
        let mut indices = Vec::new();
        for piece in [&self.band, &self.cap_top, &self.cap_bottom] {
            for &i in &piece.indices {
                let v = piece.vertices[i as usize];
                indices.push(table.weld_or_create(v.position(), v.normal()));
            }
        }
        Mesh::triangles(table.into_vertices(), indices)
    }
}

struct CubeFace {
    normal: Vec3,
    tangent: Vec3,
    bitangent: Vec3,
}

// tangent x bitangent == normal, so grid cells wind outward.
const CUBE_FACES: [CubeFace; 6] = [
    CubeFace {
        normal: Vec3::X,
        tangent: Vec3::Y,
        bitangent: Vec3::Z,
    },
    CubeFace {
        normal: Vec3::Y,
        tangent: Vec3::Z,
        bitangent: Vec3::X,
    },
    CubeFace {
        normal: Vec3::NEG_X,
        tangent: Vec3::Z,
        bitangent: Vec3::Y,
    },
    CubeFace {
        normal: Vec3::NEG_Y,
        tangent: Vec3::X,
        bitangent: Vec3::Z,
    },
    CubeFace {
        normal: Vec3::Z,
        tangent: Vec3::X,
        bitangent: Vec3::Y,
    },
    CubeFace {
        normal: Vec3::NEG_Z,
        tangent: Vec3::Y,
        bitangent: Vec3::X,
    },
];

// Faces crossing the equator, counter-clockwise seen from +z.
const SIDE_FACES: [usize; 4] = [0, 1, 2, 3];

/// Grid coordinate in [-1, 1]. Symmetric: `coord(div - i) == -coord(i)`.
fn grid_coord(i: u32, div: u32) -> f32 {
    (2 * i as i64 - div as i64) as f32 / div as f32
}

fn face_direction(face: &CubeFace, i: u32, j: u32, div: u32) -> Vec3 {
    let u = grid_coord(i, div);
    let v = grid_coord(j, div);
    (face.normal + face.tangent * u + face.bitangent * v).normalize()
}

/// The `4 * div` equator points, counter-clockwise seen from +z, taken from
/// the middle grid line of each side face.
pub fn equator_ring(div: u32) -> Vec<Vec3> {
    let mid = div / 2;
    let mut ring = Vec::with_capacity(4 * div as usize);
    for &f in &SIDE_FACES {
        let face = &CUBE_FACES[f];
        let ccw = Vec3::Z.cross(face.normal);
        let along_tangent = face.tangent.z == 0.0;
        let axis = if along_tangent {
            face.tangent
        } else {
            face.bitangent
        };
        let ascending = axis.dot(ccw) > 0.0;
        for step in 0..div {
            let s = if ascending { step } else { div - step };
            let (i, j) = if along_tangent { (s, mid) } else { (mid, s) };
            ring.push(face_direction(face, i, j, div));
        }
    }
    ring
}

fn snap_to_equator(p: Vec3) -> Vec3 {
    let flat = Vec3::new(p.x, p.y, 0.0);
    flat.try_normalize().unwrap_or(flat)
}

fn build_cap(div: u32, upper: bool, weld: WeldConfig) -> Mesh {
    let plane = if upper { Vec3::Z } else { Vec3::NEG_Z };
    let mut table = WeldTable::new(weld);
    let mut indices = Vec::new();

    for face in &CUBE_FACES {
        for i in 0..div {
            for j in 0..div {
                let p00 = face_direction(face, i, j, div);
                let p10 = face_direction(face, i + 1, j, div);
                let p11 = face_direction(face, i + 1, j + 1, div);
                let p01 = face_direction(face, i, j + 1, div);
                for tri in [[p00, p10, p11], [p00, p11, p01]] {
                    let clipped = clip_to_half_space(&tri, plane, 0.0);
                    if clipped.len() < 3 {
                        continue;
                    }
                    let points: Vec<Vec3> = clipped
                        .iter()
                        .map(|c| {
                            if c.created {
                                snap_to_equator(c.position)
                            } else {
                                c.position
                            }
                        })
                        .collect();
                    for k in 1..points.len() - 1 {
                        for p in [points[0], points[k], points[k + 1]] {
                            indices.push(table.weld_or_create(p, p));
                        }
                    }
                }
            }
        }
    }

    let offset = if upper { Vec3::Z } else { Vec3::NEG_Z };
    Mesh::triangles(table.into_vertices(), indices).translated(offset)
}

fn build_band(ring: &[Vec3]) -> Mesh {
    let n = ring.len();
    let mut vertices = Vec::with_capacity(2 * n);
    for &p in ring {
        vertices.push(Vertex::new(Vec3::new(p.x, p.y, 1.0), p));
        vertices.push(Vertex::new(Vec3::new(p.x, p.y, -1.0), p));
    }
    let mut indices = Vec::with_capacity(6 * n);
    for k in 0..n {
        let top0 = (2 * k) as u32;
        let bot0 = top0 + 1;
        let top1 = (2 * ((k + 1) % n)) as u32;
        let bot1 = top1 + 1;
        indices.extend_from_slice(&[top0, bot0, top1, bot0, bot1, top1]);
    }
    Mesh::triangles(vertices, indices)
}

/// Builds the unit capsule pieces with `div` grid cells per cube-face edge.
///
/// `div` must be even so the equator falls on a grid line; odd values would
/// cut cells and leave cap rims that no longer match the band ring.
pub fn build_capsule(div: u32, weld: WeldConfig) -> Result<CapsuleParts, MeshError> {
    if div == 0 || div % 2 != 0 {
        return Err(MeshError::OddCapsuleDivision(div));
    }
    let _span = tracing::debug_span!("build_capsule", div).entered();

    let ring = equator_ring(div);
    let parts = CapsuleParts {
        band: build_band(&ring),
        cap_top: build_cap(div, true, weld),
        cap_bottom: build_cap(div, false, weld),
    };
    tracing::debug!(
        div,
        ring = ring.len(),
        cap_vertices = parts.cap_top.vertex_count(),
        cap_triangles = parts.cap_top.primitive_count(),
        "built capsule"
    );
    Ok(parts)
}
