use glam::Vec3;

use crate::error::MeshError;
use crate::mesh::{Mesh, Vertex};
use crate::weld::EdgeChainTable;

const ICX: f32 = 0.525_731_1;
const ICZ: f32 = 0.850_650_8;

#[rustfmt::skip]
const BASE_VERTICES: [[f32; 3]; 12] = [
    [-ICX, 0.0, ICZ], [ICX, 0.0, ICZ], [-ICX, 0.0, -ICZ], [ICX, 0.0, -ICZ],
    [0.0, ICZ, ICX], [0.0, ICZ, -ICX], [0.0, -ICZ, ICX], [0.0, -ICZ, -ICX],
    [ICZ, ICX, 0.0], [-ICZ, ICX, 0.0], [ICZ, -ICX, 0.0], [-ICZ, -ICX, 0.0],
];

// Each face is read back to front, so (f[2], f[1], f[0]) winds outward.
#[rustfmt::skip]
const BASE_FACES: [[u32; 3]; 20] = [
    [0, 4, 1], [0, 9, 4], [9, 5, 4], [4, 5, 8], [4, 8, 1],
    [8, 10, 1], [8, 3, 10], [5, 3, 8], [5, 2, 3], [2, 7, 3],
    [7, 10, 3], [7, 6, 10], [7, 11, 6], [11, 0, 6], [0, 1, 6],
    [6, 1, 10], [9, 0, 11], [9, 11, 2], [9, 2, 5], [7, 2, 11],
];

pub const ICOSAHEDRON_FACES: usize = BASE_FACES.len();

/// Builds a welded unit icosphere with `k` subdivisions per base edge.
///
/// The result has `20 * k^2` triangles and `10 * k^2 + 2` vertices, every
/// vertex has its normal equal to its position, and every edge is shared by
/// exactly two triangles.
pub fn build_icosphere(k: u32) -> Result<Mesh, MeshError> {
    build_icosphere_with_face_order(k, 0..ICOSAHEDRON_FACES)
}

/// [`build_icosphere`] visiting base faces in a caller-chosen order. Edge
/// points are keyed by undirected edge, so the geometry does not depend on
/// the order; only vertex numbering does.
pub fn build_icosphere_with_face_order(
    k: u32,
    order: impl IntoIterator<Item = usize>,
) -> Result<Mesh, MeshError> {
    if k < 1 {
        return Err(MeshError::InvalidSubdivision(k));
    }
    let _span = tracing::debug_span!("build_icosphere", k).entered();

    let ku = k as usize;
    let mut vertices: Vec<Vertex> = Vec::with_capacity(10 * ku * ku + 2);
    vertices.extend(BASE_VERTICES.iter().map(|p| {
        let n = Vec3::from_array(*p).normalize();
        Vertex::new(n, n)
    }));
    let mut indices = Vec::with_capacity(60 * ku * ku);
    let mut chains = EdgeChainTable::new();

    for face in order {
        let [c, b, a] = BASE_FACES[face];
        let ab = chains.get_or_create(a, b, k, &mut vertices);
        let ac = chains.get_or_create(a, c, k, &mut vertices);
        let bc = chains.get_or_create(b, c, k, &mut vertices);
        let pa = vertices[a as usize].position();
        let pb = vertices[b as usize].position();
        let pc = vertices[c as usize].position();

        // grid[i][j]: i steps toward B, j steps toward C, i + j <= k.
        let mut grid: Vec<Vec<u32>> = Vec::with_capacity(ku + 1);
        for i in 0..=ku {
            let mut row = Vec::with_capacity(ku + 1 - i);
            for j in 0..=(ku - i) {
                let index = if j == 0 {
                    ab[i]
                } else if i == 0 {
                    ac[j]
                } else if i + j == ku {
                    bc[j]
                } else {
                    let wb = i as f32 / k as f32;
                    let wc = j as f32 / k as f32;
                    let wa = (ku - i - j) as f32 / k as f32;
                    let p = (pa * wa + pb * wb + pc * wc).normalize();
                    vertices.push(Vertex::new(p, p));
                    (vertices.len() - 1) as u32
                };
                row.push(index);
            }
            grid.push(row);
        }

        for i in 0..ku {
            for j in 0..(ku - i) {
                let v0 = grid[i][j];
                let v1 = grid[i + 1][j];
                let v2 = grid[i][j + 1];
                indices.extend_from_slice(&[v0, v1, v2]);
                if j + 1 < ku - i {
                    let v3 = grid[i + 1][j + 1];
                    indices.extend_from_slice(&[v1, v3, v2]);
                }
            }
        }
    }

    tracing::debug!(
        k,
        vertices = vertices.len(),
        triangles = indices.len() / 3,
        "built icosphere"
    );
    Ok(Mesh::triangles(vertices, indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology;

    fn position_bits(mesh: &Mesh, index: u32) -> [u32; 3] {
        mesh.vertices[index as usize].position.map(f32::to_bits)
    }

    /// Triangles as position triples, rotated so the smallest corner leads.
    fn canonical_triangles(mesh: &Mesh) -> Vec<[[u32; 3]; 3]> {
        let mut tris: Vec<[[u32; 3]; 3]> = mesh
            .triangle_indices()
            .map(|[a, b, c]| {
                let t = [position_bits(mesh, a), position_bits(mesh, b), position_bits(mesh, c)];
                let lead = (0..3).min_by_key(|&i| t[i]).unwrap_or(0);
                [t[lead], t[(lead + 1) % 3], t[(lead + 2) % 3]]
            })
            .collect();
        tris.sort();
        tris
    }

    #[test]
    fn rejects_zero_subdivisions() {
        assert_eq!(build_icosphere(0), Err(MeshError::InvalidSubdivision(0)));
    }

    #[test]
    fn base_icosahedron() {
        let mesh = build_icosphere(1).unwrap();
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.primitive_count(), 20);
        assert!(topology::is_closed_manifold(&mesh));
    }

    #[test]
    fn triangle_and_vertex_counts() {
        for k in 1..=5u32 {
            let mesh = build_icosphere(k).unwrap();
            assert_eq!(mesh.primitive_count() as u32, 20 * k * k, "k={k}");
            assert_eq!(mesh.vertex_count() as u32, 10 * k * k + 2, "k={k}");
            mesh.validate().unwrap();
        }
    }

    #[test]
    fn closed_two_manifold() {
        for k in 1..=4 {
            let mesh = build_icosphere(k).unwrap();
            let report = topology::analyze(&mesh);
            assert_eq!(report.boundary_edges, 0, "k={k}");
            assert_eq!(report.non_manifold_edges, 0, "k={k}");
            assert_eq!(report.inconsistent_edges, 0, "k={k}");
            // V - E + F = 2
            let euler = report.vertices as i64 - report.edges as i64 + report.triangles as i64;
            assert_eq!(euler, 2, "k={k}");
        }
    }

    #[test]
    fn vertices_on_unit_sphere_with_radial_normals() {
        let mesh = build_icosphere(4).unwrap();
        for v in &mesh.vertices {
            let p = v.position();
            assert!((p.length() - 1.0).abs() < 1e-5);
            assert!((v.normal() - p).length() < 1e-5);
        }
    }

    #[test]
    fn winding_faces_outward() {
        let mesh = build_icosphere(3).unwrap();
        for [a, b, c] in mesh.triangle_indices() {
            let pa = mesh.vertices[a as usize].position();
            let pb = mesh.vertices[b as usize].position();
            let pc = mesh.vertices[c as usize].position();
            let n = (pb - pa).cross(pc - pa);
            assert!(n.dot(pa + pb + pc) > 0.0);
        }
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn face_order_does_not_change_geometry() {
        let forward = build_icosphere(4).unwrap();
        let reversed = build_icosphere_with_face_order(4, (0..ICOSAHEDRON_FACES).rev()).unwrap();

        let mut a: Vec<[u32; 3]> = forward.vertices.iter().map(|v| v.position.map(f32::to_bits)).collect();
        let mut b: Vec<[u32; 3]> = reversed.vertices.iter().map(|v| v.position.map(f32::to_bits)).collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
        assert_eq!(canonical_triangles(&forward), canonical_triangles(&reversed));
    }

    #[test]
    fn higher_k_is_finer() {
        let coarse = build_icosphere(2).unwrap();
        let fine = build_icosphere(4).unwrap();
        assert!(fine.vertex_count() > coarse.vertex_count());
    }
}
