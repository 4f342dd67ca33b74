use glam::Vec3;

use crate::error::MeshError;
use crate::indexed::DEFAULT_NORMAL;
use crate::mesh::{Mesh, Vertex, unit_or};

/// Flat-shaded mesh of a convex polyhedron given as the physics engine
/// stores it:
///
/// - `planes`: `(nx, ny, nz, d)` per face,
/// - `points`: `(x, y, z)` per point,
/// - `polygons`: for each face in plane order, a count followed by that many
///   point indices.
///
/// Each polygon is fan-triangulated with its plane normal. Polygons with an
/// out-of-range index or fewer than three points are skipped; a polygon list
/// that ends early stops the build at that face.
pub fn build_convex(planes: &[f32], points: &[f32], polygons: &[u32]) -> Result<Mesh, MeshError> {
    if planes.len() % 4 != 0 {
        return Err(MeshError::MalformedPlanes(planes.len()));
    }
    if points.len() % 3 != 0 {
        return Err(MeshError::MalformedPositions(points.len()));
    }
    let point_count = points.len() / 3;
    let point = |i: u32| {
        let b = i as usize * 3;
        Vec3::new(points[b], points[b + 1], points[b + 2])
    };

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let mut cursor = 0usize;
    for (face, plane) in planes.chunks_exact(4).enumerate() {
        let Some(&count) = polygons.get(cursor) else {
            tracing::warn!(face, "convex polygon list ends early");
            break;
        };
        let start = cursor + 1;
        let end = start + count as usize;
        let Some(ids) = polygons.get(start..end) else {
            tracing::warn!(face, count, "convex polygon list truncated");
            break;
        };
        cursor = end;

        if ids.len() < 3 || ids.iter().any(|&i| i as usize >= point_count) {
            tracing::warn!(face, count, point_count, "skipping malformed convex polygon");
            continue;
        }
        let normal = unit_or(Vec3::new(plane[0], plane[1], plane[2]), DEFAULT_NORMAL);
        let base = vertices.len() as u32;
        vertices.extend(ids.iter().map(|&i| Vertex::new(point(i), normal)));
        for k in 1..ids.len() as u32 - 1 {
            indices.extend_from_slice(&[base, base + k, base + k + 1]);
        }
    }
    Ok(Mesh::triangles(vertices, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit cube in the plane/point/polygon layout.
    fn cube() -> (Vec<f32>, Vec<f32>, Vec<u32>) {
        #[rustfmt::skip]
        let planes = vec![
            1.0, 0.0, 0.0, 0.5,
            -1.0, 0.0, 0.0, 0.5,
            0.0, 1.0, 0.0, 0.5,
            0.0, -1.0, 0.0, 0.5,
            0.0, 0.0, 1.0, 0.5,
            0.0, 0.0, -1.0, 0.5,
        ];
        #[rustfmt::skip]
        let points = vec![
            0.5, 0.5, 0.5,   -0.5, 0.5, 0.5,   0.5, -0.5, 0.5,   -0.5, -0.5, 0.5,
            0.5, 0.5, -0.5,  -0.5, 0.5, -0.5,  0.5, -0.5, -0.5,  -0.5, -0.5, -0.5,
        ];
        #[rustfmt::skip]
        let polygons = vec![
            4, 0, 2, 6, 4,
            4, 1, 5, 7, 3,
            4, 0, 4, 5, 1,
            4, 2, 3, 7, 6,
            4, 0, 1, 3, 2,
            4, 4, 6, 7, 5,
        ];
        (planes, points, polygons)
    }

    #[test]
    fn cube_has_twelve_flat_triangles() {
        let (planes, points, polygons) = cube();
        let mesh = build_convex(&planes, &points, &polygons).unwrap();
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.primitive_count(), 12);
        assert!(mesh.signed_volume() > 0.0);
        for [a, b, c] in mesh.triangle_indices() {
            let va = mesh.vertices[a as usize];
            let n = (mesh.vertices[b as usize].position() - va.position())
                .cross(mesh.vertices[c as usize].position() - va.position());
            assert!(n.normalize().dot(va.normal()) > 0.99);
        }
    }

    #[test]
    fn bad_polygon_is_skipped() {
        let (planes, points, mut polygons) = cube();
        polygons[1] = 42;
        let mesh = build_convex(&planes, &points, &polygons).unwrap();
        assert_eq!(mesh.primitive_count(), 10);
    }

    #[test]
    fn truncated_polygons_stop_early() {
        let (planes, points, polygons) = cube();
        let mesh = build_convex(&planes, &points, &polygons[..12]).unwrap();
        // two complete faces, the third is cut off
        assert_eq!(mesh.primitive_count(), 4);
    }

    #[test]
    fn malformed_planes() {
        assert_eq!(
            build_convex(&[1.0, 0.0, 0.0], &[], &[]),
            Err(MeshError::MalformedPlanes(3))
        );
    }
}
