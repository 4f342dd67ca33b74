//! Flat-shaded fixed shapes. These keep one vertex per face corner so
//! hard edges shade cleanly; they are not welded.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};

use crate::error::MeshError;
use crate::mesh::{Mesh, Vertex};

/// Unit cube spanning +/-0.5 on each axis: 24 vertices, 12 triangles.
/// Faces in order +X, -X, +Y, -Y, +Z, -Z.
pub fn build_box() -> Mesh {
    let p = 0.5_f32;
    #[rustfmt::skip]
    let faces: [(Vec3, [[f32; 3]; 4]); 6] = [
        (Vec3::X,     [[ p, -p,  p], [ p, -p, -p], [ p,  p, -p], [ p,  p,  p]]),
        (Vec3::NEG_X, [[-p, -p, -p], [-p, -p,  p], [-p,  p,  p], [-p,  p, -p]]),
        (Vec3::Y,     [[-p,  p,  p], [ p,  p,  p], [ p,  p, -p], [-p,  p, -p]]),
        (Vec3::NEG_Y, [[-p, -p, -p], [ p, -p, -p], [ p, -p,  p], [-p, -p,  p]]),
        (Vec3::Z,     [[-p, -p,  p], [ p, -p,  p], [ p,  p,  p], [-p,  p,  p]]),
        (Vec3::NEG_Z, [[ p, -p, -p], [-p, -p, -p], [-p,  p, -p], [ p,  p, -p]]),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, corners) in faces {
        let base = vertices.len() as u32;
        vertices.extend(
            corners
                .iter()
                .map(|c| Vertex::new(Vec3::from_array(*c), normal)),
        );
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    Mesh::triangles(vertices, indices)
}

/// Radius-1 cylinder along z from -0.5 to 0.5 with `slices` side segments
/// and flat end caps.
pub fn build_cylinder(slices: u32) -> Result<Mesh, MeshError> {
    if slices < 3 {
        return Err(MeshError::TooFewSlices(slices));
    }
    let n = slices as usize;
    let ring: Vec<Vec2> = (0..n)
        .map(|i| {
            let a = TAU * i as f32 / n as f32;
            Vec2::new(a.cos(), a.sin())
        })
        .collect();

    let mut vertices = Vec::with_capacity(4 * n + 2);
    let mut indices = Vec::with_capacity(12 * n);

    // side: top/bottom pairs with radial normals
    for c in &ring {
        let normal = Vec3::new(c.x, c.y, 0.0);
        vertices.push(Vertex::new(Vec3::new(c.x, c.y, 0.5), normal));
        vertices.push(Vertex::new(Vec3::new(c.x, c.y, -0.5), normal));
    }
    for i in 0..n {
        let top0 = (2 * i) as u32;
        let bot0 = top0 + 1;
        let top1 = (2 * ((i + 1) % n)) as u32;
        let bot1 = top1 + 1;
        indices.extend_from_slice(&[top0, bot0, top1, bot0, bot1, top1]);
    }

    for (z, normal) in [(0.5_f32, Vec3::Z), (-0.5, Vec3::NEG_Z)] {
        let center = vertices.len() as u32;
        vertices.push(Vertex::new(Vec3::new(0.0, 0.0, z), normal));
        for c in &ring {
            vertices.push(Vertex::new(Vec3::new(c.x, c.y, z), normal));
        }
        for i in 0..n {
            let a = center + 1 + i as u32;
            let b = center + 1 + ((i + 1) % n) as u32;
            if z > 0.0 {
                indices.extend_from_slice(&[center, a, b]);
            } else {
                indices.extend_from_slice(&[center, b, a]);
            }
        }
    }
    Ok(Mesh::triangles(vertices, indices))
}

/// Single triangle (0,0,0), (1,0,0), (0,1,0) facing +z. Arbitrary triangles
/// are drawn as affine instances of it.
pub fn build_unit_triangle() -> Mesh {
    let vertices = vec![
        Vertex::new(Vec3::ZERO, Vec3::Z),
        Vertex::new(Vec3::X, Vec3::Z),
        Vertex::new(Vec3::Y, Vec3::Z),
    ];
    Mesh::triangles(vertices, vec![0, 1, 2])
}

/// Segment from the origin to +x. The zero normal marks it unlit.
pub fn build_unit_line() -> Mesh {
    let vertices = vec![
        Vertex::new(Vec3::ZERO, Vec3::ZERO),
        Vertex::new(Vec3::X, Vec3::ZERO),
    ];
    Mesh::lines(vertices, vec![0, 1])
}

/// Four-sided marker pyramid: apex at (0,0,1), base corners at (+/-1,+/-1,0).
/// The base is left open.
pub fn build_pyramid() -> Mesh {
    let apex = Vec3::Z;
    let corners = [
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
    ];
    let mut vertices = Vec::with_capacity(12);
    let mut indices = Vec::with_capacity(12);
    for k in 0..4 {
        let a = corners[k];
        let b = corners[(k + 1) % 4];
        let normal = (a - apex).cross(b - apex).normalize();
        let base = vertices.len() as u32;
        vertices.push(Vertex::new(apex, normal));
        vertices.push(Vertex::new(a, normal));
        vertices.push(Vertex::new(b, normal));
        indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
    Mesh::triangles(vertices, indices)
}
