//! Meshes built from caller-supplied vertex and index arrays.

use glam::Vec3;

use crate::error::MeshError;
use crate::mesh::{Mesh, Vertex, unit_or};
use crate::weld::{WeldConfig, WeldTable};

/// Normal given to vertices with no usable adjacent face.
pub const DEFAULT_NORMAL: Vec3 = Vec3::Y;

/// Crease angle used when none is configured.
pub const DEFAULT_CREASE_DEGREES: f32 = 60.0;

fn read_positions(positions: &[f32]) -> Result<Vec<Vec3>, MeshError> {
    if positions.len() % 3 != 0 {
        return Err(MeshError::MalformedPositions(positions.len()));
    }
    Ok(positions
        .chunks_exact(3)
        .map(|p| Vec3::new(p[0], p[1], p[2]))
        .collect())
}

/// Splits `indices` into triangles, dropping any with an out-of-range index.
fn read_triangles(indices: &[u32], vertex_count: usize) -> Result<Vec<[u32; 3]>, MeshError> {
    if indices.len() % 3 != 0 {
        return Err(MeshError::MalformedIndices {
            len: indices.len(),
            stride: 3,
        });
    }
    let mut skipped = 0usize;
    let tris: Vec<[u32; 3]> = indices
        .chunks_exact(3)
        .filter_map(|t| {
            if t.iter().all(|&i| (i as usize) < vertex_count) {
                Some([t[0], t[1], t[2]])
            } else {
                skipped += 1;
                None
            }
        })
        .collect();
    if skipped > 0 {
        tracing::warn!(skipped, vertex_count, "dropped triangles with out-of-range indices");
    }
    Ok(tris)
}

fn face_cross(points: &[Vec3], [a, b, c]: [u32; 3]) -> Vec3 {
    let pa = points[a as usize];
    let pb = points[b as usize];
    let pc = points[c as usize];
    (pb - pa).cross(pc - pa)
}

/// One normal per input vertex: the normalized sum of the unnormalized face
/// normals around it, so larger faces weigh more. Vertex order is kept.
pub fn build_smooth(positions: &[f32], indices: &[u32]) -> Result<Mesh, MeshError> {
    let points = read_positions(positions)?;
    let tris = read_triangles(indices, points.len())?;

    let mut sums = vec![Vec3::ZERO; points.len()];
    for &t in &tris {
        let n = face_cross(&points, t);
        for i in t {
            sums[i as usize] += n;
        }
    }
    let vertices = points
        .iter()
        .zip(&sums)
        .map(|(&p, &n)| Vertex::new(p, unit_or(n, DEFAULT_NORMAL)))
        .collect();
    Ok(Mesh::triangles(vertices, tris.into_iter().flatten().collect()))
}

struct Cluster {
    rep: Vec3,
    unit_sum: Vec3,
    area_sum: Vec3,
}

/// Splits vertices along creases sharper than `crease_degrees`.
///
/// Around each vertex, incident triangle corners are grouped by face normal:
/// a corner joins the group whose representative normal is closest, as long
/// as the cosine between them is at least `cos(crease_degrees)`; otherwise it
/// starts a new group. Each group becomes one output vertex with the
/// area-weighted normal of its faces. Unreferenced vertices are dropped and
/// identical outputs are welded.
pub fn build_creased(
    positions: &[f32],
    indices: &[u32],
    crease_degrees: f32,
    weld: WeldConfig,
) -> Result<Mesh, MeshError> {
    let points = read_positions(positions)?;
    let tris = read_triangles(indices, points.len())?;
    let _span = tracing::debug_span!("build_creased", vertices = points.len(), triangles = tris.len())
        .entered();

    let crosses: Vec<Vec3> = tris.iter().map(|&t| face_cross(&points, t)).collect();
    let units: Vec<Vec3> = crosses.iter().map(|&c| unit_or(c, DEFAULT_NORMAL)).collect();

    let mut corners: Vec<Vec<(usize, usize)>> = vec![Vec::new(); points.len()];
    for (t, tri) in tris.iter().enumerate() {
        for (corner, &v) in tri.iter().enumerate() {
            corners[v as usize].push((t, corner));
        }
    }

    let cos_threshold = crease_degrees.to_radians().cos();
    // (vertex, area-weighted normal) per output cluster
    let mut outputs: Vec<(usize, Vec3)> = Vec::new();
    let mut corner_output = vec![0usize; tris.len() * 3];

    for (v, incident) in corners.iter().enumerate() {
        let mut clusters: Vec<Cluster> = Vec::new();
        for &(t, corner) in incident {
            let n = units[t];
            let best = clusters
                .iter()
                .enumerate()
                .map(|(i, c)| (i, c.rep.dot(n)))
                .max_by(|a, b| a.1.total_cmp(&b.1));
            let slot = match best {
                Some((i, dot)) if dot >= cos_threshold => {
                    let c = &mut clusters[i];
                    c.unit_sum += n;
                    c.area_sum += crosses[t];
                    c.rep = unit_or(c.unit_sum, n);
                    i
                }
                _ => {
                    clusters.push(Cluster {
                        rep: n,
                        unit_sum: n,
                        area_sum: crosses[t],
                    });
                    clusters.len() - 1
                }
            };
            corner_output[t * 3 + corner] = slot;
        }
        let first = outputs.len();
        outputs.extend(clusters.iter().map(|c| (v, unit_or(c.area_sum, c.rep))));
        for &(t, corner) in incident {
            let slot = corner_output[t * 3 + corner];
            corner_output[t * 3 + corner] = first + slot;
        }
    }

    let mut table = WeldTable::new(weld);
    let welded: Vec<u32> = outputs
        .iter()
        .map(|&(v, n)| table.weld_or_create(points[v], n))
        .collect();
    let indices: Vec<u32> = corner_output.iter().map(|&o| welded[o]).collect();

    let mesh = Mesh::triangles(table.into_vertices(), indices);
    tracing::debug!(
        crease_degrees,
        vertices = mesh.vertex_count(),
        "built creased mesh"
    );
    Ok(mesh)
}
