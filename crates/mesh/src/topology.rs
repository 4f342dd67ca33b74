//! Edge-level inspection of triangle meshes: manifoldness, boundaries and
//! orientation consistency.

use std::collections::BTreeMap;

use crate::mesh::Mesh;

/// Summary of a triangle mesh's edge structure.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyReport {
    pub vertices: usize,
    pub triangles: usize,
    /// Unique undirected edges.
    pub edges: usize,
    /// Edges used by exactly one triangle.
    pub boundary_edges: usize,
    /// Edges used by more than two triangles.
    pub non_manifold_edges: usize,
    /// Directed edges that appear more than once (neighbors wound opposite).
    pub inconsistent_edges: usize,
    pub signed_volume: f32,
}

impl TopologyReport {
    /// Watertight with every edge shared by exactly two consistently wound
    /// triangles.
    pub fn is_closed_manifold(&self) -> bool {
        self.boundary_edges == 0 && self.non_manifold_edges == 0 && self.inconsistent_edges == 0
    }
}

/// Triangles using each undirected edge `(min, max)`.
pub fn edge_use_counts(mesh: &Mesh) -> BTreeMap<(u32, u32), usize> {
    let mut counts = BTreeMap::new();
    for [a, b, c] in mesh.triangle_indices() {
        for (x, y) in [(a, b), (b, c), (c, a)] {
            *counts.entry((x.min(y), x.max(y))).or_insert(0) += 1;
        }
    }
    counts
}

/// Undirected edges used by a single triangle.
pub fn boundary_edges(mesh: &Mesh) -> Vec<(u32, u32)> {
    edge_use_counts(mesh)
        .into_iter()
        .filter(|&(_, n)| n == 1)
        .map(|(e, _)| e)
        .collect()
}

/// Edge and orientation statistics for a triangle mesh.
pub fn analyze(mesh: &Mesh) -> TopologyReport {
    let counts = edge_use_counts(mesh);
    let mut directed: BTreeMap<(u32, u32), usize> = BTreeMap::new();
    for [a, b, c] in mesh.triangle_indices() {
        for edge in [(a, b), (b, c), (c, a)] {
            *directed.entry(edge).or_insert(0) += 1;
        }
    }
    TopologyReport {
        vertices: mesh.vertex_count(),
        triangles: mesh.triangle_indices().count(),
        edges: counts.len(),
        boundary_edges: counts.values().filter(|&&n| n == 1).count(),
        non_manifold_edges: counts.values().filter(|&&n| n > 2).count(),
        inconsistent_edges: directed.values().filter(|&&n| n > 1).count(),
        signed_volume: mesh.signed_volume(),
    }
}

pub fn is_closed_manifold(mesh: &Mesh) -> bool {
    analyze(mesh).is_closed_manifold()
}
