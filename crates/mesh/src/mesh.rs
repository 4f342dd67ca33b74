use std::collections::BTreeSet;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::error::MeshError;

/// Interleaved vertex record, six floats: position then normal.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }
}

/// Primitive assembly for a mesh's index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    Triangles,
    Lines,
}

impl Topology {
    pub fn indices_per_primitive(self) -> usize {
        match self {
            Topology::Triangles => 3,
            Topology::Lines => 2,
        }
    }
}

/// Indexed vertex buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Mesh {
    pub fn triangles(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            topology: Topology::Triangles,
        }
    }

    pub fn lines(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            topology: Topology::Lines,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Triangles or segments, depending on topology.
    pub fn primitive_count(&self) -> usize {
        self.indices.len() / self.topology.indices_per_primitive()
    }

    /// Triangle index triples. Empty for line meshes.
    pub fn triangle_indices(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let chunks = match self.topology {
            Topology::Triangles => self.indices.chunks_exact(3),
            Topology::Lines => self.indices[..0].chunks_exact(3),
        };
        chunks.map(|t| [t[0], t[1], t[2]])
    }

    /// Checks index bounds and that the index count fits the topology.
    pub fn validate(&self) -> Result<(), MeshError> {
        let stride = self.topology.indices_per_primitive();
        if self.indices.len() % stride != 0 {
            return Err(MeshError::MalformedIndices {
                len: self.indices.len(),
                stride,
            });
        }
        let vertex_count = self.vertices.len();
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        Ok(())
    }

    /// Returns a copy with every position shifted by `offset`.
    pub fn translated(mut self, offset: Vec3) -> Self {
        for v in &mut self.vertices {
            v.position = (v.position() + offset).to_array();
        }
        self
    }

    /// Line list of every unique undirected triangle edge. Vertices are shared
    /// with the source mesh. A line mesh is returned unchanged.
    pub fn wireframe(&self) -> Mesh {
        if self.topology == Topology::Lines {
            return self.clone();
        }
        let mut edges = BTreeSet::new();
        for [a, b, c] in self.triangle_indices() {
            for (x, y) in [(a, b), (b, c), (c, a)] {
                edges.insert((x.min(y), x.max(y)));
            }
        }
        let indices = edges.into_iter().flat_map(|(a, b)| [a, b]).collect();
        Mesh::lines(self.vertices.clone(), indices)
    }

    /// Divergence-theorem volume of a triangle mesh. Positive when the
    /// winding is counter-clockwise seen from outside.
    pub fn signed_volume(&self) -> f32 {
        self.triangle_indices()
            .map(|[a, b, c]| {
                let pa = self.vertices[a as usize].position();
                let pb = self.vertices[b as usize].position();
                let pc = self.vertices[c as usize].position();
                pa.dot(pb.cross(pc)) / 6.0
            })
            .sum()
    }
}

/// Normalizes `v`, falling back when it has no usable direction.
pub(crate) fn unit_or(v: Vec3, fallback: Vec3) -> Vec3 {
    v.try_normalize().unwrap_or(fallback)
}
