use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::mesh::Vertex;

/// Quantization scales for welding. A component `v` hashes as
/// `round(v * scale)`, so the scale is the inverse of the weld tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeldConfig {
    pub position_scale: f32,
    pub normal_scale: f32,
}

impl Default for WeldConfig {
    fn default() -> Self {
        Self {
            position_scale: 1e5,
            normal_scale: 1e4,
        }
    }
}

impl WeldConfig {
    /// Both scales finite and positive.
    pub fn is_valid(&self) -> bool {
        self.position_scale.is_finite()
            && self.position_scale > 0.0
            && self.normal_scale.is_finite()
            && self.normal_scale > 0.0
    }
}

fn quantize(v: f32, scale: f32) -> i64 {
    (v * scale).round() as i64
}

/// Deduplicates vertices by quantized position and normal.
///
/// Two records weld exactly when all six quantized components agree, so
/// vertices at the same location with different normals stay separate.
#[derive(Debug, Clone)]
pub struct WeldTable {
    config: WeldConfig,
    lookup: HashMap<[i64; 6], u32>,
    vertices: Vec<Vertex>,
}

impl WeldTable {
    /// Empty table quantizing with `config`.
    pub fn new(config: WeldConfig) -> Self {
        Self {
            config,
            lookup: HashMap::new(),
            vertices: Vec::new(),
        }
    }

    /// Returns the index of an existing vertex whose quantized key matches,
    /// or appends a new vertex and returns its index.
    pub fn weld_or_create(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let ps = self.config.position_scale;
        let ns = self.config.normal_scale;
        let key = [
            quantize(position.x, ps),
            quantize(position.y, ps),
            quantize(position.z, ps),
            quantize(normal.x, ns),
            quantize(normal.y, ns),
            quantize(normal.z, ns),
        ];
        let vertices = &mut self.vertices;
        *self.lookup.entry(key).or_insert_with(|| {
            vertices.push(Vertex::new(position, normal));
            (vertices.len() - 1) as u32
        })
    }

    /// Distinct vertices welded so far.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertices in first-seen order, matching the returned indices.
    pub fn into_vertices(self) -> Vec<Vertex> {
        self.vertices
    }
}

/// Shared subdivision points along the edges of a unit-sphere base mesh.
///
/// A chain for the undirected edge `(lo, hi)` is computed once, always from
/// `lo` toward `hi`, so both faces sharing the edge see bit-identical points.
#[derive(Debug, Clone, Default)]
pub struct EdgeChainTable {
    chains: HashMap<(u32, u32), Vec<u32>>,
}

impl EdgeChainTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the `k + 1` vertex indices from `a` to `b`, endpoints
    /// included, creating the interior points on first request. Interior
    /// points are `normalize(lerp(lo, hi, i / k))` with the normal equal to
    /// the position.
    pub fn get_or_create(
        &mut self,
        a: u32,
        b: u32,
        k: u32,
        vertices: &mut Vec<Vertex>,
    ) -> Vec<u32> {
        let (lo, hi) = (a.min(b), a.max(b));
        let chain = self.chains.entry((lo, hi)).or_insert_with(|| {
            let p_lo = vertices[lo as usize].position();
            let p_hi = vertices[hi as usize].position();
            let mut chain = Vec::with_capacity(k as usize + 1);
            chain.push(lo);
            for i in 1..k {
                let t = i as f32 / k as f32;
                let p = p_lo.lerp(p_hi, t).normalize();
                vertices.push(Vertex::new(p, p));
                chain.push((vertices.len() - 1) as u32);
            }
            chain.push(hi);
            chain
        });
        if a == lo {
            chain.clone()
        } else {
            chain.iter().rev().copied().collect()
        }
    }

    /// Number of edges subdivided so far.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weld_merges_within_tolerance() {
        let mut table = WeldTable::new(WeldConfig::default());
        let a = table.weld_or_create(Vec3::new(0.5, 0.25, 1.0), Vec3::Z);
        let b = table.weld_or_create(Vec3::new(0.500_000_1, 0.25, 1.0), Vec3::Z);
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn weld_keeps_distinct_normals_apart() {
        let mut table = WeldTable::new(WeldConfig::default());
        let a = table.weld_or_create(Vec3::ONE, Vec3::X);
        let b = table.weld_or_create(Vec3::ONE, Vec3::Y);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn coarse_scale_merges_more() {
        let coarse = WeldConfig {
            position_scale: 10.0,
            normal_scale: 10.0,
        };
        let mut table = WeldTable::new(coarse);
        let a = table.weld_or_create(Vec3::new(0.01, 0.0, 0.0), Vec3::Z);
        let b = table.weld_or_create(Vec3::new(0.02, 0.0, 0.0), Vec3::Z);
        assert_eq!(a, b);
    }

    #[test]
    fn weld_config_validity() {
        assert!(WeldConfig::default().is_valid());
        let bad = WeldConfig {
            position_scale: 0.0,
            ..WeldConfig::default()
        };
        assert!(!bad.is_valid());
    }

    #[test]
    fn edge_chain_is_shared_and_reversed() {
        let mut vertices = vec![Vertex::new(Vec3::X, Vec3::X), Vertex::new(Vec3::Y, Vec3::Y)];
        let mut table = EdgeChainTable::new();
        let forward = table.get_or_create(0, 1, 4, &mut vertices);
        let backward = table.get_or_create(1, 0, 4, &mut vertices);
        assert_eq!(forward.len(), 5);
        assert_eq!(forward[0], 0);
        assert_eq!(forward[4], 1);
        let reversed: Vec<u32> = backward.iter().rev().copied().collect();
        assert_eq!(forward, reversed);
        // 3 interior points created once
        assert_eq!(vertices.len(), 5);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn edge_chain_points_are_unit() {
        let mut vertices = vec![Vertex::new(Vec3::X, Vec3::X), Vertex::new(Vec3::Z, Vec3::Z)];
        let mut table = EdgeChainTable::new();
        let chain = table.get_or_create(1, 0, 3, &mut vertices);
        for i in chain {
            let p = vertices[i as usize].position();
            assert!((p.length() - 1.0).abs() < 1e-6);
        }
    }
}
