//! Wavefront OBJ loading for the mesh scene.

use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result, bail};
use glam::Vec3;

/// Triangulated geometry from every object in an OBJ file, merged into one
/// index space.
#[derive(Debug, Clone, Default)]
pub struct ObjMesh {
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
}

impl ObjMesh {
    /// Reads and triangulates an OBJ file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let (models, _materials) =
            tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS).with_context(|| format!("loading {}", path.display()))?;
        let mesh = Self::merge(models).with_context(|| format!("loading {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "loaded OBJ mesh"
        );
        Ok(mesh)
    }

    /// Parses OBJ text. Material libraries are ignored.
    pub fn from_reader(reader: &mut impl BufRead) -> Result<Self> {
        let (models, _materials) = tobj::load_obj_buf(reader, &tobj::GPU_LOAD_OPTIONS, |_| {
            Err(tobj::LoadError::OpenFileFailed)
        })
        .context("parsing OBJ")?;
        Self::merge(models)
    }

    fn merge(models: Vec<tobj::Model>) -> Result<Self> {
        let mut out = Self::default();
        for model in models {
            let base = out.vertex_count() as u32;
            out.positions.extend_from_slice(&model.mesh.positions);
            out.indices.extend(model.mesh.indices.iter().map(|&i| base + i));
        }
        if out.indices.is_empty() {
            bail!("OBJ contains no faces");
        }
        Ok(out)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn point(&self, i: u32) -> Vec3 {
        let i = i as usize * 3;
        Vec3::from_slice(&self.positions[i..i + 3])
    }

    /// Axis-aligned bounds as (min, max).
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.positions
            .chunks_exact(3)
            .map(Vec3::from_slice)
            .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), p| (lo.min(p), hi.max(p)))
    }

    /// Three corners per triangle, for immediate-mode drawing.
    pub fn triangle_soup(&self) -> Vec<Vec3> {
        self.indices.iter().map(|&i| self.point(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ObjMesh> {
        ObjMesh::from_reader(&mut text.as_bytes())
    }

    #[test]
    fn quads_are_triangulated() {
        let mesh = parse(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
             f 1 2 3 4\n",
        )
        .unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.triangle_soup().len(), 6);
        assert_eq!(mesh.bounds(), (Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn objects_share_one_index_space() {
        let mesh = parse(
            "o a\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n\
             o b\nv 0 0 2\nv 1 0 2\nv 0 1 2\nf -3 -2 -1\n",
        )
        .unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
        let soup = mesh.triangle_soup();
        assert_eq!(soup[3], Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(soup[5], Vec3::new(0.0, 1.0, 2.0));
    }

    #[test]
    fn file_without_faces_is_rejected() {
        assert!(parse("v 0 0 0\nv 1 0 0\n").is_err());
    }
}
