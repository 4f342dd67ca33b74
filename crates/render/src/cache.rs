use std::collections::HashMap;

use physdraw_mesh::quality::{capsule_division, check_quality, cylinder_slices, sphere_subdivisions};
use physdraw_mesh::{
    Mesh, WeldConfig, build_box, build_capsule, build_cylinder, build_icosphere, build_pyramid,
    build_unit_line, build_unit_triangle,
};

use crate::error::RenderError;

/// Reference to a mesh owned by a [`MeshCache`].
///
/// `Cached` handles stay valid for the cache's lifetime. `Transient` handles
/// name per-frame geometry and are invalidated when the frame ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeshHandle {
    Cached(u32),
    Transient(u32),
}

/// Identity of a cacheable mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshKey {
    Box,
    Sphere(u32),
    Cylinder(u32),
    CapsuleBand(u32),
    CapsuleCapTop(u32),
    CapsuleCapBottom(u32),
    Triangle,
    Line,
    Pyramid,
    Registered(u32),
    /// Line version of the cached mesh with this index.
    Wireframe(u32),
}

/// Arena of built meshes. A mesh is built at most once per key and never
/// changes after insertion.
#[derive(Debug)]
pub struct MeshCache {
    weld: WeldConfig,
    meshes: Vec<Mesh>,
    keys: HashMap<MeshKey, u32>,
    transient: Vec<Mesh>,
    registered: u32,
}

impl MeshCache {
    /// Empty cache; built-in shapes are generated on first use.
    pub fn new(weld: WeldConfig) -> Self {
        Self {
            weld,
            meshes: Vec::new(),
            keys: HashMap::new(),
            transient: Vec::new(),
            registered: 0,
        }
    }

    /// Handle for a built-in mesh, building it on first request.
    pub fn handle(&mut self, key: MeshKey) -> Result<MeshHandle, RenderError> {
        if let Some(&index) = self.keys.get(&key) {
            return Ok(MeshHandle::Cached(index));
        }
        let _span = tracing::debug_span!("build_mesh", ?key).entered();
        match key {
            MeshKey::Box => Ok(self.insert(key, build_box())),
            MeshKey::Sphere(q) => {
                let mesh = build_icosphere(sphere_subdivisions(check_quality(q)?))?;
                Ok(self.insert(key, mesh))
            }
            MeshKey::Cylinder(q) => {
                let mesh = build_cylinder(cylinder_slices(check_quality(q)?))?;
                Ok(self.insert(key, mesh))
            }
            MeshKey::CapsuleBand(q) | MeshKey::CapsuleCapTop(q) | MeshKey::CapsuleCapBottom(q) => {
                let parts = build_capsule(capsule_division(check_quality(q)?), self.weld)?;
                let band = self.insert(MeshKey::CapsuleBand(q), parts.band);
                let top = self.insert(MeshKey::CapsuleCapTop(q), parts.cap_top);
                let bottom = self.insert(MeshKey::CapsuleCapBottom(q), parts.cap_bottom);
                Ok(match key {
                    MeshKey::CapsuleBand(_) => band,
                    MeshKey::CapsuleCapTop(_) => top,
                    _ => bottom,
                })
            }
            MeshKey::Triangle => Ok(self.insert(key, build_unit_triangle())),
            MeshKey::Line => Ok(self.insert(key, build_unit_line())),
            MeshKey::Pyramid => Ok(self.insert(key, build_pyramid())),
            MeshKey::Registered(_) | MeshKey::Wireframe(_) => Err(RenderError::Config(format!(
                "{key:?} is only created through registration"
            ))),
        }
    }

    fn insert(&mut self, key: MeshKey, mesh: Mesh) -> MeshHandle {
        let index = self.meshes.len() as u32;
        tracing::debug!(
            ?key,
            index,
            vertices = mesh.vertex_count(),
            indices = mesh.index_count(),
            "cached mesh"
        );
        self.meshes.push(mesh);
        self.keys.insert(key, index);
        MeshHandle::Cached(index)
    }

    /// Adds an externally built mesh for the rest of the cache's lifetime.
    pub fn register(&mut self, mesh: Mesh) -> Result<MeshHandle, RenderError> {
        mesh.validate()?;
        let key = MeshKey::Registered(self.registered);
        self.registered += 1;
        Ok(self.insert(key, mesh))
    }

    /// Line-list version of `handle`, derived once for cached meshes.
    pub fn wireframe(&mut self, handle: MeshHandle) -> Result<MeshHandle, RenderError> {
        match handle {
            MeshHandle::Cached(index) => {
                let key = MeshKey::Wireframe(index);
                if let Some(&existing) = self.keys.get(&key) {
                    return Ok(MeshHandle::Cached(existing));
                }
                let lines = self
                    .meshes
                    .get(index as usize)
                    .ok_or(RenderError::UnknownMesh(handle))?
                    .wireframe();
                Ok(self.insert(key, lines))
            }
            MeshHandle::Transient(index) => {
                let lines = self
                    .transient
                    .get(index as usize)
                    .ok_or(RenderError::UnknownMesh(handle))?
                    .wireframe();
                Ok(self.push_transient(lines))
            }
        }
    }

    /// Adds geometry that lives until [`MeshCache::clear_transient`].
    pub fn push_transient(&mut self, mesh: Mesh) -> MeshHandle {
        self.transient.push(mesh);
        MeshHandle::Transient((self.transient.len() - 1) as u32)
    }

    /// Drops every per-frame mesh. Transient handles become invalid.
    pub fn clear_transient(&mut self) {
        self.transient.clear();
    }

    /// Mesh behind `handle`, cached or transient.
    pub fn get(&self, handle: MeshHandle) -> Option<&Mesh> {
        match handle {
            MeshHandle::Cached(i) => self.meshes.get(i as usize),
            MeshHandle::Transient(i) => self.transient.get(i as usize),
        }
    }

    /// Handle of an already generated cached mesh, without generating it.
    pub fn lookup(&self, key: MeshKey) -> Option<MeshHandle> {
        self.keys.get(&key).map(|&i| MeshHandle::Cached(i))
    }

    pub fn cached_len(&self) -> usize {
        self.meshes.len()
    }

    pub fn transient_len(&self) -> usize {
        self.transient.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_once_per_key() {
        let mut cache = MeshCache::new(WeldConfig::default());
        let a = cache.handle(MeshKey::Sphere(2)).unwrap();
        let b = cache.handle(MeshKey::Sphere(2)).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.cached_len(), 1);
        let c = cache.handle(MeshKey::Sphere(3)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn quality_changes_detail() {
        let mut cache = MeshCache::new(WeldConfig::default());
        let low = cache.handle(MeshKey::Sphere(1)).unwrap();
        let high = cache.handle(MeshKey::Sphere(3)).unwrap();
        let low = cache.get(low).unwrap().vertex_count();
        let high = cache.get(high).unwrap().vertex_count();
        assert!(low < high);
    }

    #[test]
    fn capsule_parts_are_built_together() {
        let mut cache = MeshCache::new(WeldConfig::default());
        cache.handle(MeshKey::CapsuleCapTop(1)).unwrap();
        assert_eq!(cache.cached_len(), 3);
        assert!(cache.lookup(MeshKey::CapsuleBand(1)).is_some());
        assert!(cache.lookup(MeshKey::CapsuleCapBottom(1)).is_some());
    }

    #[test]
    fn invalid_quality_is_an_error() {
        let mut cache = MeshCache::new(WeldConfig::default());
        assert!(matches!(
            cache.handle(MeshKey::Cylinder(9)),
            Err(RenderError::Mesh(_))
        ));
    }

    #[test]
    fn registered_key_cannot_be_built() {
        let mut cache = MeshCache::new(WeldConfig::default());
        assert!(cache.handle(MeshKey::Registered(0)).is_err());
    }

    #[test]
    fn wireframe_is_cached() {
        let mut cache = MeshCache::new(WeldConfig::default());
        let solid = cache.handle(MeshKey::Box).unwrap();
        let a = cache.wireframe(solid).unwrap();
        let b = cache.wireframe(solid).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            cache.get(a).unwrap().topology,
            physdraw_mesh::Topology::Lines
        );
    }

    #[test]
    fn transient_meshes_clear() {
        let mut cache = MeshCache::new(WeldConfig::default());
        let h = cache.push_transient(build_box());
        assert!(matches!(h, MeshHandle::Transient(0)));
        assert!(cache.get(h).is_some());
        cache.clear_transient();
        assert!(cache.get(h).is_none());
    }

    #[test]
    fn register_validates() {
        let mut cache = MeshCache::new(WeldConfig::default());
        let mut bad = build_box();
        bad.indices.push(1000);
        bad.indices.push(0);
        bad.indices.push(1);
        assert!(cache.register(bad).is_err());
        let ok = cache.register(build_box()).unwrap();
        assert!(cache.get(ok).is_some());
    }
}
