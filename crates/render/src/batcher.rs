use std::collections::BTreeMap;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use physdraw_common::Color;

use crate::cache::MeshHandle;
use crate::error::RenderError;

/// Per-instance data: column-major model matrix and RGBA color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceRecord {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl InstanceRecord {
    /// Packs a model matrix and color into the GPU instance layout.
    pub fn new(model: Mat4, color: Color) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color: color.to_array(),
        }
    }

    /// Model matrix back in `glam` form.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }
}

/// Instances reserved per cached-mesh list when none is configured.
pub const DEFAULT_INSTANCE_CAPACITY: usize = 32_768;

/// Largest per-list reservation a configuration may ask for. Lists still
/// grow past it on demand; only the up-front reservation is bounded.
pub const MAX_INSTANCE_CAPACITY: usize = 1 << 20;

// Per-frame geometry rarely repeats enough to need the large reservation.
const TRANSIENT_CAPACITY: usize = 16;

/// Collects instances per mesh during a frame.
///
/// Lists are keyed by mesh handle and kept across frames; `clear` empties
/// them without releasing capacity.
#[derive(Debug)]
pub struct InstanceBatcher {
    lists: BTreeMap<MeshHandle, Vec<InstanceRecord>>,
    capacity: usize,
    open: bool,
}

impl InstanceBatcher {
    /// Creates a closed batcher reserving `capacity` instances per cached
    /// mesh list, clamped to [`MAX_INSTANCE_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        Self {
            lists: BTreeMap::new(),
            capacity: capacity.min(MAX_INSTANCE_CAPACITY),
            open: false,
        }
    }

    /// Starts accepting instances. Fails if a frame is already open.
    pub fn open(&mut self) -> Result<(), RenderError> {
        if self.open {
            return Err(RenderError::FrameAlreadyOpen);
        }
        self.open = true;
        Ok(())
    }

    /// Stops accepting instances. Recorded lists stay until `clear`.
    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Appends one instance to `mesh`'s list, creating the list on first
    /// use.
    pub fn record(&mut self, mesh: MeshHandle, model: Mat4, color: Color) -> Result<(), RenderError> {
        if !self.open {
            return Err(RenderError::OutsideFrame);
        }
        let capacity = match mesh {
            MeshHandle::Cached(_) => self.capacity,
            MeshHandle::Transient(_) => TRANSIENT_CAPACITY,
        };
        self.lists
            .entry(mesh)
            .or_insert_with(|| Vec::with_capacity(capacity))
            .push(InstanceRecord::new(model, color));
        Ok(())
    }

    /// Non-empty lists in handle order.
    pub fn batches(&self) -> impl Iterator<Item = (MeshHandle, &[InstanceRecord])> + '_ {
        self.lists
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(handle, list)| (*handle, list.as_slice()))
    }

    /// Instances recorded since the last `clear`, across all lists.
    pub fn instance_count(&self) -> usize {
        self.lists.values().map(Vec::len).sum()
    }

    /// Reserved slots for `mesh`, if it has a list this frame.
    pub fn list_capacity(&self, mesh: MeshHandle) -> Option<usize> {
        self.lists.get(&mesh).map(Vec::capacity)
    }

    /// Empties every list. Transient lists are dropped since their handles
    /// are reused by the next frame.
    pub fn clear(&mut self) {
        self.lists.retain(|handle, _| matches!(handle, MeshHandle::Cached(_)));
        for list in self.lists.values_mut() {
            list.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn record_outside_frame_fails() {
        let mut batcher = InstanceBatcher::new(8);
        let result = batcher.record(MeshHandle::Cached(0), Mat4::IDENTITY, Color::WHITE);
        assert!(matches!(result, Err(RenderError::OutsideFrame)));
    }

    #[test]
    fn double_open_fails() {
        let mut batcher = InstanceBatcher::new(8);
        batcher.open().unwrap();
        assert!(matches!(batcher.open(), Err(RenderError::FrameAlreadyOpen)));
    }

    #[test]
    fn groups_by_handle_and_keeps_transforms() {
        let mut batcher = InstanceBatcher::new(8);
        batcher.open().unwrap();
        let models: Vec<Mat4> = (0..5)
            .map(|i| Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)))
            .collect();
        for m in &models {
            batcher.record(MeshHandle::Cached(1), *m, Color::RED).unwrap();
        }
        batcher
            .record(MeshHandle::Cached(0), Mat4::IDENTITY, Color::BLUE)
            .unwrap();

        let batches: Vec<_> = batcher.batches().collect();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].0, MeshHandle::Cached(0));
        assert_eq!(batches[1].1.len(), 5);
        for (record, m) in batches[1].1.iter().zip(&models) {
            assert_eq!(record.model_matrix(), *m);
            assert_eq!(record.color, Color::RED.to_array());
        }
        assert_eq!(batcher.instance_count(), 6);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut batcher = InstanceBatcher::new(1024);
        batcher.open().unwrap();
        batcher
            .record(MeshHandle::Cached(3), Mat4::IDENTITY, Color::WHITE)
            .unwrap();
        batcher
            .record(MeshHandle::Transient(0), Mat4::IDENTITY, Color::WHITE)
            .unwrap();
        batcher.clear();
        assert_eq!(batcher.instance_count(), 0);
        assert_eq!(batcher.batches().count(), 0);
        assert!(batcher.list_capacity(MeshHandle::Cached(3)).unwrap() >= 1024);
        assert!(batcher.list_capacity(MeshHandle::Transient(0)).is_none());
    }

    #[test]
    fn oversized_reservation_is_clamped() {
        let mut batcher = InstanceBatcher::new(usize::MAX);
        batcher.open().unwrap();
        batcher
            .record(MeshHandle::Cached(0), Mat4::IDENTITY, Color::WHITE)
            .unwrap();
        let capacity = batcher.list_capacity(MeshHandle::Cached(0)).unwrap();
        assert!(capacity >= MAX_INSTANCE_CAPACITY);
        assert!(capacity < 2 * MAX_INSTANCE_CAPACITY);
    }

    #[test]
    fn instance_record_layout() {
        assert_eq!(std::mem::size_of::<InstanceRecord>(), 20 * 4);
    }
}
