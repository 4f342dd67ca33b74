use glam::{Mat4, Vec3};
use physdraw_common::Color;
use physdraw_mesh::{Mesh, Topology};

use crate::batcher::InstanceRecord;
use crate::cache::MeshHandle;

/// Which pipeline a draw call goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Lit, depth-tested, alpha-blended.
    Lit,
    /// Same geometry flattened by the shadow matrix, ground-colored.
    Shadow,
}

/// Per-frame constants handed to a backend before any draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub view: Mat4,
    pub projection: Mat4,
    /// Unit vector toward the light.
    pub light_direction: Vec3,
    pub shadow_matrix: Mat4,
    pub shadow_intensity: f32,
    pub ground_color: Color,
    pub sky_color: Color,
    /// World-space camera position; the sky plane follows it.
    pub eye: Vec3,
    /// Sky texture scroll in [0, 1), advanced once per frame.
    pub sky_offset: f32,
    pub use_textures: bool,
    pub use_shadows: bool,
}

/// One instanced draw: every instance of `mesh` in a single call.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub handle: MeshHandle,
    pub mesh: &'a Mesh,
    pub instances: &'a [InstanceRecord],
    pub pass: Pass,
}

/// Backend-agnostic submission interface. The draw context calls
/// `begin_frame`, then `draw` once per non-empty instance list (lit pass
/// first, then the shadow pass), then `end_frame`.
///
/// Cached handles always name the same mesh, so a backend may keep uploaded
/// buffers keyed by handle. Transient handles are only valid until
/// `end_frame`.
pub trait RenderBackend {
    fn begin_frame(&mut self, params: &FrameParams);
    fn draw(&mut self, call: DrawCall<'_>);
    fn end_frame(&mut self);
}

/// What a [`RecordingBackend`] saw for one draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub handle: MeshHandle,
    pub pass: Pass,
    pub topology: Topology,
    pub index_count: usize,
    pub instances: Vec<InstanceRecord>,
}

/// Headless backend that records submissions instead of drawing.
///
/// Used by tests and the CLI to observe exactly what a GPU backend would be
/// asked to do.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    frames: u64,
    params: Option<FrameParams>,
    submissions: Vec<Submission>,
    in_frame: bool,
}

impl RecordingBackend {
    /// Backend with no recorded frames.
    pub fn new() -> Self {
        Self::default()
    }

    /// Submissions of the most recent frame.
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// Frames completed with `end_frame`.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Constants of the most recent `begin_frame`.
    pub fn last_params(&self) -> Option<&FrameParams> {
        self.params.as_ref()
    }

    /// Submissions of the most recent frame in `pass`.
    pub fn count(&self, pass: Pass) -> usize {
        self.submissions.iter().filter(|s| s.pass == pass).count()
    }

    /// Human-readable listing of the last frame.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "=== Frame {} ({} draw calls) ===\n",
            self.frames,
            self.submissions.len()
        ));
        if let Some(p) = &self.params {
            out.push_str(&format!(
                "Light: ({:.2}, {:.2}, {:.2}) shadows={} textures={}\n",
                p.light_direction.x,
                p.light_direction.y,
                p.light_direction.z,
                p.use_shadows,
                p.use_textures
            ));
        }
        for s in &self.submissions {
            out.push_str(&format!(
                "  {:?} {:?} {:?}: {} indices x {} instances\n",
                s.pass,
                s.handle,
                s.topology,
                s.index_count,
                s.instances.len()
            ));
        }
        out
    }
}

impl RenderBackend for RecordingBackend {
    fn begin_frame(&mut self, params: &FrameParams) {
        self.params = Some(*params);
        self.submissions.clear();
        self.in_frame = true;
    }

    fn draw(&mut self, call: DrawCall<'_>) {
        debug_assert!(self.in_frame, "draw outside begin_frame/end_frame");
        self.submissions.push(Submission {
            handle: call.handle,
            pass: call.pass,
            topology: call.mesh.topology,
            index_count: call.mesh.index_count(),
            instances: call.instances.to_vec(),
        });
    }

    fn end_frame(&mut self) {
        self.in_frame = false;
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physdraw_mesh::build_box;

    fn params() -> FrameParams {
        FrameParams {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            light_direction: Vec3::Z,
            shadow_matrix: Mat4::IDENTITY,
            shadow_intensity: 0.65,
            ground_color: Color::rgb(0.5, 0.5, 0.3),
            sky_color: Color::BLUE,
            eye: Vec3::new(0.0, 0.0, 2.0),
            sky_offset: 0.25,
            use_textures: false,
            use_shadows: true,
        }
    }

    #[test]
    fn recording_backend_empty_frame() {
        let mut backend = RecordingBackend::new();
        assert!(backend.last_params().is_none());
        backend.begin_frame(&params());
        backend.end_frame();
        assert_eq!(backend.frames(), 1);
        assert!(backend.submissions().is_empty());
        assert!(backend.summary().contains("0 draw calls"));
        assert_eq!(backend.last_params(), Some(&params()));
    }

    #[test]
    fn recording_backend_captures_draws() {
        let mesh = build_box();
        let instances = [InstanceRecord::new(Mat4::IDENTITY, Color::RED); 3];
        let mut backend = RecordingBackend::new();
        backend.begin_frame(&params());
        backend.draw(DrawCall {
            handle: MeshHandle::Cached(0),
            mesh: &mesh,
            instances: &instances,
            pass: Pass::Lit,
        });
        backend.end_frame();

        assert_eq!(backend.count(Pass::Lit), 1);
        let s = &backend.submissions()[0];
        assert_eq!(s.index_count, 36);
        assert_eq!(s.instances.len(), 3);
        assert!(backend.summary().contains("36 indices x 3 instances"));
    }

    #[test]
    fn new_frame_resets_submissions() {
        let mesh = build_box();
        let instances = [InstanceRecord::new(Mat4::IDENTITY, Color::RED)];
        let mut backend = RecordingBackend::new();
        for _ in 0..2 {
            backend.begin_frame(&params());
            backend.draw(DrawCall {
                handle: MeshHandle::Cached(0),
                mesh: &mesh,
                instances: &instances,
                pass: Pass::Shadow,
            });
            backend.end_frame();
        }
        assert_eq!(backend.frames(), 2);
        assert_eq!(backend.submissions().len(), 1);
    }
}
