use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use glam::{Mat4, Vec3, Vec4};
use physdraw_common::{Color, Pose};
use physdraw_mesh::quality::{MAX_QUALITY, MIN_QUALITY, check_quality};
use physdraw_mesh::{Mesh, Vertex, build_convex, build_creased, build_smooth};

use crate::backend::{DrawCall, FrameParams, Pass, RenderBackend};
use crate::batcher::InstanceBatcher;
use crate::cache::{MeshCache, MeshHandle, MeshKey};
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::shadow::ShadowProjector;

/// Frames for the sky texture to scroll one full repeat.
pub const SKY_SCROLL_FRAMES: u64 = 500;

/// View state and toggles for one frame, supplied by the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub view: Mat4,
    pub projection: Mat4,
    pub use_textures: bool,
    pub use_shadows: bool,
}

impl FrameInputs {
    /// Inputs with the toggles taken from `config`.
    pub fn from_config(config: &RenderConfig, view: Mat4, projection: Mat4) -> Self {
        Self {
            view,
            projection,
            use_textures: config.use_textures,
            use_shadows: config.use_shadows,
        }
    }
}

/// Per-frame counters for instrumentation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Index of the frame these counters describe.
    pub frame: u64,
    pub lit_draws: usize,
    pub shadow_draws: usize,
    pub instances: usize,
    pub transient_meshes: usize,
    pub frame_time: Duration,
}

impl FrameStats {
    /// Lit and shadow submissions together.
    pub fn draw_calls(&self) -> usize {
        self.lit_draws + self.shadow_draws
    }
}

#[derive(Debug, Clone, Copy)]
struct Qualities {
    sphere: u32,
    cylinder: u32,
    capsule: u32,
}

/// Owns every piece of renderer state: built meshes, instance lists, the
/// shadow projection and the current primitive qualities.
///
/// Drawing only happens inside [`DrawContext::render_frame`], through the
/// [`Frame`] it hands to the draw callback.
#[derive(Debug)]
pub struct DrawContext {
    config: RenderConfig,
    cache: MeshCache,
    batcher: InstanceBatcher,
    shadow: ShadowProjector,
    qualities: Qualities,
    // lists recorded this frame that skip the shadow pass
    shadowless: BTreeSet<MeshHandle>,
    frame_index: u64,
}

impl DrawContext {
    /// Validates `config` and builds every built-in mesh at every quality.
    pub fn new(config: RenderConfig) -> Result<Self, RenderError> {
        config.validate()?;
        let _span = tracing::info_span!("draw_context_init").entered();

        let mut cache = MeshCache::new(config.weld);
        for key in [MeshKey::Box, MeshKey::Triangle, MeshKey::Line, MeshKey::Pyramid] {
            cache.handle(key)?;
        }
        for q in MIN_QUALITY..=MAX_QUALITY {
            cache.handle(MeshKey::Sphere(q))?;
            cache.handle(MeshKey::Cylinder(q))?;
            cache.handle(MeshKey::CapsuleBand(q))?;
        }
        tracing::info!(meshes = cache.cached_len(), "built-in meshes ready");

        Ok(Self {
            batcher: InstanceBatcher::new(config.instance_capacity),
            shadow: ShadowProjector::new(config.light_direction),
            qualities: Qualities {
                sphere: config.sphere_quality,
                cylinder: config.cylinder_quality,
                capsule: config.capsule_quality,
            },
            shadowless: BTreeSet::new(),
            frame_index: 0,
            cache,
            config,
        })
    }

    /// Configuration as validated, with later light changes applied.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Cached and transient meshes owned by this context.
    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    /// Current planar shadow projection.
    pub fn shadow(&self) -> &ShadowProjector {
        &self.shadow
    }

    /// Frames rendered so far; failed frames do not count.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Replaces the light. Near-horizontal directions are clamped as in
    /// [`ShadowProjector::new`].
    pub fn set_light_direction(&mut self, light: Vec3) {
        self.shadow = ShadowProjector::new(light);
        self.config.light_direction = light;
    }

    pub fn sphere_quality(&self) -> u32 {
        self.qualities.sphere
    }

    pub fn cylinder_quality(&self) -> u32 {
        self.qualities.cylinder
    }

    pub fn capsule_quality(&self) -> u32 {
        self.qualities.capsule
    }

    /// Selects the sphere mesh for later draws. Fails outside 1..=3.
    pub fn set_sphere_quality(&mut self, quality: u32) -> Result<(), RenderError> {
        self.qualities.sphere = check_quality(quality)?;
        Ok(())
    }

    pub fn set_cylinder_quality(&mut self, quality: u32) -> Result<(), RenderError> {
        self.qualities.cylinder = check_quality(quality)?;
        Ok(())
    }

    pub fn set_capsule_quality(&mut self, quality: u32) -> Result<(), RenderError> {
        self.qualities.capsule = check_quality(quality)?;
        Ok(())
    }

    /// Registers a triangle mesh with normals split at the configured crease
    /// angle. The returned handle can be drawn any number of times.
    pub fn register_mesh(&mut self, positions: &[f32], indices: &[u32]) -> Result<MeshHandle, RenderError> {
        let degrees = self.config.registered_crease_degrees;
        self.register_mesh_with_crease(positions, indices, degrees)
    }

    /// Registers a triangle mesh with an explicit crease angle in degrees.
    pub fn register_mesh_with_crease(
        &mut self,
        positions: &[f32],
        indices: &[u32],
        crease_degrees: f32,
    ) -> Result<MeshHandle, RenderError> {
        let mesh = build_creased(positions, indices, crease_degrees, self.config.weld)?;
        let handle = self.cache.register(mesh)?;
        tracing::info!(?handle, crease_degrees, "registered mesh");
        Ok(handle)
    }

    /// Registers a mesh with one averaged normal per input vertex.
    pub fn register_smooth_mesh(&mut self, positions: &[f32], indices: &[u32]) -> Result<MeshHandle, RenderError> {
        let mesh = build_smooth(positions, indices)?;
        let handle = self.cache.register(mesh)?;
        tracing::info!(?handle, "registered smooth mesh");
        Ok(handle)
    }

    /// Constants the backend receives for a frame drawn with `inputs`.
    pub fn frame_params(&self, inputs: &FrameInputs) -> FrameParams {
        let scroll = self.frame_index % SKY_SCROLL_FRAMES;
        FrameParams {
            view: inputs.view,
            projection: inputs.projection,
            light_direction: self.shadow.light_direction(),
            shadow_matrix: self.shadow.matrix(),
            shadow_intensity: self.config.shadow_intensity,
            ground_color: self.config.ground_color,
            sky_color: self.config.sky_color,
            eye: inputs.view.inverse().w_axis.truncate(),
            sky_offset: scroll as f32 / SKY_SCROLL_FRAMES as f32,
            use_textures: inputs.use_textures,
            use_shadows: inputs.use_shadows,
        }
    }

    /// Runs one frame: opens the instance lists, records the ground markers,
    /// runs `draw`, submits every non-empty list to `backend` (lit pass, then
    /// the shadow pass when enabled) and clears the lists.
    ///
    /// An error from `draw` discards everything recorded this frame.
    pub fn render_frame<F>(
        &mut self,
        inputs: &FrameInputs,
        backend: &mut dyn RenderBackend,
        draw: F,
    ) -> Result<FrameStats, RenderError>
    where
        F: FnOnce(&mut Frame<'_>) -> Result<(), RenderError>,
    {
        let _span = tracing::info_span!("render_frame", frame = self.frame_index).entered();
        let start = Instant::now();

        self.batcher.open()?;
        let recorded = self.record(draw);
        let result = match recorded {
            Ok(()) => self.flush(inputs, backend),
            Err(e) => Err(e),
        };
        let transient_meshes = self.cache.transient_len();
        self.batcher.clear();
        self.cache.clear_transient();
        self.shadowless.clear();
        self.batcher.close();

        let mut stats = result?;
        stats.frame = self.frame_index;
        stats.transient_meshes = transient_meshes;
        stats.frame_time = start.elapsed();
        self.frame_index += 1;
        tracing::debug!(
            lit = stats.lit_draws,
            shadow = stats.shadow_draws,
            instances = stats.instances,
            "frame submitted"
        );
        Ok(stats)
    }

    fn record<F>(&mut self, draw: F) -> Result<(), RenderError>
    where
        F: FnOnce(&mut Frame<'_>) -> Result<(), RenderError>,
    {
        if self.config.ground_markers {
            self.record_ground_markers()?;
        }
        let mut frame = Frame {
            ctx: self,
            color: Color::WHITE,
        };
        draw(&mut frame)
    }

    /// 3x3 grid of small pyramids at integer ground coordinates; +X is red,
    /// +Y is blue, the rest yellow.
    fn record_ground_markers(&mut self) -> Result<(), RenderError> {
        let pyramid = self.cache.handle(MeshKey::Pyramid)?;
        for i in -1..=1 {
            for j in -1..=1 {
                let color = match (i, j) {
                    (1, 0) => Color::RED,
                    (0, 1) => Color::BLUE,
                    _ => Color::YELLOW,
                };
                let model = Mat4::from_translation(Vec3::new(i as f32, j as f32, 0.0))
                    * Mat4::from_scale(Vec3::splat(0.03));
                self.batcher.record(pyramid, model, color)?;
            }
        }
        Ok(())
    }

    fn flush(&self, inputs: &FrameInputs, backend: &mut dyn RenderBackend) -> Result<FrameStats, RenderError> {
        let _span = tracing::debug_span!("flush").entered();
        if let Some((missing, _)) = self
            .batcher
            .batches()
            .find(|(handle, _)| self.cache.get(*handle).is_none())
        {
            return Err(RenderError::UnknownMesh(missing));
        }

        let params = self.frame_params(inputs);
        let mut stats = FrameStats::default();
        backend.begin_frame(&params);

        let mut passes = vec![Pass::Lit];
        if inputs.use_shadows {
            passes.push(Pass::Shadow);
        }
        for pass in passes {
            for (handle, instances) in self.batcher.batches() {
                if pass == Pass::Shadow && self.shadowless.contains(&handle) {
                    continue;
                }
                let Some(mesh) = self.cache.get(handle) else {
                    continue;
                };
                backend.draw(DrawCall {
                    handle,
                    mesh,
                    instances,
                    pass,
                });
                match pass {
                    Pass::Lit => {
                        stats.lit_draws += 1;
                        stats.instances += instances.len();
                    }
                    Pass::Shadow => stats.shadow_draws += 1,
                }
            }
        }
        backend.end_frame();
        Ok(stats)
    }
}

/// Recording surface for one frame. Every draw uses the color from the last
/// `set_color*` call, which resets to white each frame.
#[derive(Debug)]
pub struct Frame<'a> {
    ctx: &'a mut DrawContext,
    color: Color,
}

impl Frame<'_> {
    /// Opaque color for the following draws.
    pub fn set_color(&mut self, r: f32, g: f32, b: f32) {
        self.color = Color::rgb(r, g, b);
    }

    /// Color with explicit alpha; below 1 the draws blend.
    pub fn set_color_alpha(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.color = Color::rgba(r, g, b, a);
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_sphere_quality(&mut self, quality: u32) -> Result<(), RenderError> {
        self.ctx.set_sphere_quality(quality)
    }

    pub fn set_cylinder_quality(&mut self, quality: u32) -> Result<(), RenderError> {
        self.ctx.set_cylinder_quality(quality)
    }

    pub fn set_capsule_quality(&mut self, quality: u32) -> Result<(), RenderError> {
        self.ctx.set_capsule_quality(quality)
    }

    fn record_key(&mut self, key: MeshKey, model: Mat4) -> Result<(), RenderError> {
        let handle = self.ctx.cache.handle(key)?;
        self.record_handle(handle, model)
    }

    fn record_handle(&mut self, handle: MeshHandle, model: Mat4) -> Result<(), RenderError> {
        self.ctx.batcher.record(handle, model, self.color)
    }

    // Wireframe triangles cast no shadow; every other draw does.
    fn record_unshadowed(&mut self, handle: MeshHandle, model: Mat4) -> Result<(), RenderError> {
        self.ctx.shadowless.insert(handle);
        self.record_handle(handle, model)
    }

    fn styled(&mut self, handle: MeshHandle, solid: bool) -> Result<MeshHandle, RenderError> {
        if solid {
            Ok(handle)
        } else {
            self.ctx.cache.wireframe(handle)
        }
    }

    /// Box with full side lengths `sides`.
    pub fn draw_box(&mut self, pose: &Pose, sides: Vec3) -> Result<(), RenderError> {
        self.record_key(MeshKey::Box, pose.model_matrix(sides))
    }

    /// Sphere of `radius` at the current sphere quality.
    pub fn draw_sphere(&mut self, pose: &Pose, radius: f32) -> Result<(), RenderError> {
        let key = MeshKey::Sphere(self.ctx.qualities.sphere);
        self.record_key(key, pose.model_matrix(Vec3::splat(radius)))
    }

    /// Cylinder along the pose's local z axis, centered on the pose.
    pub fn draw_cylinder(&mut self, pose: &Pose, length: f32, radius: f32) -> Result<(), RenderError> {
        let key = MeshKey::Cylinder(self.ctx.qualities.cylinder);
        self.record_key(key, pose.model_matrix(Vec3::new(radius, radius, length)))
    }

    /// Capsule along the pose's local z axis: a band of `length` between two
    /// hemispherical caps of `radius`.
    pub fn draw_capsule(&mut self, pose: &Pose, length: f32, radius: f32) -> Result<(), RenderError> {
        let q = self.ctx.qualities.capsule;
        let half = 0.5 * length;
        let base = pose.matrix();

        let band = base * Mat4::from_scale(Vec3::new(radius, radius, half));
        self.record_key(MeshKey::CapsuleBand(q), band)?;

        // unit caps sit at z = +/-1, so shift by (half - radius) after scaling
        let shift = half - radius;
        let top = base
            * Mat4::from_translation(Vec3::new(0.0, 0.0, shift))
            * Mat4::from_scale(Vec3::splat(radius));
        self.record_key(MeshKey::CapsuleCapTop(q), top)?;
        let bottom = base
            * Mat4::from_translation(Vec3::new(0.0, 0.0, -shift))
            * Mat4::from_scale(Vec3::splat(radius));
        self.record_key(MeshKey::CapsuleCapBottom(q), bottom)
    }

    /// Single triangle given in the pose's local frame, drawn as an affine
    /// instance of the unit triangle.
    pub fn draw_triangle(&mut self, pose: &Pose, v0: Vec3, v1: Vec3, v2: Vec3, solid: bool) -> Result<(), RenderError> {
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let normal = e1.cross(e2).try_normalize().unwrap_or(Vec3::Z);
        let local = Mat4::from_cols(e1.extend(0.0), e2.extend(0.0), normal.extend(0.0), v0.extend(1.0));
        let unit = self.ctx.cache.handle(MeshKey::Triangle)?;
        let model = pose.matrix() * local;
        if solid {
            self.record_handle(unit, model)
        } else {
            let wire = self.ctx.cache.wireframe(unit)?;
            self.record_unshadowed(wire, model)
        }
    }

    /// Batch of triangles in the pose's local frame, three points each, with
    /// flat normals. Built as per-frame geometry.
    pub fn draw_triangles(&mut self, pose: &Pose, points: &[Vec3], solid: bool) -> Result<(), RenderError> {
        let triangles = points.chunks_exact(3);
        if !triangles.remainder().is_empty() {
            tracing::warn!(extra = triangles.remainder().len(), "ignoring incomplete triangle");
        }
        let mut vertices = Vec::with_capacity(points.len());
        for t in triangles {
            let normal = (t[1] - t[0]).cross(t[2] - t[0]).try_normalize().unwrap_or(Vec3::Z);
            vertices.extend(t.iter().map(|&p| Vertex::new(p, normal)));
        }
        if vertices.is_empty() {
            return Ok(());
        }
        let indices = (0..vertices.len() as u32).collect();
        let handle = self.ctx.cache.push_transient(Mesh::triangles(vertices, indices));
        if solid {
            self.record_handle(handle, pose.matrix())
        } else {
            let wire = self.ctx.cache.wireframe(handle)?;
            self.record_unshadowed(wire, pose.matrix())
        }
    }

    /// World-space line segment.
    pub fn draw_line(&mut self, from: Vec3, to: Vec3) -> Result<(), RenderError> {
        let model = Mat4::from_cols((to - from).extend(0.0), Vec4::ZERO, Vec4::ZERO, from.extend(1.0));
        self.record_key(MeshKey::Line, model)
    }

    /// Convex polyhedron in the physics engine's plane/point/polygon layout.
    pub fn draw_convex(&mut self, pose: &Pose, planes: &[f32], points: &[f32], polygons: &[u32]) -> Result<(), RenderError> {
        let mesh = build_convex(planes, points, polygons)?;
        if mesh.index_count() == 0 {
            return Ok(());
        }
        let handle = self.ctx.cache.push_transient(mesh);
        self.record_handle(handle, pose.matrix())
    }

    /// Previously registered mesh at `pose`.
    pub fn draw_registered(&mut self, handle: MeshHandle, pose: &Pose, solid: bool) -> Result<(), RenderError> {
        if self.ctx.cache.get(handle).is_none() {
            return Err(RenderError::UnknownMesh(handle));
        }
        let handle = self.styled(handle, solid)?;
        self.record_handle(handle, pose.matrix())
    }

    /// Registered mesh with an extra local scale.
    pub fn draw_registered_scaled(
        &mut self,
        handle: MeshHandle,
        pose: &Pose,
        scale: Vec3,
        solid: bool,
    ) -> Result<(), RenderError> {
        if self.ctx.cache.get(handle).is_none() {
            return Err(RenderError::UnknownMesh(handle));
        }
        let handle = self.styled(handle, solid)?;
        self.record_handle(handle, pose.model_matrix(scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;

    fn context() -> DrawContext {
        DrawContext::new(RenderConfig {
            ground_markers: false,
            instance_capacity: 64,
            ..RenderConfig::default()
        })
        .unwrap()
    }

    fn inputs(shadows: bool) -> FrameInputs {
        FrameInputs {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            use_textures: false,
            use_shadows: shadows,
        }
    }

    #[test]
    fn many_spheres_one_draw_call() {
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let stats = ctx
            .render_frame(&inputs(false), &mut backend, |frame| {
                for i in 0..100 {
                    let pose = Pose::from_position(Vec3::new(i as f32, 0.0, 1.0));
                    frame.draw_sphere(&pose, 0.5)?;
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(stats.lit_draws, 1);
        assert_eq!(stats.shadow_draws, 0);
        assert_eq!(backend.submissions().len(), 1);
        assert_eq!(backend.submissions()[0].instances.len(), 100);
    }

    #[test]
    fn shadows_resubmit_every_list() {
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let stats = ctx
            .render_frame(&inputs(true), &mut backend, |frame| {
                frame.draw_box(&Pose::default(), Vec3::ONE)?;
                frame.draw_sphere(&Pose::default(), 1.0)?;
                frame.draw_cylinder(&Pose::default(), 1.0, 0.2)
            })
            .unwrap();
        assert_eq!(stats.lit_draws, 3);
        assert_eq!(stats.shadow_draws, 3);
        let passes: Vec<Pass> = backend.submissions().iter().map(|s| s.pass).collect();
        assert_eq!(passes[..3], [Pass::Lit; 3]);
        assert_eq!(passes[3..], [Pass::Shadow; 3]);
        for (lit, shadow) in backend.submissions()[..3].iter().zip(&backend.submissions()[3..]) {
            assert_eq!(lit.handle, shadow.handle);
            assert_eq!(lit.instances, shadow.instances);
        }
    }

    #[test]
    fn empty_frame_submits_nothing() {
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let stats = ctx.render_frame(&inputs(true), &mut backend, |_| Ok(())).unwrap();
        assert_eq!(stats.draw_calls(), 0);
        assert_eq!(backend.frames(), 1);
    }

    #[test]
    fn lists_are_cleared_between_frames() {
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        for _ in 0..3 {
            ctx.render_frame(&inputs(false), &mut backend, |frame| frame.draw_box(&Pose::default(), Vec3::ONE))
                .unwrap();
            assert_eq!(backend.submissions()[0].instances.len(), 1);
        }
        assert_eq!(ctx.frame_index(), 3);
    }

    #[test]
    fn capsule_assembles_three_parts() {
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let (length, radius) = (2.0, 0.5);
        ctx.render_frame(&inputs(false), &mut backend, |frame| {
            frame.draw_capsule(&Pose::default(), length, radius)
        })
        .unwrap();
        let subs = backend.submissions();
        assert_eq!(subs.len(), 3);

        let q = ctx.capsule_quality();
        let top = ctx.cache().lookup(MeshKey::CapsuleCapTop(q)).unwrap();
        let bottom = ctx.cache().lookup(MeshKey::CapsuleCapBottom(q)).unwrap();
        let band = ctx.cache().lookup(MeshKey::CapsuleBand(q)).unwrap();
        let model_of = |h: MeshHandle| {
            subs.iter()
                .find(|s| s.handle == h)
                .map(|s| s.instances[0].model_matrix())
                .unwrap()
        };

        // poles at +/-(l/2 + r)
        let top_pole = model_of(top).transform_point3(Vec3::new(0.0, 0.0, 2.0));
        assert!((top_pole - Vec3::new(0.0, 0.0, 1.5)).length() < 1e-6);
        let bottom_pole = model_of(bottom).transform_point3(Vec3::new(0.0, 0.0, -2.0));
        assert!((bottom_pole - Vec3::new(0.0, 0.0, -1.5)).length() < 1e-6);

        // band rims meet the cap equators at +/- l/2 with radius r
        let rim = model_of(band).transform_point3(Vec3::new(1.0, 0.0, 1.0));
        assert!((rim - Vec3::new(0.5, 0.0, 1.0)).length() < 1e-6);
        let cap_rim = model_of(top).transform_point3(Vec3::new(1.0, 0.0, 1.0));
        assert!((cap_rim - rim).length() < 1e-6);
    }

    #[test]
    fn quality_setting_selects_mesh() {
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        ctx.render_frame(&inputs(false), &mut backend, |frame| {
            frame.set_sphere_quality(1)?;
            frame.draw_sphere(&Pose::default(), 1.0)
        })
        .unwrap();
        let expected = ctx.cache().lookup(MeshKey::Sphere(1)).unwrap();
        assert_eq!(backend.submissions()[0].handle, expected);
        assert!(ctx.set_sphere_quality(0).is_err());
    }

    #[test]
    fn draw_error_discards_frame() {
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let result = ctx.render_frame(&inputs(false), &mut backend, |frame| {
            frame.draw_box(&Pose::default(), Vec3::ONE)?;
            frame.draw_registered(MeshHandle::Cached(9999), &Pose::default(), true)
        });
        assert!(matches!(result, Err(RenderError::UnknownMesh(_))));
        assert_eq!(backend.frames(), 0);

        // the next frame starts clean
        let stats = ctx.render_frame(&inputs(false), &mut backend, |_| Ok(())).unwrap();
        assert_eq!(stats.draw_calls(), 0);
    }

    #[test]
    fn triangle_instance_maps_unit_corners() {
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let (v0, v1, v2) = (Vec3::new(1.0, 1.0, 0.0), Vec3::new(3.0, 1.0, 0.0), Vec3::new(1.0, 2.0, 0.0));
        ctx.render_frame(&inputs(false), &mut backend, |frame| {
            frame.draw_triangle(&Pose::default(), v0, v1, v2, true)
        })
        .unwrap();
        let m = backend.submissions()[0].instances[0].model_matrix();
        assert_eq!(m.transform_point3(Vec3::ZERO), v0);
        assert_eq!(m.transform_point3(Vec3::X), v1);
        assert_eq!(m.transform_point3(Vec3::Y), v2);
        assert_eq!(m.transform_vector3(Vec3::Z), Vec3::Z);
    }

    #[test]
    fn wireframe_draws_use_line_meshes() {
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        ctx.render_frame(&inputs(false), &mut backend, |frame| {
            frame.draw_triangle(&Pose::default(), Vec3::ZERO, Vec3::X, Vec3::Y, false)?;
            frame.draw_triangles(&Pose::default(), &[Vec3::ZERO, Vec3::X, Vec3::Y], false)
        })
        .unwrap();
        assert_eq!(backend.submissions().len(), 2);
        for s in backend.submissions() {
            assert_eq!(s.topology, physdraw_mesh::Topology::Lines);
            assert_eq!(s.index_count, 6);
        }
    }

    #[test]
    fn wire_triangles_cast_no_shadow() {
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let tri = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let stats = ctx
            .render_frame(&inputs(true), &mut backend, |frame| {
                frame.draw_triangle(&Pose::default(), tri[0], tri[1], tri[2], false)?;
                frame.draw_triangles(&Pose::default(), &tri, false)?;
                frame.draw_triangle(&Pose::default(), tri[0], tri[1], tri[2], true)
            })
            .unwrap();
        assert_eq!(stats.lit_draws, 3);
        assert_eq!(stats.shadow_draws, 1);
        let unit = ctx.cache().lookup(MeshKey::Triangle).unwrap();
        let shadow = backend.submissions().iter().find(|s| s.pass == Pass::Shadow).unwrap();
        assert_eq!(shadow.handle, unit);

        // the exemption does not outlive the frame
        let stats = ctx
            .render_frame(&inputs(true), &mut backend, |frame| {
                frame.draw_triangles(&Pose::default(), &tri, true)
            })
            .unwrap();
        assert_eq!(stats.shadow_draws, 1);
    }

    #[test]
    fn wire_registered_mesh_still_casts_shadow() {
        let mut ctx = context();
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let handle = ctx.register_mesh(&positions, &[0, 1, 2]).unwrap();
        let mut backend = RecordingBackend::new();
        let stats = ctx
            .render_frame(&inputs(true), &mut backend, |frame| {
                frame.draw_registered(handle, &Pose::default(), false)
            })
            .unwrap();
        assert_eq!(stats.shadow_draws, 1);
    }

    #[test]
    fn line_model_maps_segment() {
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let (a, b) = (Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.0, 5.0));
        ctx.render_frame(&inputs(true), &mut backend, |frame| frame.draw_line(a, b))
            .unwrap();
        let m = backend.submissions()[0].instances[0].model_matrix();
        assert_eq!(m.transform_point3(Vec3::ZERO), a);
        assert_eq!(m.transform_point3(Vec3::X), b);
        // lines cast shadows too
        assert_eq!(backend.count(Pass::Shadow), 1);
    }

    #[test]
    fn transient_geometry_is_per_frame() {
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let stats = ctx
            .render_frame(&inputs(false), &mut backend, |frame| {
                frame.draw_triangles(&Pose::default(), &[Vec3::ZERO, Vec3::X, Vec3::Y], true)?;
                frame.draw_triangles(&Pose::default(), &[Vec3::ZERO, Vec3::Y, Vec3::Z], true)
            })
            .unwrap();
        assert_eq!(stats.transient_meshes, 2);
        assert_eq!(stats.lit_draws, 2);
        assert_eq!(ctx.cache().transient_len(), 0);
    }

    #[test]
    fn registered_mesh_draws_by_handle() {
        let mut ctx = context();
        #[rustfmt::skip]
        let positions = [
            0.0, 0.0, 0.0,  1.0, 0.0, 0.0,  0.0, 1.0, 0.0,  0.0, 0.0, 1.0,
        ];
        let indices = [0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3];
        let handle = ctx.register_mesh(&positions, &indices).unwrap();
        let mut backend = RecordingBackend::new();
        ctx.render_frame(&inputs(false), &mut backend, |frame| {
            for i in 0..10 {
                frame.draw_registered(handle, &Pose::from_position(Vec3::splat(i as f32)), true)?;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(backend.submissions().len(), 1);
        assert_eq!(backend.submissions()[0].handle, handle);
        assert_eq!(backend.submissions()[0].instances.len(), 10);
    }

    #[test]
    fn convex_draw_and_colors() {
        let mut ctx = context();
        let mut backend = RecordingBackend::new();
        let planes = [0.0, 0.0, 1.0, 0.0];
        let points = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let polygons = [3, 0, 1, 2];
        ctx.render_frame(&inputs(false), &mut backend, |frame| {
            frame.set_color_alpha(0.2, 0.4, 0.6, 0.5);
            frame.draw_convex(&Pose::default(), &planes, &points, &polygons)
        })
        .unwrap();
        let s = &backend.submissions()[0];
        assert!(matches!(s.handle, MeshHandle::Transient(_)));
        assert_eq!(s.instances[0].color, [0.2, 0.4, 0.6, 0.5]);
    }

    #[test]
    fn ground_markers_are_drawn_when_enabled() {
        let mut ctx = DrawContext::new(RenderConfig::default()).unwrap();
        let mut backend = RecordingBackend::new();
        let stats = ctx.render_frame(&inputs(false), &mut backend, |_| Ok(())).unwrap();
        assert_eq!(stats.lit_draws, 1);
        assert_eq!(stats.instances, 9);
        let colors: Vec<[f32; 4]> = backend.submissions()[0].instances.iter().map(|r| r.color).collect();
        assert_eq!(colors.iter().filter(|c| **c == Color::RED.to_array()).count(), 1);
        assert_eq!(colors.iter().filter(|c| **c == Color::BLUE.to_array()).count(), 1);
    }

    #[test]
    fn frame_params_carry_shadow_setup() {
        let ctx = context();
        let params = ctx.frame_params(&inputs(true));
        assert_eq!(params.shadow_matrix, ctx.shadow().matrix());
        assert_eq!(params.shadow_intensity, 0.65);
        assert!((params.light_direction.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn light_direction_can_change() {
        let mut ctx = context();
        let before = ctx.shadow().matrix();
        ctx.set_light_direction(Vec3::new(-1.0, 0.0, 2.0));
        assert_ne!(ctx.shadow().matrix(), before);
        assert_eq!(ctx.config().light_direction, Vec3::new(-1.0, 0.0, 2.0));
        let p = ctx.shadow().project_point(Vec3::new(0.0, 0.0, 1.0));
        assert!((p - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
        let params = ctx.frame_params(&inputs(true));
        assert_eq!(params.shadow_matrix, ctx.shadow().matrix());
    }

    #[test]
    fn smooth_registration_keeps_vertex_count() {
        let mut ctx = context();
        #[rustfmt::skip]
        let positions = [
            0.0, 0.0, 0.0,  1.0, 0.0, 0.0,  0.0, 1.0, 0.0,  0.0, 0.0, 1.0,
        ];
        let indices = [0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3];
        let handle = ctx.register_smooth_mesh(&positions, &indices).unwrap();
        let mesh = ctx.cache().get(handle).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.primitive_count(), 4);
        assert!(ctx.register_smooth_mesh(&positions, &[0, 1, 9]).is_err());
    }

    #[test]
    fn sky_follows_camera_and_scrolls() {
        let mut ctx = context();
        let eye = Vec3::new(1.0, -2.0, 3.0);
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Z);
        let frame_inputs = FrameInputs {
            view,
            ..inputs(false)
        };
        let first = ctx.frame_params(&frame_inputs);
        assert!((first.eye - eye).length() < 1e-5);
        assert_eq!(first.sky_offset, 0.0);

        let mut backend = RecordingBackend::new();
        for _ in 0..(SKY_SCROLL_FRAMES + 1) {
            ctx.render_frame(&frame_inputs, &mut backend, |_| Ok(())).unwrap();
        }
        // one full repeat plus one frame
        let later = ctx.frame_params(&frame_inputs);
        assert!((later.sky_offset - 1.0 / SKY_SCROLL_FRAMES as f32).abs() < 1e-6);
        assert!((0.0..1.0).contains(&later.sky_offset));
    }

    #[test]
    fn oversized_capacity_is_a_config_error() {
        let result = DrawContext::new(RenderConfig {
            instance_capacity: usize::MAX,
            ..RenderConfig::default()
        });
        assert!(matches!(result, Err(RenderError::Config(_))));
    }
}
