use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use physdraw_mesh::{Mesh, Topology, Vertex};
use physdraw_render::{DrawCall, FrameParams, InstanceRecord, MeshHandle, Pass, RenderBackend};
use wgpu::util::DeviceExt;

use crate::shaders;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const GROUND_HALF_EXTENT: f32 = 100.0;
const SKY_HALF_EXTENT: f32 = 1000.0;
/// Height of the sky plane above the eye.
const SKY_HEIGHT: f32 = 1.0;
/// Sky texture repeats per world unit.
const SKY_SCALE: f32 = 0.25;
const INITIAL_INSTANCE_CAPACITY: u64 = 4096;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    shadow: [[f32; 4]; 4],
    light_dir: [f32; 4],
    ground_color: [f32; 4],
    sky_color: [f32; 4],
    eye: [f32; 4],
    params: [f32; 4],
}

impl Uniforms {
    fn from_params(p: &FrameParams) -> Self {
        Self {
            view_proj: (p.projection * p.view).to_cols_array_2d(),
            shadow: p.shadow_matrix.to_cols_array_2d(),
            light_dir: p.light_direction.extend(0.0).to_array(),
            ground_color: p.ground_color.to_array(),
            sky_color: p.sky_color.to_array(),
            eye: p.eye.extend(SKY_HEIGHT).to_array(),
            params: [
                p.shadow_intensity,
                if p.use_textures { 1.0 } else { 0.0 },
                p.sky_offset,
                SKY_SCALE,
            ],
        }
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    topology: Topology,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, mesh: &Mesh, label: &str) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count() as u32,
            topology: mesh.topology,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct QueuedDraw {
    handle: MeshHandle,
    pass: Pass,
    first_instance: u32,
    instance_count: u32,
}

struct Pipelines {
    lit_triangles: wgpu::RenderPipeline,
    lit_lines: wgpu::RenderPipeline,
    shadow_triangles: wgpu::RenderPipeline,
    shadow_lines: wgpu::RenderPipeline,
    ground: wgpu::RenderPipeline,
    sky: wgpu::RenderPipeline,
}

impl Pipelines {
    fn select(&self, pass: Pass, topology: Topology) -> &wgpu::RenderPipeline {
        match (pass, topology) {
            (Pass::Lit, Topology::Triangles) => &self.lit_triangles,
            (Pass::Lit, Topology::Lines) => &self.lit_lines,
            (Pass::Shadow, Topology::Triangles) => &self.shadow_triangles,
            (Pass::Shadow, Topology::Lines) => &self.shadow_lines,
        }
    }
}

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
    ];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
    ];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<InstanceRecord>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &ATTRIBUTES,
    }
}

struct PipelineDesc<'a> {
    label: &'a str,
    module: &'a wgpu::ShaderModule,
    vertex_entry: &'a str,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    blend: Option<wgpu::BlendState>,
    depth_write: bool,
    depth_compare: wgpu::CompareFunction,
    bias: wgpu::DepthBiasState,
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    desc: PipelineDesc<'_>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: desc.module,
            entry_point: Some(desc.vertex_entry),
            compilation_options: Default::default(),
            buffers: desc.buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: desc.module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: desc.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: desc.topology,
            cull_mode: desc.cull_mode,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: desc.depth_write,
            depth_compare: desc.depth_compare,
            stencil: Default::default(),
            bias: desc.bias,
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn flat_quad(e: f32, normal: [f32; 3]) -> [Vertex; 6] {
    let corner = |x: f32, y: f32| Vertex {
        position: [x, y, 0.0],
        normal,
    };
    [
        corner(-e, -e),
        corner(e, -e),
        corner(e, e),
        corner(e, e),
        corner(-e, e),
        corner(-e, -e),
    ]
}

fn ground_vertices() -> [Vertex; 6] {
    flat_quad(GROUND_HALF_EXTENT, [0.0, 0.0, 1.0])
}

/// Sky quad in eye-relative xy; the shader lifts it above the eye.
fn sky_vertices() -> [Vertex; 6] {
    flat_quad(SKY_HALF_EXTENT, [0.0, 0.0, -1.0])
}

/// wgpu implementation of the draw context's backend.
///
/// Cached meshes are uploaded on first use and kept; transient meshes are
/// uploaded per frame. All instances of a frame share one buffer written in
/// a single transfer.
pub struct WgpuRenderer {
    pipelines: Pipelines,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    ground_vertex_buffer: wgpu::Buffer,
    sky_vertex_buffer: wgpu::Buffer,
    meshes: HashMap<MeshHandle, GpuMesh>,
    transient: HashMap<MeshHandle, GpuMesh>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: u64,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
    params: Option<FrameParams>,
    staged: Vec<InstanceRecord>,
    queued: Vec<QueuedDraw>,
    lit_ranges: HashMap<MeshHandle, (u32, u32)>,
}

impl WgpuRenderer {
    /// Creates pipelines and static buffers for `surface_format`.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform_buffer"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let lit_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lit_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::lit_shader().into()),
        });
        let shadow_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::shadow_shader().into()),
        });
        let ground_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ground_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::ground_shader().into()),
        });
        let sky_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sky_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::sky_shader().into()),
        });

        let instanced = [vertex_layout(), instance_layout()];
        let lit = |label: &'static str, topology, cull_mode: Option<wgpu::Face>| PipelineDesc {
            label,
            module: &lit_module,
            vertex_entry: "vs_main",
            buffers: &instanced,
            topology,
            cull_mode,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
            bias: Default::default(),
        };
        // shadows lie on the ground plane, so they are pulled toward the
        // viewer; line topology does not accept a depth bias, so line
        // shadows use an entry point that lifts them in z instead
        let shadow = |label: &'static str, vertex_entry: &'static str, topology, bias: wgpu::DepthBiasState| PipelineDesc {
            label,
            module: &shadow_module,
            vertex_entry,
            buffers: &instanced,
            topology,
            cull_mode: None,
            blend: None,
            depth_write: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            bias,
        };
        let shadow_bias = wgpu::DepthBiasState {
            constant: -2,
            slope_scale: -1.0,
            clamp: 0.0,
        };

        let pipelines = Pipelines {
            lit_triangles: create_pipeline(
                device,
                &layout,
                surface_format,
                lit("lit_triangles", wgpu::PrimitiveTopology::TriangleList, Some(wgpu::Face::Back)),
            ),
            lit_lines: create_pipeline(
                device,
                &layout,
                surface_format,
                lit("lit_lines", wgpu::PrimitiveTopology::LineList, None),
            ),
            shadow_triangles: create_pipeline(
                device,
                &layout,
                surface_format,
                shadow("shadow_triangles", "vs_main", wgpu::PrimitiveTopology::TriangleList, shadow_bias),
            ),
            shadow_lines: create_pipeline(
                device,
                &layout,
                surface_format,
                shadow("shadow_lines", "vs_line", wgpu::PrimitiveTopology::LineList, Default::default()),
            ),
            ground: create_pipeline(
                device,
                &layout,
                surface_format,
                PipelineDesc {
                    label: "ground",
                    module: &ground_module,
                    vertex_entry: "vs_main",
                    buffers: &[vertex_layout()],
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    blend: None,
                    depth_write: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    bias: Default::default(),
                },
            ),
            sky: create_pipeline(
                device,
                &layout,
                surface_format,
                PipelineDesc {
                    label: "sky",
                    module: &sky_module,
                    vertex_entry: "vs_main",
                    buffers: &[vertex_layout()],
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    blend: None,
                    depth_write: false,
                    depth_compare: wgpu::CompareFunction::Always,
                    bias: Default::default(),
                },
            ),
        };

        let ground_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ground_vertex_buffer"),
            contents: bytemuck::cast_slice(&ground_vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let sky_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sky_vertex_buffer"),
            contents: bytemuck::cast_slice(&sky_vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let instance_buffer = Self::create_instance_buffer(device, INITIAL_INSTANCE_CAPACITY);
        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            pipelines,
            uniform_buffer,
            uniform_bind_group,
            ground_vertex_buffer,
            sky_vertex_buffer,
            meshes: HashMap::new(),
            transient: HashMap::new(),
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
            depth_texture,
            surface_format,
            params: None,
            staged: Vec::new(),
            queued: Vec::new(),
            lit_ranges: HashMap::new(),
        }
    }

    /// Recreates the depth buffer for a new surface size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Number of meshes resident on the GPU across frames.
    pub fn resident_meshes(&self) -> usize {
        self.meshes.len()
    }

    /// Backend view that draws into `target` for one frame.
    pub fn frame<'a>(
        &'a mut self,
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        target: &'a wgpu::TextureView,
    ) -> GpuFrame<'a> {
        GpuFrame {
            renderer: self,
            device,
            queue,
            target,
        }
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: capacity * std::mem::size_of::<InstanceRecord>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }

    fn begin(&mut self, params: &FrameParams) {
        self.params = Some(*params);
        self.staged.clear();
        self.queued.clear();
        self.lit_ranges.clear();
        self.transient.clear();
    }

    fn queue_draw(&mut self, device: &wgpu::Device, call: DrawCall<'_>) {
        if call.instances.is_empty() {
            return;
        }
        match call.handle {
            MeshHandle::Cached(_) => {
                self.meshes
                    .entry(call.handle)
                    .or_insert_with(|| GpuMesh::upload(device, call.mesh, "cached_mesh"));
            }
            MeshHandle::Transient(_) => {
                self.transient
                    .entry(call.handle)
                    .or_insert_with(|| GpuMesh::upload(device, call.mesh, "transient_mesh"));
            }
        }

        let count = call.instances.len() as u32;
        // the shadow pass resubmits the lit lists; reuse their staged range
        let first_instance = match (call.pass, self.lit_ranges.get(&call.handle)) {
            (Pass::Shadow, Some(&(first, n))) if n == count => first,
            _ => {
                let first = self.staged.len() as u32;
                self.staged.extend_from_slice(call.instances);
                if call.pass == Pass::Lit {
                    self.lit_ranges.insert(call.handle, (first, count));
                }
                first
            }
        };
        self.queued.push(QueuedDraw {
            handle: call.handle,
            pass: call.pass,
            first_instance,
            instance_count: count,
        });
    }

    fn mesh(&self, handle: MeshHandle) -> Option<&GpuMesh> {
        match handle {
            MeshHandle::Cached(_) => self.meshes.get(&handle),
            MeshHandle::Transient(_) => self.transient.get(&handle),
        }
    }

    fn ensure_instance_capacity(&mut self, device: &wgpu::Device) {
        let needed = self.staged.len() as u64;
        if needed <= self.instance_capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        tracing::debug!(from = self.instance_capacity, to = capacity, "growing instance buffer");
        self.instance_buffer = Self::create_instance_buffer(device, capacity);
        self.instance_capacity = capacity;
    }

    fn submit(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, target: &wgpu::TextureView) {
        let Some(params) = self.params.take() else {
            tracing::warn!("end_frame without begin_frame");
            return;
        };

        self.ensure_instance_capacity(device);
        if !self.staged.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&self.staged));
        }
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms::from_params(&params)),
        );

        let sky = params.sky_color;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: sky.r as f64,
                            g: sky.g as f64,
                            b: sky.b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.uniform_bind_group, &[]);

            pass.set_pipeline(&self.pipelines.sky);
            pass.set_vertex_buffer(0, self.sky_vertex_buffer.slice(..));
            pass.draw(0..6, 0..1);

            pass.set_pipeline(&self.pipelines.ground);
            pass.set_vertex_buffer(0, self.ground_vertex_buffer.slice(..));
            pass.draw(0..6, 0..1);

            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for draw in &self.queued {
                let Some(mesh) = self.mesh(draw.handle) else {
                    continue;
                };
                if mesh.index_count == 0 {
                    continue;
                }
                pass.set_pipeline(self.pipelines.select(draw.pass, mesh.topology));
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                let instances = draw.first_instance..draw.first_instance + draw.instance_count;
                pass.draw_indexed(0..mesh.index_count, 0, instances);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        tracing::trace!(
            draws = self.queued.len(),
            instances = self.staged.len(),
            "gpu frame submitted"
        );
    }
}

/// One frame of [`WgpuRenderer`] bound to a device, queue and target.
pub struct GpuFrame<'a> {
    renderer: &'a mut WgpuRenderer,
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    target: &'a wgpu::TextureView,
}

impl RenderBackend for GpuFrame<'_> {
    fn begin_frame(&mut self, params: &FrameParams) {
        self.renderer.begin(params);
    }

    fn draw(&mut self, call: DrawCall<'_>) {
        self.renderer.queue_draw(self.device, call);
    }

    fn end_frame(&mut self) {
        self.renderer.submit(self.device, self.queue, self.target);
    }
}
