use std::f32::consts::FRAC_PI_2;

use anyhow::{Result, bail};
use clap::ValueEnum;
use glam::{Mat3, Vec3};
use physdraw_common::{Color, Pose};
use physdraw_render::{DrawContext, Frame, MeshHandle, RenderError};
use physdraw_render_wgpu::Viewpoint;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::obj::ObjMesh;

/// Simulation step per frame.
pub const STEP: f32 = 1.0 / 60.0;

const SPHERE_FIELD_SIDE: usize = 100;
const SPHERE_SPACING: f32 = 0.3;

const MIXED_DIMS: [usize; 3] = [100, 100, 10];
const MIXED_PITCH: f32 = 0.25;
const MIXED_MARGIN: f32 = 0.003;
const MIXED_BASE: f32 = 0.1;
const MIXED_SEED: u64 = 0x5eed;

const MESH_GAP: f32 = 0.05;
const MESH_MAX_EXTENT: u32 = 5;

#[rustfmt::skip]
const OCTAHEDRON_POSITIONS: [f32; 18] = [
    1.0, 0.0, 0.0,  -1.0, 0.0, 0.0,
    0.0, 1.0, 0.0,   0.0, -1.0, 0.0,
    0.0, 0.0, 1.0,   0.0, 0.0, -1.0,
];

#[rustfmt::skip]
const OCTAHEDRON_INDICES: [u32; 24] = [
    0, 2, 4,  2, 1, 4,  1, 3, 4,  3, 0, 4,
    2, 0, 5,  1, 2, 5,  3, 1, 5,  0, 3, 5,
];

#[rustfmt::skip]
const HULL_PLANES: [f32; 24] = [
    1.0, 0.0, 0.0, 0.5,   -1.0, 0.0, 0.0, 0.5,
    0.0, 1.0, 0.0, 0.5,    0.0, -1.0, 0.0, 0.5,
    0.0, 0.0, 1.0, 0.5,    0.0, 0.0, -1.0, 0.5,
];

#[rustfmt::skip]
const HULL_POINTS: [f32; 24] = [
    -0.5, -0.5, -0.5,   0.5, -0.5, -0.5,  -0.5, 0.5, -0.5,   0.5, 0.5, -0.5,
    -0.5, -0.5,  0.5,   0.5, -0.5,  0.5,  -0.5, 0.5,  0.5,   0.5, 0.5,  0.5,
];

#[rustfmt::skip]
const HULL_POLYGONS: [u32; 30] = [
    4, 1, 3, 7, 5,
    4, 0, 4, 6, 2,
    4, 2, 6, 7, 3,
    4, 0, 1, 5, 4,
    4, 4, 5, 7, 6,
    4, 0, 2, 3, 1,
];

/// Demo content selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SceneKind {
    /// A mixed pile of every primitive
    Stack,
    /// A large field of spheres
    Spheres,
    /// 100k instanced primitives of one shape at a time
    Mixed,
    /// A grid of copies of an OBJ mesh given with --mesh
    Mesh,
}

/// Primitive shown by the mixed scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Sphere,
    Cylinder,
    Capsule,
    Box,
}

impl Shape {
    fn next(self) -> Self {
        match self {
            Shape::Sphere => Shape::Cylinder,
            Shape::Cylinder => Shape::Capsule,
            Shape::Capsule => Shape::Box,
            Shape::Box => Shape::Sphere,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Body {
    position: Vec3,
    radius: f32,
    length: f32,
    color: Color,
}

#[derive(Debug)]
struct MixedField {
    bodies: Vec<Body>,
    shape: Shape,
}

impl MixedField {
    fn generate(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let [nx, ny, nz] = MIXED_DIMS;
        let x0 = -((nx - 1) as f32) * 0.5 * MIXED_PITCH;
        let y0 = -((ny - 1) as f32) * 0.5 * MIXED_PITCH;
        let mut bodies = Vec::with_capacity(nx * ny * nz);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let position = Vec3::new(
                        x0 + i as f32 * MIXED_PITCH,
                        y0 + j as f32 * MIXED_PITCH,
                        MIXED_BASE + k as f32 * MIXED_PITCH,
                    );
                    let radius = rng.random_range(0.03..0.5 * MIXED_PITCH - MIXED_MARGIN);
                    let length = rng.random_range(0.03..MIXED_PITCH - 2.0 * MIXED_MARGIN);
                    let color = Color::rgb(
                        rng.random_range(0.25..1.0),
                        rng.random_range(0.25..1.0),
                        rng.random_range(0.25..1.0),
                    );
                    bodies.push(Body {
                        position,
                        radius,
                        length,
                        color,
                    });
                }
            }
        }
        Self {
            bodies,
            shape: Shape::Sphere,
        }
    }

    fn draw(&self, f: &mut Frame<'_>) -> Result<(), RenderError> {
        for body in &self.bodies {
            f.set_color(body.color.r, body.color.g, body.color.b);
            let pose = Pose::from_position(body.position);
            let r = body.radius;
            match self.shape {
                Shape::Sphere => f.draw_sphere(&pose, r)?,
                Shape::Cylinder => f.draw_cylinder(&pose, body.length, r)?,
                Shape::Capsule => f.draw_capsule(&pose, MIXED_PITCH - 2.0 * r - 0.5 * MIXED_MARGIN, r)?,
                Shape::Box => f.draw_box(&pose, Vec3::new(2.0 * r, 2.0 * r, body.length))?,
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct MeshGrid {
    handle: MeshHandle,
    soup: Vec<Vec3>,
    center: Vec3,
    size: Vec3,
    extent: u32,
    solid: bool,
    registered: bool,
}

impl MeshGrid {
    fn new(mesh: &ObjMesh, ctx: &mut DrawContext) -> Result<Self, RenderError> {
        let handle = ctx.register_mesh(&mesh.positions, &mesh.indices)?;
        let (lo, hi) = mesh.bounds();
        Ok(Self {
            handle,
            soup: mesh.triangle_soup(),
            center: 0.5 * (lo + hi),
            size: hi - lo,
            extent: 2,
            solid: true,
            registered: true,
        })
    }

    fn draw(&self, f: &mut Frame<'_>) -> Result<(), RenderError> {
        f.set_color(0.8, 0.8, 0.9);
        let pitch = self.size + Vec3::splat(MESH_GAP);
        let origin = Vec3::new(0.0, 0.0, 2.0) - self.center;
        let n = self.extent as i32;
        for i in -n..=n {
            for j in -n..=n {
                let pose = Pose::from_position(origin + Vec3::new(i as f32 * pitch.x, j as f32 * pitch.y, 0.0));
                if self.registered {
                    f.draw_registered(self.handle, &pose, self.solid)?;
                } else {
                    f.draw_triangles(&pose, &self.soup, self.solid)?;
                }
            }
        }
        Ok(())
    }
}

/// Kinematic demo scene. Poses are functions of elapsed simulation time.
#[derive(Debug)]
pub struct Scene {
    kind: SceneKind,
    time: f32,
    steps: u64,
    octahedron: MeshHandle,
    mixed: Option<MixedField>,
    mesh: Option<MeshGrid>,
}

impl Scene {
    /// Builds a scene. The mesh scene needs `mesh`; other scenes ignore it.
    pub fn new(kind: SceneKind, mesh: Option<&ObjMesh>, ctx: &mut DrawContext) -> Result<Self> {
        let octahedron = ctx.register_mesh(&OCTAHEDRON_POSITIONS, &OCTAHEDRON_INDICES)?;
        let mixed = (kind == SceneKind::Mixed).then(|| MixedField::generate(MIXED_SEED));
        let mesh = match (kind, mesh) {
            (SceneKind::Mesh, Some(mesh)) => Some(MeshGrid::new(mesh, ctx)?),
            (SceneKind::Mesh, None) => bail!("the mesh scene needs --mesh <file.obj>"),
            _ => None,
        };
        Ok(Self {
            kind,
            time: 0.0,
            steps: 0,
            octahedron,
            mixed,
            mesh,
        })
    }

    pub fn kind(&self) -> SceneKind {
        self.kind
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Advances simulation time by one fixed step.
    pub fn step(&mut self) {
        self.time += STEP;
        self.steps += 1;
    }

    /// Initial camera for this scene.
    pub fn viewpoint(&self) -> Viewpoint {
        match (self.kind, &self.mesh) {
            (SceneKind::Stack, _) => Viewpoint::new(Vec3::new(3.0, -1.6, 1.6), Vec3::new(152.0, -22.0, 0.0)),
            (SceneKind::Spheres, _) => Viewpoint::new(Vec3::new(-3.0, -3.0, 6.0), Vec3::new(45.0, -28.0, 0.0)),
            (SceneKind::Mixed, _) => Viewpoint::new(Vec3::new(0.0, -18.0, 8.0), Vec3::new(90.0, -18.0, 0.0)),
            (SceneKind::Mesh, Some(grid)) => {
                let c = Vec3::new(0.0, 0.0, 2.0);
                let d = grid.size.max_element();
                Viewpoint::new(Vec3::new(c.x, c.y - 2.5 * d, c.z + 1.5 * d), Vec3::new(90.0, -15.0, 0.0))
            }
            (SceneKind::Mesh, None) => Viewpoint::default(),
        }
    }

    /// Applies a scene key. Returns true when the key did something.
    ///
    /// Mixed: space cycles the shape. Mesh: `w`/`s` pick wire or solid,
    /// `+`/`-` grow or shrink the grid, space switches between the
    /// registered mesh and per-frame triangles.
    pub fn command(&mut self, key: char) -> bool {
        if let Some(field) = &mut self.mixed {
            if key == ' ' {
                field.shape = field.shape.next();
                tracing::info!(shape = ?field.shape, "mixed scene shape");
                return true;
            }
            return false;
        }
        let Some(grid) = &mut self.mesh else {
            return false;
        };
        match key {
            'w' => grid.solid = false,
            's' => grid.solid = true,
            '+' => grid.extent = (grid.extent + 1).min(MESH_MAX_EXTENT),
            '-' => grid.extent = grid.extent.saturating_sub(1),
            ' ' => {
                grid.registered = !grid.registered;
                tracing::info!(registered = grid.registered, "mesh scene draw path");
            }
            _ => return false,
        }
        true
    }

    /// One-line description of scene-specific state for the HUD.
    pub fn status(&self) -> Option<String> {
        if let Some(field) = &self.mixed {
            return Some(format!("{} x {:?}", field.bodies.len(), field.shape));
        }
        self.mesh.as_ref().map(|grid| {
            let side = 2 * grid.extent + 1;
            format!(
                "{side}x{side} copies, {}, {}",
                if grid.solid { "solid" } else { "wire" },
                if grid.registered { "registered" } else { "triangles" }
            )
        })
    }

    pub fn draw(&self, f: &mut Frame<'_>) -> Result<(), RenderError> {
        match self.kind {
            SceneKind::Stack => self.draw_stack(f),
            SceneKind::Spheres => self.draw_spheres(f),
            SceneKind::Mixed => self.mixed.as_ref().map_or(Ok(()), |field| field.draw(f)),
            SceneKind::Mesh => self.mesh.as_ref().map_or(Ok(()), |grid| grid.draw(f)),
        }
    }

    fn draw_stack(&self, f: &mut Frame<'_>) -> Result<(), RenderError> {
        let t = self.time;
        let spin = Mat3::from_rotation_z(0.5 * t);

        for i in 0..4 {
            let fi = i as f32;
            f.set_color(1.0, 0.5 + 0.1 * fi, 0.2);
            let pose = Pose::new(Vec3::new(0.0, -1.0, 0.15 + 0.3 * fi), Mat3::from_rotation_z(0.2 * fi));
            f.draw_box(&pose, Vec3::splat(0.3))?;
        }

        f.set_color(0.2, 0.6, 1.0);
        for i in 0..3 {
            let pose = Pose::from_position(Vec3::new(0.8, -0.6 + 0.6 * i as f32, 0.2));
            f.draw_sphere(&pose, 0.2)?;
        }

        f.set_color(0.3, 0.9, 0.3);
        let lying = Pose::new(Vec3::new(-0.8, 0.0, 0.15), spin * Mat3::from_rotation_x(FRAC_PI_2));
        f.draw_cylinder(&lying, 0.6, 0.15)?;
        let tumbling = Pose::new(Vec3::new(0.0, 0.8, 0.6), Mat3::from_rotation_y(t));
        f.draw_capsule(&tumbling, 0.6, 0.15)?;

        f.set_color_alpha(0.6, 0.2, 0.8, 0.8);
        let hull = Pose::new(Vec3::new(-0.8, 0.8, 0.3), spin);
        f.draw_convex(&hull, &HULL_PLANES, &HULL_POINTS, &HULL_POLYGONS)?;

        f.set_color(0.9, 0.9, 0.9);
        let bob = 0.5 + 0.1 * t.sin();
        f.draw_registered_scaled(
            self.octahedron,
            &Pose::new(Vec3::new(0.0, 0.0, bob), spin),
            Vec3::splat(0.25),
            true,
        )?;
        f.draw_registered_scaled(
            self.octahedron,
            &Pose::new(Vec3::new(0.0, 0.0, bob + 0.6), spin.transpose()),
            Vec3::splat(0.2),
            false,
        )?;

        f.set_color_alpha(1.0, 1.0, 1.0, 0.5);
        let panel = Pose::from_position(Vec3::new(-1.5, -0.5, 0.0));
        f.draw_triangle(&panel, Vec3::ZERO, Vec3::new(0.6, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.6), true)?;
        let fan = [
            Vec3::ZERO,
            Vec3::new(0.4, 0.0, 0.3),
            Vec3::new(0.0, 0.4, 0.3),
            Vec3::ZERO,
            Vec3::new(0.0, 0.4, 0.3),
            Vec3::new(-0.4, 0.0, 0.3),
        ];
        f.draw_triangles(&Pose::from_position(Vec3::new(-1.5, 0.8, 0.0)), &fan, false)?;

        for (axis, color) in [(Vec3::X, Vec3::X), (Vec3::Y, Vec3::Y), (Vec3::Z, Vec3::Z)] {
            f.set_color(color.x, color.y, color.z);
            f.draw_line(Vec3::ZERO, axis * 0.5)?;
        }
        Ok(())
    }

    fn draw_spheres(&self, f: &mut Frame<'_>) -> Result<(), RenderError> {
        let t = self.time;
        let side = SPHERE_FIELD_SIDE;
        for i in 0..side * side {
            let (x, y) = ((i % side) as f32, (i / side) as f32);
            let z = 0.15 + 0.1 * ((2.0 * t + 0.2 * x + 0.3 * y).sin() + 1.0);
            f.set_color(x / side as f32, 0.5, y / side as f32);
            let pose = Pose::from_position(Vec3::new(x * SPHERE_SPACING, y * SPHERE_SPACING, z));
            f.draw_sphere(&pose, 0.12)?;
        }
        Ok(())
    }
}
