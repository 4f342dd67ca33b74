use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use glam::{Mat3, Mat4, Vec3};
use physdraw_common::Pose;
use physdraw_mesh::quality::{
    MAX_QUALITY, MIN_QUALITY, capsule_division, check_quality, cylinder_slices, sphere_subdivisions,
};
use physdraw_mesh::topology::{self, TopologyReport};
use physdraw_mesh::{Mesh, build_box, build_capsule, build_cylinder, build_icosphere, build_pyramid};
use physdraw_render::{DrawContext, FrameInputs, Pass, RecordingBackend, RenderConfig, RenderError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "physdraw-cli", about = "Inspect and exercise the physdraw mesh and batching core")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON render configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Print vertex, triangle and edge statistics for a built-in mesh
    Mesh {
        #[arg(value_enum)]
        kind: MeshKind,
        /// Quality level
        #[arg(short, long, default_value = "3")]
        quality: u32,
    },
    /// Build every built-in mesh at every quality and check its topology
    Validate,
    /// Run frames against the recording backend and print the submissions
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "3")]
        frames: u64,
        /// Spheres drawn per frame
        #[arg(short = 'n', long, default_value = "1000")]
        instances: usize,
        /// Skip the shadow pass
        #[arg(long)]
        no_shadows: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MeshKind {
    Box,
    Sphere,
    Cylinder,
    Capsule,
    Pyramid,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<RenderConfig> {
    match path {
        Some(p) => RenderConfig::load(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(RenderConfig::default()),
    }
}

fn print_report(name: &str, r: &TopologyReport) {
    println!(
        "{name}: vertices={} triangles={} edges={} boundary={} closed={} volume={:.4}",
        r.vertices,
        r.triangles,
        r.edges,
        r.boundary_edges,
        r.is_closed_manifold(),
        r.signed_volume
    );
}

fn built_meshes(kind: MeshKind, quality: u32, config: &RenderConfig) -> anyhow::Result<Vec<(String, Mesh)>> {
    let q = check_quality(quality)?;
    let meshes = match kind {
        MeshKind::Box => vec![("box".to_string(), build_box())],
        MeshKind::Pyramid => vec![("pyramid".to_string(), build_pyramid())],
        MeshKind::Sphere => {
            let k = sphere_subdivisions(q);
            vec![(format!("sphere k={k}"), build_icosphere(k)?)]
        }
        MeshKind::Cylinder => {
            let slices = cylinder_slices(q);
            vec![(format!("cylinder slices={slices}"), build_cylinder(slices)?)]
        }
        MeshKind::Capsule => {
            let div = capsule_division(q);
            let parts = build_capsule(div, config.weld)?;
            let assembled = parts.assembled(config.weld);
            vec![
                (format!("capsule band div={div}"), parts.band),
                (format!("capsule cap top div={div}"), parts.cap_top),
                (format!("capsule cap bottom div={div}"), parts.cap_bottom),
                (format!("capsule assembled div={div}"), assembled),
            ]
        }
    };
    Ok(meshes)
}

struct Checks {
    failures: Vec<String>,
}

impl Checks {
    fn check(&mut self, name: String, ok: bool) {
        println!("  [{}] {name}", if ok { "ok" } else { "FAIL" });
        if !ok {
            self.failures.push(name);
        }
    }
}

fn validate(config: &RenderConfig) -> anyhow::Result<()> {
    let mut checks = Checks { failures: Vec::new() };

    println!("box / pyramid");
    let b = build_box();
    checks.check("box indices".into(), b.validate().is_ok());
    checks.check("box has 12 triangles".into(), b.primitive_count() == 12);
    checks.check("pyramid indices".into(), build_pyramid().validate().is_ok());

    for q in MIN_QUALITY..=MAX_QUALITY {
        println!("quality {q}");

        let k = sphere_subdivisions(q);
        let sphere = build_icosphere(k)?;
        let r = topology::analyze(&sphere);
        checks.check(format!("sphere k={k} indices"), sphere.validate().is_ok());
        checks.check(format!("sphere k={k} closed manifold"), r.is_closed_manifold());
        let euler = r.vertices as i64 - r.edges as i64 + r.triangles as i64;
        checks.check(format!("sphere k={k} euler characteristic 2"), euler == 2);
        checks.check(format!("sphere k={k} outward"), r.signed_volume > 0.0);

        let slices = cylinder_slices(q);
        let cylinder = build_cylinder(slices)?;
        checks.check(format!("cylinder slices={slices} indices"), cylinder.validate().is_ok());
        checks.check(
            format!("cylinder slices={slices} triangle count"),
            cylinder.primitive_count() == 4 * slices as usize,
        );

        let div = capsule_division(q);
        let parts = build_capsule(div, config.weld)?;
        for (name, cap) in [("top", &parts.cap_top), ("bottom", &parts.cap_bottom)] {
            let r = topology::analyze(cap);
            checks.check(format!("capsule div={div} {name} cap indices"), cap.validate().is_ok());
            checks.check(
                format!("capsule div={div} {name} cap rim"),
                r.boundary_edges == 4 * div as usize && r.non_manifold_edges == 0,
            );
        }
        checks.check(format!("capsule div={div} band indices"), parts.band.validate().is_ok());
        let assembled = parts.assembled(config.weld);
        checks.check(
            format!("capsule div={div} seam closed"),
            topology::is_closed_manifold(&assembled),
        );
    }

    if !checks.failures.is_empty() {
        bail!("{} check(s) failed: {}", checks.failures.len(), checks.failures.join(", "));
    }
    println!("all checks passed");
    Ok(())
}

fn simulate(mut config: RenderConfig, frames: u64, instances: usize, no_shadows: bool) -> anyhow::Result<()> {
    if no_shadows {
        config.use_shadows = false;
    }
    let view = Mat4::look_at_rh(Vec3::new(6.0, -6.0, 4.0), Vec3::ZERO, Vec3::Z);
    let projection = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
    let inputs = FrameInputs::from_config(&config, view, projection);

    let mut ctx = DrawContext::new(config)?;
    let mut backend = RecordingBackend::new();
    let side = (instances as f32).sqrt().ceil().max(1.0) as usize;

    for frame in 0..frames {
        let t = frame as f32 * 0.1;
        let stats = ctx.render_frame(&inputs, &mut backend, |f| {
            f.set_color(0.2, 0.6, 1.0);
            for i in 0..instances {
                let (x, y) = ((i % side) as f32, (i / side) as f32);
                let z = 1.0 + 0.5 * (t + 0.3 * x).sin();
                f.draw_sphere(&Pose::from_position(Vec3::new(x * 0.3, y * 0.3, z)), 0.1)?;
            }
            let spin = Pose::new(Vec3::new(-1.0, 0.0, 0.6), Mat3::from_rotation_z(t));
            f.set_color(1.0, 0.8, 0.0);
            f.draw_box(&spin, Vec3::new(0.4, 0.3, 0.2))?;
            f.set_color(0.0, 1.0, 0.4);
            f.draw_capsule(&Pose::from_position(Vec3::new(-2.0, 0.0, 0.7)), 0.8, 0.2)?;
            f.draw_cylinder(&Pose::from_position(Vec3::new(-3.0, 0.0, 0.5)), 1.0, 0.25)?;
            f.set_color(1.0, 1.0, 1.0);
            f.draw_line(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0))?;
            Ok::<(), RenderError>(())
        })?;
        println!(
            "frame {}: lit={} shadow={} instances={} time={:?}",
            stats.frame, stats.lit_draws, stats.shadow_draws, stats.instances, stats.frame_time
        );
    }

    println!();
    print!("{}", backend.summary());
    println!(
        "lit submissions={} shadow submissions={}",
        backend.count(Pass::Lit),
        backend.count(Pass::Shadow)
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = load_config(cli.config.as_ref())?;
    tracing::debug!(?config, "physdraw-cli starting");

    match cli.command {
        Commands::Info => {
            println!("physdraw-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", physdraw_common::crate_info());
            println!("mesh: {}", physdraw_mesh::crate_info());
            println!("render: {}", physdraw_render::crate_info());
            println!(
                "qualities: {MIN_QUALITY}..={MAX_QUALITY}, default sphere={} cylinder={} capsule={}",
                config.sphere_quality, config.cylinder_quality, config.capsule_quality
            );
        }
        Commands::Mesh { kind, quality } => {
            for (name, mesh) in built_meshes(kind, quality, &config)? {
                print_report(&name, &topology::analyze(&mesh));
            }
        }
        Commands::Validate => validate(&config)?,
        Commands::Simulate {
            frames,
            instances,
            no_shadows,
        } => simulate(config, frames, instances, no_shadows)?,
    }

    Ok(())
}
