use std::hint::black_box;
use std::time::Instant;

use physdraw_mesh::quality::{capsule_division, cylinder_slices, sphere_subdivisions};
use physdraw_mesh::{
    WeldConfig, build_capsule, build_creased, build_cylinder, build_icosphere, build_smooth,
};

fn bench_icosphere(quality: u32, iterations: usize) {
    let k = sphere_subdivisions(quality);
    let start = Instant::now();
    let mut triangles = 0;
    for _ in 0..iterations {
        let mesh = build_icosphere(black_box(k)).unwrap();
        triangles = mesh.primitive_count();
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  icosphere (q={quality}, k={k}, {triangles} tris, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_capsule(quality: u32, iterations: usize) {
    let div = capsule_division(quality);
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(build_capsule(black_box(div), WeldConfig::default()).unwrap());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  capsule (q={quality}, div={div}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_cylinder(quality: u32, iterations: usize) {
    let slices = cylinder_slices(quality);
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(build_cylinder(black_box(slices)).unwrap());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  cylinder (q={quality}, {slices} slices, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

/// Grid of `n x n` quads folded along the middle so the crease splits it.
fn folded_grid(n: usize) -> (Vec<f32>, Vec<u32>) {
    let mut positions = Vec::with_capacity((n + 1) * (n + 1) * 3);
    for j in 0..=n {
        for i in 0..=n {
            let x = i as f32 / n as f32;
            let y = j as f32 / n as f32;
            let z = if i <= n / 2 { 0.0 } else { x - 0.5 };
            positions.extend_from_slice(&[x, y, z]);
        }
    }
    let mut indices = Vec::with_capacity(n * n * 6);
    let row = (n + 1) as u32;
    for j in 0..n as u32 {
        for i in 0..n as u32 {
            let a = j * row + i;
            indices.extend_from_slice(&[a, a + 1, a + row + 1, a, a + row + 1, a + row]);
        }
    }
    (positions, indices)
}

fn bench_registered(n: usize, iterations: usize) {
    let (positions, indices) = folded_grid(n);
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(build_smooth(black_box(&positions), black_box(&indices)).unwrap());
    }
    let smooth = start.elapsed() / iterations as u32;

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(
            build_creased(
                black_box(&positions),
                black_box(&indices),
                30.0,
                WeldConfig::default(),
            )
            .unwrap(),
        );
    }
    let creased = start.elapsed() / iterations as u32;
    println!(
        "  registered ({} tris, {iterations} iters): smooth {smooth:?}/iter, creased {creased:?}/iter",
        indices.len() / 3
    );
}

fn main() {
    println!("=== Mesh Build Benchmarks ===\n");

    println!("Icosphere:");
    bench_icosphere(1, 1000);
    bench_icosphere(2, 1000);
    bench_icosphere(3, 500);

    println!("\nCapsule:");
    bench_capsule(1, 1000);
    bench_capsule(2, 200);
    bench_capsule(3, 100);

    println!("\nCylinder:");
    bench_cylinder(1, 10000);
    bench_cylinder(3, 10000);

    println!("\nRegistered mesh:");
    bench_registered(16, 200);
    bench_registered(64, 20);

    println!("\n=== Done ===");
}
