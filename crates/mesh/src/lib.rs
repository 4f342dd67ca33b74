//! Mesh generation: every vertex buffer the debug renderer draws is built
//! here, on the CPU, once.
//!
//! # Invariants
//! - Curved primitives are welded: shared points have one index, so the
//!   icosphere is a closed 2-manifold and capsule caps have one boundary loop.
//! - Icosphere edge points are generated from the lower-indexed endpoint, so
//!   neighbouring faces see bit-identical positions.
//! - Capsule band rims and cap rims trace the same equator points.
//! - Box and cylinder are face-duplicated for flat shading.
//! - Normals are unit length when construction returns.

pub mod capsule;
pub mod clip;
pub mod convex;
mod error;
pub mod icosphere;
pub mod indexed;
mod mesh;
pub mod quality;
pub mod shapes;
pub mod topology;
pub mod weld;

pub use capsule::{CapsuleParts, build_capsule};
pub use convex::build_convex;
pub use error::MeshError;
pub use icosphere::{build_icosphere, build_icosphere_with_face_order};
pub use indexed::{build_creased, build_smooth};
pub use mesh::{Mesh, Topology, Vertex};
pub use shapes::{build_box, build_cylinder, build_pyramid, build_unit_line, build_unit_triangle};
pub use topology::TopologyReport;
pub use weld::{EdgeChainTable, WeldConfig, WeldTable};

pub fn crate_info() -> &'static str {
    "physdraw-mesh v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("mesh"));
    }
}
