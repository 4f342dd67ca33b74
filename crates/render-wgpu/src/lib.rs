//! wgpu render backend for the draw context.
//!
//! Draws the ground plane, then every lit submission, then the shadow
//! submissions flattened onto the ground. Also provides the z-up
//! [`Viewpoint`] camera used by the viewer.
//!
//! # Invariants
//! - One `draw_indexed` per submission, instanced over its whole list.
//! - A frame's instances reach the GPU in one buffer write.
//! - Cached meshes are uploaded once per renderer.

mod camera;
mod gpu;
mod shaders;

pub use camera::{MouseMode, Viewpoint, projection_matrix};
pub use gpu::{GpuFrame, WgpuRenderer};

pub fn crate_info() -> &'static str {
    "physdraw-render-wgpu v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("wgpu"));
    }
}
