//! Draw context: renderer-agnostic recording and submission of debug
//! geometry.
//!
//! Callers describe a frame through [`DrawContext::render_frame`]; every
//! primitive becomes an instance of a cached mesh, and each mesh's instances
//! go to the backend in one call per pass.
//!
//! # Invariants
//! - Draws are only accepted while a frame is open.
//! - One draw call per non-empty mesh list per pass; the shadow pass reuses
//!   the lit pass's lists unchanged.
//! - Instance lists are empty and the frame closed when `render_frame`
//!   returns, whether or not drawing failed.
//! - Cached meshes are immutable; transient meshes die with their frame.

mod backend;
mod batcher;
mod cache;
mod config;
mod context;
mod error;
mod shadow;

pub use backend::{DrawCall, FrameParams, Pass, RecordingBackend, RenderBackend, Submission};
pub use batcher::{DEFAULT_INSTANCE_CAPACITY, InstanceBatcher, InstanceRecord, MAX_INSTANCE_CAPACITY};
pub use cache::{MeshCache, MeshHandle, MeshKey};
pub use config::RenderConfig;
pub use context::{DrawContext, Frame, FrameInputs, FrameStats};
pub use error::RenderError;
pub use shadow::{LIGHT_EPSILON, ShadowProjector};

pub fn crate_info() -> &'static str {
    "physdraw-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
