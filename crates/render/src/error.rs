use physdraw_mesh::MeshError;

use crate::cache::MeshHandle;

/// Errors from the draw context. Any of them reaching an application's
/// `main` ends the process.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("mesh construction failed: {0}")]
    Mesh(#[from] MeshError),
    #[error("draw recorded outside an active frame")]
    OutsideFrame,
    #[error("a frame is already in progress")]
    FrameAlreadyOpen,
    #[error("unknown mesh handle {0:?}")]
    UnknownMesh(MeshHandle),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
