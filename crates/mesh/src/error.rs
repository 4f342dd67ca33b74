/// Errors from mesh construction. All of them are raised while a mesh is
/// being built; a mesh that made it into a cache is valid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("subdivision count must be at least 1, got {0}")]
    InvalidSubdivision(u32),
    #[error("capsule face division must be even and non-zero, got {0}")]
    OddCapsuleDivision(u32),
    #[error("cylinder needs at least 3 slices, got {0}")]
    TooFewSlices(u32),
    #[error("quality must be in {min}..={max}, got {quality}")]
    InvalidQuality { quality: u32, min: u32, max: u32 },
    #[error("position array length {0} is not a multiple of 3")]
    MalformedPositions(usize),
    #[error("plane array length {0} is not a multiple of 4")]
    MalformedPlanes(usize),
    #[error("index array length {len} is not a multiple of {stride}")]
    MalformedIndices { len: usize, stride: usize },
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}
