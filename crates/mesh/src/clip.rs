use glam::Vec3;

/// Output vertex of a half-space clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipVertex {
    pub position: Vec3,
    /// True when the vertex was created on the plane by an edge crossing.
    pub created: bool,
}

/// Clips a convex polygon against `dot(normal, p) >= offset`
/// (Sutherland-Hodgman, single plane). Input order and winding are kept.
/// Vertices lying on the plane count as inside; fewer than three output
/// vertices means nothing of area survived.
pub fn clip_to_half_space(polygon: &[Vec3], normal: Vec3, offset: f32) -> Vec<ClipVertex> {
    let n = polygon.len();
    let mut out = Vec::with_capacity(n + 1);
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        let da = normal.dot(a) - offset;
        let db = normal.dot(b) - offset;
        if da >= 0.0 {
            out.push(ClipVertex {
                position: a,
                created: false,
            });
        }
        if (da > 0.0 && db < 0.0) || (da < 0.0 && db > 0.0) {
            let t = da / (da - db);
            out.push(ClipVertex {
                position: a + (b - a) * t,
                created: true,
            });
        }
    }
    out
}
