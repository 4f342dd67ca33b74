use glam::{Mat4, Vec3, Vec4};

/// Smallest |Lz| accepted before projecting along the light.
pub const LIGHT_EPSILON: f32 = 1e-3;

/// Flattens geometry onto the ground plane z = 0 along a directional light.
///
/// The light vector points toward the light. With `Lz` rescaled to 1,
/// `P * (x, y, z, 1) = (x - Lx * z, y - Ly * z, 0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowProjector {
    light: Vec3,
    matrix: Mat4,
}

impl ShadowProjector {
    /// Projector for a light vector pointing toward the light.
    pub fn new(light: Vec3) -> Self {
        let mut lz = light.z;
        if lz.abs() < LIGHT_EPSILON {
            tracing::warn!(lz, "light nearly horizontal, clamping for shadow projection");
            lz = LIGHT_EPSILON.copysign(lz);
        }
        let lx = light.x / lz;
        let ly = light.y / lz;
        let matrix = Mat4::from_cols(
            Vec4::new(1.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 1.0, 0.0, 0.0),
            Vec4::new(-lx, -ly, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 0.0, 1.0),
        );
        Self {
            light: Vec3::new(lx, ly, 1.0),
            matrix,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Light vector with z rescaled to 1.
    pub fn light(&self) -> Vec3 {
        self.light
    }

    /// Unit vector toward the light, for shading.
    pub fn light_direction(&self) -> Vec3 {
        self.light.normalize()
    }

    /// Shadow position of `p` on the ground plane.
    pub fn project_point(&self, p: Vec3) -> Vec3 {
        self.matrix.transform_point3(p)
    }
}

impl Default for ShadowProjector {
    fn default() -> Self {
        Self::new(Vec3::new(1.0, 0.4, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_onto_ground() {
        let shadow = ShadowProjector::new(Vec3::new(1.0, 0.4, 1.0));
        let p = shadow.project_point(Vec3::new(0.0, 0.0, 2.0));
        assert!((p - Vec3::new(-2.0, -0.8, 0.0)).length() < 1e-6);
    }

    #[test]
    fn ground_points_are_fixed() {
        let shadow = ShadowProjector::default();
        let p = Vec3::new(3.0, -1.5, 0.0);
        assert_eq!(shadow.project_point(p), p);
    }

    #[test]
    fn projection_is_along_light() {
        let light = Vec3::new(0.5, -0.25, 2.0);
        let shadow = ShadowProjector::new(light);
        let p = Vec3::new(1.0, 2.0, 3.0);
        let q = shadow.project_point(p);
        assert_eq!(q.z, 0.0);
        let along = (p - q).normalize();
        assert!((along - light.normalize()).length() < 1e-5);
    }

    #[test]
    fn scale_of_light_does_not_matter() {
        let a = ShadowProjector::new(Vec3::new(1.0, 0.4, 1.0));
        let b = ShadowProjector::new(Vec3::new(2.0, 0.8, 2.0));
        assert_eq!(a.matrix(), b.matrix());
    }

    #[test]
    fn horizontal_light_is_clamped() {
        let shadow = ShadowProjector::new(Vec3::new(1.0, 0.0, 0.0));
        let m = shadow.matrix();
        assert!(m.is_finite());
        assert!((shadow.light().x - 1.0 / LIGHT_EPSILON).abs() < 1.0);

        let below = ShadowProjector::new(Vec3::new(1.0, 0.0, -1e-6));
        assert!(below.light().x < 0.0);
    }
}
