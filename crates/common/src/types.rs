use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Rigid placement of a body: world position plus a 3x3 rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Mat3,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Mat3::IDENTITY,
        }
    }
}

impl Pose {
    pub fn new(position: Vec3, rotation: Mat3) -> Self {
        Self { position, rotation }
    }

    /// Pose at `position` with identity rotation.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Builds a pose from the physics engine's layout: a position and a
    /// row-major 3x4 rotation where `r[row * 4 + col]` and the fourth column
    /// of each row is padding.
    pub fn from_ode(position: [f32; 3], r: &[f32; 12]) -> Self {
        let rotation = Mat3::from_cols(
            Vec3::new(r[0], r[4], r[8]),
            Vec3::new(r[1], r[5], r[9]),
            Vec3::new(r[2], r[6], r[10]),
        );
        Self {
            position: Vec3::from_array(position),
            rotation,
        }
    }

    /// Double-precision variant of [`Pose::from_ode`].
    pub fn from_ode_f64(position: [f64; 3], r: &[f64; 12]) -> Self {
        let p = position.map(|v| v as f32);
        let mut rf = [0.0_f32; 12];
        for (dst, src) in rf.iter_mut().zip(r.iter()) {
            *dst = *src as f32;
        }
        Self::from_ode(p, &rf)
    }

    /// Rotation and translation without scale.
    pub fn matrix(&self) -> Mat4 {
        let mut m = Mat4::from_mat3(self.rotation);
        m.w_axis = self.position.extend(1.0);
        m
    }

    /// Pose matrix followed by a local scale, e.g. box sides or (r, r, l/2).
    pub fn model_matrix(&self, scale: Vec3) -> Mat4 {
        self.matrix() * Mat4::from_scale(scale)
    }

    /// Maps a local point to world space.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.position
    }
}

/// Linear RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn is_opaque(&self) -> bool {
        self.a >= 1.0
    }
}
