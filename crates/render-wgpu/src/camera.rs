use glam::{Mat4, Vec3};

const NEAR: f32 = 0.1;
const FAR: f32 = 100.0;
/// Half-extent of the frustum on the larger window axis, at unit distance.
const FRUSTUM_K: f32 = 0.8;

/// What a mouse drag does to the viewpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMode {
    /// Left button: turn heading and pitch.
    Rotate,
    /// Right button: pan sideways and move along the heading.
    Pan,
    /// Middle button, or left and right together: pan sideways and move in z.
    Lift,
}

impl MouseMode {
    /// Mode for the set of held buttons, if any drag applies.
    pub fn from_buttons(left: bool, middle: bool, right: bool) -> Option<Self> {
        match (left, middle, right) {
            (true, _, true) | (_, true, _) => Some(Self::Lift),
            (true, false, false) => Some(Self::Rotate),
            (false, false, true) => Some(Self::Pan),
            _ => None,
        }
    }
}

/// Z-up camera described by a position and heading/pitch/roll in degrees.
///
/// Heading 0 looks along +X; heading 90 along +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewpoint {
    pub xyz: Vec3,
    pub hpr: Vec3,
}

impl Default for Viewpoint {
    fn default() -> Self {
        Self {
            xyz: Vec3::new(2.0, 0.0, 1.0),
            hpr: Vec3::new(180.0, 0.0, 0.0),
        }
    }
}

/// Maps an angle into (-180, 180]. Non-finite input resets to 0.
fn wrap_degrees(a: f32) -> f32 {
    if !a.is_finite() {
        return 0.0;
    }
    let a = a.rem_euclid(360.0);
    if a > 180.0 { a - 360.0 } else { a }
}

impl Viewpoint {
    /// Viewpoint with its angles wrapped into (-180, 180].
    pub fn new(xyz: Vec3, hpr: Vec3) -> Self {
        let mut v = Self { xyz, hpr };
        v.wrap_angles();
        v
    }

    /// Re-wraps heading, pitch and roll after direct edits to `hpr`.
    pub fn wrap_angles(&mut self) {
        self.hpr = Vec3::new(
            wrap_degrees(self.hpr.x),
            wrap_degrees(self.hpr.y),
            wrap_degrees(self.hpr.z),
        );
    }

    /// Applies a mouse drag of (`dx`, `dy`) pixels.
    pub fn motion(&mut self, mode: MouseMode, dx: f32, dy: f32) {
        let side = 0.01 * dx;
        let forward = if mode == MouseMode::Pan { 0.01 * dy } else { 0.0 };
        let (s, c) = self.hpr.x.to_radians().sin_cos();

        match mode {
            MouseMode::Rotate => {
                self.hpr.x += dx * 0.5;
                self.hpr.y += dy * 0.5;
            }
            MouseMode::Pan | MouseMode::Lift => {
                self.xyz.x += -s * side + c * forward;
                self.xyz.y += c * side + s * forward;
                if mode == MouseMode::Lift {
                    self.xyz.z += 0.01 * dy;
                }
            }
        }
        self.wrap_angles();
    }

    /// World-to-eye transform: the eye looks down -Z with +Y up.
    pub fn view_matrix(&self) -> Mat4 {
        let [h, p, r] = self.hpr.to_array().map(f32::to_radians);
        Mat4::from_rotation_z(90f32.to_radians())
            * Mat4::from_rotation_y(90f32.to_radians())
            * Mat4::from_rotation_x(r)
            * Mat4::from_rotation_y(p)
            * Mat4::from_rotation_z(-h)
            * Mat4::from_translation(-self.xyz)
    }

    /// Position and angles on one line, as printed by the viewer.
    pub fn describe(&self) -> String {
        format!(
            "xyz=({:.4}, {:.4}, {:.4}) hpr=({:.4}, {:.4}, {:.4})",
            self.xyz.x, self.xyz.y, self.xyz.z, self.hpr.x, self.hpr.y, self.hpr.z
        )
    }
}

/// Perspective projection for a window of `width` x `height` pixels, with
/// depth mapped to 0..1.
pub fn projection_matrix(width: u32, height: u32) -> Mat4 {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    // half-height of the frustum at unit distance
    let top = if w >= h { FRUSTUM_K * h / w } else { FRUSTUM_K };
    Mat4::perspective_rh(2.0 * top.atan(), w / h, NEAR, FAR)
}
