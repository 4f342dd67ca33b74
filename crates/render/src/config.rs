use std::path::Path;

use glam::Vec3;
use physdraw_common::Color;
use physdraw_mesh::WeldConfig;
use physdraw_mesh::indexed::DEFAULT_CREASE_DEGREES;
use physdraw_mesh::quality::{DEFAULT_QUALITY, check_quality};
use serde::{Deserialize, Serialize};

use crate::batcher::{DEFAULT_INSTANCE_CAPACITY, MAX_INSTANCE_CAPACITY};
use crate::error::RenderError;

/// Draw context configuration. Every field has a default, so a JSON file
/// only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub sphere_quality: u32,
    pub cylinder_quality: u32,
    pub capsule_quality: u32,
    pub weld: WeldConfig,
    /// Angle above which registered meshes split vertices along an edge.
    pub registered_crease_degrees: f32,
    /// Direction toward the light, not necessarily normalized.
    pub light_direction: Vec3,
    /// Multiplier applied to the ground color under a shadow.
    pub shadow_intensity: f32,
    pub ground_color: Color,
    pub sky_color: Color,
    pub use_textures: bool,
    pub use_shadows: bool,
    /// Instances reserved per mesh list.
    pub instance_capacity: usize,
    /// Draw the 3x3 marker pyramids around the origin.
    pub ground_markers: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sphere_quality: DEFAULT_QUALITY,
            cylinder_quality: DEFAULT_QUALITY,
            capsule_quality: DEFAULT_QUALITY,
            weld: WeldConfig::default(),
            registered_crease_degrees: DEFAULT_CREASE_DEGREES,
            light_direction: Vec3::new(1.0, 0.4, 1.0),
            shadow_intensity: 0.65,
            ground_color: Color::rgb(0.5, 0.5, 0.3),
            sky_color: Color::rgb(0.0, 0.5, 1.0),
            use_textures: true,
            use_shadows: true,
            instance_capacity: DEFAULT_INSTANCE_CAPACITY,
            ground_markers: true,
        }
    }
}

impl RenderConfig {
    /// Reads a JSON configuration file and validates it.
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::info!(path = %path.display(), "loaded render config");
        Ok(config)
    }

    /// Checks every field's range. `DrawContext::new` calls this, so an
    /// invalid configuration never reaches drawing.
    pub fn validate(&self) -> Result<(), RenderError> {
        check_quality(self.sphere_quality)?;
        check_quality(self.cylinder_quality)?;
        check_quality(self.capsule_quality)?;
        if !self.weld.is_valid() {
            return Err(RenderError::Config(format!(
                "weld scales must be finite and positive, got {:?}",
                self.weld
            )));
        }
        if !(0.0..=180.0).contains(&self.registered_crease_degrees) {
            return Err(RenderError::Config(format!(
                "crease angle must be within 0..=180 degrees, got {}",
                self.registered_crease_degrees
            )));
        }
        if !(0.0..=1.0).contains(&self.shadow_intensity) {
            return Err(RenderError::Config(format!(
                "shadow intensity must be within 0..=1, got {}",
                self.shadow_intensity
            )));
        }
        if !self.light_direction.is_finite() || self.light_direction == Vec3::ZERO {
            return Err(RenderError::Config(
                "light direction must be a finite non-zero vector".into(),
            ));
        }
        if !(1..=MAX_INSTANCE_CAPACITY).contains(&self.instance_capacity) {
            return Err(RenderError::Config(format!(
                "instance capacity must be within 1..={MAX_INSTANCE_CAPACITY}, got {}",
                self.instance_capacity
            )));
        }
        Ok(())
    }
}
