//! Shared types for the physdraw workspace.
//!
//! Poses arrive from the physics engine in its own row-major 3x4 rotation
//! layout; everything downstream works with `glam` column-major matrices.

mod types;

pub use types::{Color, Pose};

pub fn crate_info() -> &'static str {
    "physdraw-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
