use crate::error::MeshError;

/// Coarsest tessellation level.
pub const MIN_QUALITY: u32 = 1;
pub const MAX_QUALITY: u32 = 3;
pub const DEFAULT_QUALITY: u32 = 3;

/// Passes `quality` through if it lies in `MIN_QUALITY..=MAX_QUALITY`.
pub fn check_quality(quality: u32) -> Result<u32, MeshError> {
    if (MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
        Ok(quality)
    } else {
        Err(MeshError::InvalidQuality {
            quality,
            min: MIN_QUALITY,
            max: MAX_QUALITY,
        })
    }
}

/// Icosphere edge subdivisions for a quality level.
pub fn sphere_subdivisions(quality: u32) -> u32 {
    quality + 1
}

/// Cube-face grid cells per edge for a capsule quality level. Always even.
pub fn capsule_division(quality: u32) -> u32 {
    4 * quality
}

/// Side segments for a cylinder quality level: 12, 24, 48.
pub fn cylinder_slices(quality: u32) -> u32 {
    6 * 2u32.pow(quality)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_range() {
        assert!(check_quality(0).is_err());
        assert_eq!(check_quality(1), Ok(1));
        assert_eq!(check_quality(3), Ok(3));
        assert!(check_quality(4).is_err());
    }

    #[test]
    fn quality_mappings() {
        assert_eq!(sphere_subdivisions(3), 4);
        assert_eq!(
            [1, 2, 3].map(cylinder_slices),
            [12, 24, 48]
        );
        for q in MIN_QUALITY..=MAX_QUALITY {
            assert_eq!(capsule_division(q) % 2, 0);
        }
    }
}
