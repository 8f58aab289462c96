//! Light records.
//!
//! One layout serves directional, point and spot lights; the shader decides
//! which fields to read.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Capacity of the light array in the pass constants.
pub const MAX_LIGHTS: usize = 16;

/// GPU light record, 48 bytes.
///
/// | Offset | Field |
/// |--------|-------|
/// | 0      | strength |
/// | 12     | falloff_start |
/// | 16     | direction |
/// | 28     | falloff_end |
/// | 32     | position |
/// | 44     | spot_power |
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Light {
    pub strength: Vec3,
    pub falloff_start: f32,
    pub direction: Vec3,
    pub falloff_end: f32,
    pub position: Vec3,
    pub spot_power: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            strength: Vec3::splat(0.5),
            falloff_start: 1.0,
            direction: Vec3::new(0.0, -1.0, 0.0),
            falloff_end: 10.0,
            position: Vec3::ZERO,
            spot_power: 64.0,
        }
    }
}

impl Light {
    /// White light at `position` aimed at the origin.
    pub fn pointed_at_origin(position: Vec3, falloff_end: f32, spot_power: f32) -> Self {
        Self {
            strength: Vec3::ONE,
            falloff_start: 0.0,
            direction: (-position).normalize_or_zero(),
            falloff_end,
            position,
            spot_power,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_layout() {
        assert_eq!(std::mem::size_of::<Light>(), 48);
        assert_eq!(std::mem::offset_of!(Light, direction), 16);
        assert_eq!(std::mem::offset_of!(Light, position), 32);
        assert_eq!(std::mem::offset_of!(Light, spot_power), 44);
    }

    #[test]
    fn test_pointed_at_origin() {
        let light = Light::pointed_at_origin(Vec3::new(0.0, 3.0, -4.0), 50.0, 0.3);
        assert!((light.direction - Vec3::new(0.0, -0.6, 0.8)).length() < 1e-6);
        assert_eq!(light.falloff_start, 0.0);
        assert_eq!(light.strength, Vec3::ONE);
    }

    #[test]
    fn test_pointed_at_origin_from_origin() {
        let light = Light::pointed_at_origin(Vec3::ZERO, 1.0, 1.0);
        assert_eq!(light.direction, Vec3::ZERO);
    }
}
