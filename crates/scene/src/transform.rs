//! Scale, rotation and translation of a render item.
//!
//! # Example
//!
//! ```
//! use shapes_scene::Transform;
//! use glam::Vec3;
//!
//! // Box: doubled in size, lifted so it rests on the grid
//! let world = Transform::new()
//!     .with_scale(Vec3::splat(2.0))
//!     .with_position(Vec3::new(0.0, 0.5, 0.0))
//!     .matrix();
//!
//! let top = world.transform_point3(Vec3::new(0.0, 0.25, 0.0));
//! assert!((top.y - 1.0).abs() < 1e-6);
//! ```

use glam::{Mat4, Quat, Vec3};

/// Scale, then rotate, then translate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translation only.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// World matrix (column vectors: `T * R * S`).
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl From<Transform> for Mat4 {
    fn from(transform: Transform) -> Self {
        transform.matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq_vec3(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPSILON
    }

    #[test]
    fn test_transform_default_is_identity() {
        assert_eq!(Transform::default().matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_scale_applies_before_translation() {
        let world = Transform::new()
            .with_scale(Vec3::splat(2.0))
            .with_position(Vec3::new(0.0, 0.5, 0.0))
            .matrix();

        let p = world.transform_point3(Vec3::new(1.0, 1.0, 1.0));
        assert!(approx_eq_vec3(p, Vec3::new(2.0, 2.5, 2.0)));
    }

    #[test]
    fn test_rotation() {
        let world = Transform::new()
            .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2))
            .matrix();
        let p = world.transform_point3(Vec3::X);
        assert!(approx_eq_vec3(p, Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_from_position() {
        let m: Mat4 = Transform::from_position(Vec3::new(-5.0, 1.5, -10.0)).into();
        assert_eq!(m, Mat4::from_translation(Vec3::new(-5.0, 1.5, -10.0)));
    }
}
