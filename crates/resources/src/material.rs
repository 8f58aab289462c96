//! Surface material records.

use glam::{Mat4, Vec3, Vec4};

/// Surface parameters of a lit material.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse_albedo: Vec4,
    /// Reflectance at normal incidence.
    pub fresnel_r0: Vec3,
    /// 0 is perfectly smooth, 1 is fully rough.
    pub roughness: f32,
    /// Texture-coordinate transform.
    pub transform: Mat4,
}

impl Material {
    pub fn new(
        name: impl Into<String>,
        diffuse_albedo: Vec4,
        fresnel_r0: Vec3,
        roughness: f32,
    ) -> Self {
        Self {
            name: name.into(),
            diffuse_albedo,
            fresnel_r0,
            roughness,
            transform: Mat4::IDENTITY,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default", Vec4::ONE, Vec3::splat(0.01), 0.5)
    }
}

/// The four materials of the shapes scene, in constant-buffer order:
/// box, grid, cylinder, sphere.
pub fn shapes_materials() -> Vec<Material> {
    vec![
        Material::new(
            "box",
            Vec4::new(0.2, 0.6, 0.2, 1.0),
            Vec3::splat(0.01),
            0.125,
        ),
        Material::new(
            "grid",
            Vec4::new(0.5, 0.1, 0.8, 1.0),
            Vec3::splat(0.1),
            0.0,
        ),
        Material::new(
            "cylinder",
            Vec4::new(0.1, 0.1, 0.1, 1.0),
            Vec3::new(0.1, 0.5, 0.1),
            0.3,
        ),
        Material::new(
            "sphere",
            Vec4::new(0.9, 0.9, 0.9, 1.0),
            Vec3::splat(0.5),
            0.8,
        ),
    ]
}
