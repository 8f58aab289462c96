//! Constant record layouts read by the shapes shaders.
//!
//! All records are `#[repr(C)]` and `Pod` so they can be copied into constant
//! buffers as raw bytes. Matrices are stored column-major, which is what the
//! GLSL side expects, so no transposes happen on upload.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};
use shapes_resources::Material;
use shapes_scene::{Light, MAX_LIGHTS, OrbitCamera, RenderItem};

/// Per-object record (128 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
    pub world: Mat4,
    pub tex_transform: Mat4,
}

impl Default for ObjectConstants {
    fn default() -> Self {
        Self {
            world: Mat4::IDENTITY,
            tex_transform: Mat4::IDENTITY,
        }
    }
}

impl From<&RenderItem> for ObjectConstants {
    fn from(item: &RenderItem) -> Self {
        Self {
            world: item.world(),
            tex_transform: item.tex_transform(),
        }
    }
}

/// Per-material record (96 bytes).
///
/// | Offset | Field |
/// |--------|-------|
/// | 0      | diffuse_albedo |
/// | 16     | fresnel_r0 |
/// | 28     | roughness |
/// | 32     | mat_transform |
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialConstants {
    pub diffuse_albedo: Vec4,
    pub fresnel_r0: Vec3,
    pub roughness: f32,
    pub mat_transform: Mat4,
}

impl Default for MaterialConstants {
    fn default() -> Self {
        Self::from(&Material::default())
    }
}

impl From<&Material> for MaterialConstants {
    fn from(material: &Material) -> Self {
        Self {
            diffuse_albedo: material.diffuse_albedo,
            fresnel_r0: material.fresnel_r0,
            roughness: material.roughness,
            mat_transform: material.transform,
        }
    }
}

/// Per-pass record (1216 bytes).
///
/// | Offset | Field |
/// |--------|-------|
/// | 0      | view, inv_view, proj, inv_proj, view_proj, inv_view_proj |
/// | 384    | eye_pos_w |
/// | 400    | render_target_size, inv_render_target_size |
/// | 416    | near_z, far_z, total_time, delta_time |
/// | 432    | ambient_light |
/// | 448    | lights |
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PassConstants {
    pub view: Mat4,
    pub inv_view: Mat4,
    pub proj: Mat4,
    pub inv_proj: Mat4,
    pub view_proj: Mat4,
    pub inv_view_proj: Mat4,
    pub eye_pos_w: Vec3,
    pub _pad0: f32,
    pub render_target_size: Vec2,
    pub inv_render_target_size: Vec2,
    pub near_z: f32,
    pub far_z: f32,
    pub total_time: f32,
    pub delta_time: f32,
    pub ambient_light: Vec4,
    pub lights: [Light; MAX_LIGHTS],
}

impl Default for PassConstants {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Everything a pass record is derived from besides the camera.
#[derive(Clone, Copy, Debug)]
pub struct PassInputs<'a> {
    pub render_width: u32,
    pub render_height: u32,
    pub total_time: f32,
    pub delta_time: f32,
    pub ambient_light: Vec4,
    pub lights: &'a [Light],
}

impl PassConstants {
    /// Recomputes the whole record. Lights past [`MAX_LIGHTS`] are dropped.
    pub fn new(camera: &OrbitCamera, inputs: &PassInputs<'_>) -> Self {
        let view = camera.view();
        let proj = camera.proj();
        let view_proj = proj * view;

        let size = Vec2::new(
            inputs.render_width.max(1) as f32,
            inputs.render_height.max(1) as f32,
        );

        let mut lights = [Light::zeroed(); MAX_LIGHTS];
        for (slot, light) in lights.iter_mut().zip(inputs.lights) {
            *slot = *light;
        }

        Self {
            view,
            inv_view: view.inverse(),
            proj,
            inv_proj: proj.inverse(),
            view_proj,
            inv_view_proj: view_proj.inverse(),
            eye_pos_w: camera.eye_position(),
            _pad0: 0.0,
            render_target_size: size,
            inv_render_target_size: size.recip(),
            near_z: camera.near(),
            far_z: camera.far(),
            total_time: inputs.total_time,
            delta_time: inputs.delta_time,
            ambient_light: inputs.ambient_light,
            lights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapes_core::CameraConfig;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_object_constants_layout() {
        assert_eq!(size_of::<ObjectConstants>(), 128);
        assert_eq!(offset_of!(ObjectConstants, tex_transform), 64);
    }

    #[test]
    fn test_material_constants_layout() {
        assert_eq!(size_of::<MaterialConstants>(), 96);
        assert_eq!(offset_of!(MaterialConstants, fresnel_r0), 16);
        assert_eq!(offset_of!(MaterialConstants, roughness), 28);
        assert_eq!(offset_of!(MaterialConstants, mat_transform), 32);
    }

    #[test]
    fn test_pass_constants_layout() {
        assert_eq!(size_of::<PassConstants>(), 1216);
        assert_eq!(offset_of!(PassConstants, eye_pos_w), 384);
        assert_eq!(offset_of!(PassConstants, render_target_size), 400);
        assert_eq!(offset_of!(PassConstants, near_z), 416);
        assert_eq!(offset_of!(PassConstants, ambient_light), 432);
        assert_eq!(offset_of!(PassConstants, lights), 448);
    }

    #[test]
    fn test_material_constants_from_material() {
        let material = Material::new("m", Vec4::new(0.1, 0.2, 0.3, 1.0), Vec3::splat(0.05), 0.7);
        let constants = MaterialConstants::from(&material);
        assert_eq!(constants.diffuse_albedo, material.diffuse_albedo);
        assert_eq!(constants.fresnel_r0, material.fresnel_r0);
        assert_eq!(constants.roughness, 0.7);
        assert_eq!(constants.mat_transform, Mat4::IDENTITY);
    }

    #[test]
    fn test_pass_constants_new() {
        let camera = OrbitCamera::new(&CameraConfig::default(), 2.0);
        let lights = [Light::pointed_at_origin(Vec3::new(5.0, 3.5, 0.0), 50.0, 0.3); 3];
        let pass = PassConstants::new(
            &camera,
            &PassInputs {
                render_width: 800,
                render_height: 400,
                total_time: 1.5,
                delta_time: 0.016,
                ambient_light: Vec4::new(0.25, 0.25, 0.35, 1.0),
                lights: &lights,
            },
        );

        assert_eq!(pass.render_target_size, Vec2::new(800.0, 400.0));
        assert_eq!(pass.inv_render_target_size, Vec2::new(1.0 / 800.0, 1.0 / 400.0));
        assert_eq!(pass.near_z, 1.0);
        assert_eq!(pass.far_z, 1000.0);
        assert_eq!(pass.total_time, 1.5);
        assert_eq!(pass.eye_pos_w, camera.eye_position());
        assert!((pass.view * pass.inv_view).abs_diff_eq(Mat4::IDENTITY, 1e-4));
        assert_eq!(pass.view_proj, pass.proj * pass.view);
        assert_eq!(pass.lights[2], lights[2]);
        assert_eq!(pass.lights[3], Light::zeroed());
    }

    #[test]
    fn test_pass_constants_truncates_lights() {
        let camera = OrbitCamera::new(&CameraConfig::default(), 1.0);
        let lights = vec![Light::default(); MAX_LIGHTS + 4];
        let pass = PassConstants::new(
            &camera,
            &PassInputs {
                render_width: 0,
                render_height: 0,
                total_time: 0.0,
                delta_time: 0.0,
                ambient_light: Vec4::ZERO,
                lights: &lights,
            },
        );
        assert_eq!(pass.lights[MAX_LIGHTS - 1], Light::default());
        // Zero-sized targets are clamped so the inverse stays finite
        assert!(pass.inv_render_target_size.is_finite());
    }
}
