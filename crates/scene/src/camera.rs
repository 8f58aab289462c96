//! Orbit camera.
//!
//! The eye sits on a sphere around the origin, parameterized by `radius`,
//! azimuth `theta` and polar angle `phi`. Dragging with the left button
//! orbits; dragging with the right button zooms.

use glam::{Mat4, Vec2, Vec3};
use shapes_core::CameraConfig;

/// Keeps the eye off the poles, where the look-at basis degenerates.
const PHI_MARGIN: f32 = 0.1;

#[derive(Clone, Debug, PartialEq)]
pub struct OrbitCamera {
    radius: f32,
    theta: f32,
    phi: f32,
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
    min_radius: f32,
    max_radius: f32,
    rotate_radians_per_pixel: f32,
    zoom_per_pixel: f32,
}

impl OrbitCamera {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            radius: config.radius.clamp(config.min_radius, config.max_radius),
            theta: config.theta,
            phi: config.phi.clamp(PHI_MARGIN, std::f32::consts::PI - PHI_MARGIN),
            fov_y: config.fov_y,
            aspect,
            near: config.near,
            far: config.far,
            min_radius: config.min_radius,
            max_radius: config.max_radius,
            rotate_radians_per_pixel: config.rotate_degrees_per_pixel.to_radians(),
            zoom_per_pixel: config.zoom_per_pixel,
        }
    }

    /// Orbits by a left-button drag of `delta` pixels.
    pub fn rotate(&mut self, delta: Vec2) {
        self.theta += self.rotate_radians_per_pixel * delta.x;
        self.phi = (self.phi + self.rotate_radians_per_pixel * delta.y)
            .clamp(PHI_MARGIN, std::f32::consts::PI - PHI_MARGIN);
    }

    /// Zooms by a right-button drag of `delta` pixels. Right and up move
    /// the eye away.
    pub fn zoom(&mut self, delta: Vec2) {
        let amount = self.zoom_per_pixel * (delta.x - delta.y);
        self.radius = (self.radius + amount).clamp(self.min_radius, self.max_radius);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn eye_position(&self) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        Vec3::new(
            self.radius * sin_phi * cos_theta,
            self.radius * cos_phi,
            self.radius * sin_phi * sin_theta,
        )
    }

    /// Left-handed view matrix looking at the origin.
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_lh(self.eye_position(), Vec3::ZERO, Vec3::Y)
    }

    /// Left-handed perspective with `[0, 1]` depth, Y flipped for Vulkan's
    /// downward framebuffer axis.
    pub fn proj(&self) -> Mat4 {
        let mut proj = Mat4::perspective_lh(self.fov_y, self.aspect, self.near, self.far);
        proj.y_axis.y *= -1.0;
        proj
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn theta(&self) -> f32 {
        self.theta
    }

    #[inline]
    pub fn phi(&self) -> f32 {
        self.phi
    }

    #[inline]
    pub fn near(&self) -> f32 {
        self.near
    }

    #[inline]
    pub fn far(&self) -> f32 {
        self.far
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(&CameraConfig::default(), 800.0 / 600.0)
    }

    #[test]
    fn test_initial_eye_position() {
        let cam = camera();
        let eye = cam.eye_position();
        assert!((eye.length() - 15.0).abs() < 1e-4);
        // theta = 1.5 pi puts the eye on -z
        assert!(eye.z < 0.0);
        assert!(eye.x.abs() < 1e-4);
        assert!(eye.y > 0.0);
    }

    #[test]
    fn test_rotate_clamps_phi() {
        let mut cam = camera();
        cam.rotate(Vec2::new(0.0, 100_000.0));
        assert!((cam.phi() - (PI - 0.1)).abs() < 1e-5);
        cam.rotate(Vec2::new(0.0, -100_000.0));
        assert!((cam.phi() - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_rotate_rate() {
        let mut cam = camera();
        let theta = cam.theta();
        cam.rotate(Vec2::new(4.0, 0.0));
        assert!((cam.theta() - theta - 1.0_f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn test_zoom_clamps_radius() {
        let mut cam = camera();
        cam.zoom(Vec2::new(20.0, 0.0));
        assert!((cam.radius() - 16.0).abs() < 1e-4);
        cam.zoom(Vec2::new(0.0, 10_000.0));
        assert_eq!(cam.radius(), 5.0);
        cam.zoom(Vec2::new(10_000.0, 0.0));
        assert_eq!(cam.radius(), 150.0);
    }

    #[test]
    fn test_view_maps_origin_in_front() {
        let cam = camera();
        let origin_view = cam.view().transform_point3(Vec3::ZERO);
        // Left-handed: +z points into the screen
        assert!((origin_view.z - 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_proj_flips_y() {
        let cam = camera();
        let clip = cam.proj() * glam::Vec4::new(0.0, 1.0, 10.0, 1.0);
        assert!(clip.y < 0.0);
    }

    #[test]
    fn test_set_aspect_ignores_degenerate() {
        let mut cam = camera();
        cam.set_aspect(0.0);
        assert!((cam.aspect() - 800.0 / 600.0).abs() < 1e-6);
        cam.set_aspect(2.0);
        assert_eq!(cam.aspect(), 2.0);
    }
}
