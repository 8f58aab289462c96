//! Vertex format and input descriptions.
//!
//! The shapes scene only needs position and normal. All shapes share one
//! vertex buffer in this layout.

use std::mem::offset_of;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Position + normal vertex.
///
/// # Memory Layout
///
/// | Field    | Offset | Size |
/// |----------|--------|------|
/// | position | 0      | 12   |
/// | normal   | 12     | 12   |
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
}

impl Vertex {
    #[inline]
    pub const fn new(position: Vec3, normal: Vec3) -> Self {
        Self { position, normal }
    }

    #[inline]
    pub const fn size() -> usize {
        std::mem::size_of::<Self>()
    }

    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(Self::size() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
    }

    /// `location = 0` position, `location = 1` normal.
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        let attribute = |location: u32, offset: usize| {
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(location)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(offset as u32)
        };
        [
            attribute(0, offset_of!(Vertex, position)),
            attribute(1, offset_of!(Vertex, normal)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_size() {
        assert_eq!(Vertex::size(), 24);
    }

    #[test]
    fn test_vertex_binding_description() {
        let binding = Vertex::binding_description();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.stride, 24);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
    }

    #[test]
    fn test_vertex_attributes() {
        let attrs = Vertex::attribute_descriptions();
        assert_eq!(attrs[0].offset, 0);
        assert_eq!(attrs[1].offset, 12);
        assert_eq!(attrs[1].location, 1);
    }

    #[test]
    fn test_vertex_bytes() {
        let v = Vertex::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Y);
        let bytes = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 24);
        let floats: &[f32] = bytemuck::cast_slice(bytes);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 0.0, 1.0, 0.0]);
    }
}
