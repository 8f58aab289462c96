//! One slot of the frame-resource ring.

use shapes_rhi::{Backend, RhiResult};
use tracing::debug;

use crate::constants::{MaterialConstants, ObjectConstants, PassConstants};
use crate::upload_buffer::UploadBuffer;

/// Fence checkpoint of a slot that has never been submitted.
pub const UNUSED_FENCE_VALUE: u64 = 0;

/// Everything the CPU writes for one in-flight frame.
///
/// The GPU reads these buffers between submission and the fence reaching
/// [`fence`](Self::fence). The CPU must not touch them in that window.
pub struct FrameResource<B: Backend> {
    allocator: B::CommandAllocator,
    object_cb: UploadBuffer<B::Buffer, ObjectConstants>,
    material_cb: UploadBuffer<B::Buffer, MaterialConstants>,
    pass_cb: UploadBuffer<B::Buffer, PassConstants>,
    fence: u64,
}

impl<B: Backend> FrameResource<B> {
    pub fn new(
        backend: &mut B,
        slot: usize,
        object_count: usize,
        material_count: usize,
    ) -> RhiResult<Self> {
        let allocator = backend.create_command_allocator()?;
        let object_cb = UploadBuffer::new(backend, object_count, &format!("objects[{slot}]"))?;
        let material_cb =
            UploadBuffer::new(backend, material_count, &format!("materials[{slot}]"))?;
        let pass_cb = UploadBuffer::new(backend, 1, &format!("pass[{slot}]"))?;

        debug!(
            "Frame resource {}: {} object, {} material records",
            slot, object_count, material_count
        );

        Ok(Self {
            allocator,
            object_cb,
            material_cb,
            pass_cb,
            fence: UNUSED_FENCE_VALUE,
        })
    }

    #[inline]
    pub fn allocator(&self) -> &B::CommandAllocator {
        &self.allocator
    }

    #[inline]
    pub fn allocator_mut(&mut self) -> &mut B::CommandAllocator {
        &mut self.allocator
    }

    #[inline]
    pub fn object_cb(&self) -> &UploadBuffer<B::Buffer, ObjectConstants> {
        &self.object_cb
    }

    #[inline]
    pub fn object_cb_mut(&mut self) -> &mut UploadBuffer<B::Buffer, ObjectConstants> {
        &mut self.object_cb
    }

    #[inline]
    pub fn material_cb(&self) -> &UploadBuffer<B::Buffer, MaterialConstants> {
        &self.material_cb
    }

    #[inline]
    pub fn material_cb_mut(&mut self) -> &mut UploadBuffer<B::Buffer, MaterialConstants> {
        &mut self.material_cb
    }

    #[inline]
    pub fn pass_cb(&self) -> &UploadBuffer<B::Buffer, PassConstants> {
        &self.pass_cb
    }

    #[inline]
    pub fn pass_cb_mut(&mut self) -> &mut UploadBuffer<B::Buffer, PassConstants> {
        &mut self.pass_cb
    }

    /// Fence value that retires this slot's last submission.
    #[inline]
    pub fn fence(&self) -> u64 {
        self.fence
    }

    #[inline]
    pub(crate) fn set_fence(&mut self, value: u64) {
        self.fence = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapes_rhi::{ConstantBuffer, QueueMode, SoftwareBackend};

    #[test]
    fn test_frame_resource_sizes() {
        let mut backend = SoftwareBackend::new(QueueMode::Immediate);
        let frame = FrameResource::new(&mut backend, 0, 22, 4).unwrap();
        assert_eq!(frame.object_cb().len(), 22);
        assert_eq!(frame.material_cb().len(), 4);
        assert_eq!(frame.pass_cb().len(), 1);
        assert_eq!(frame.fence(), UNUSED_FENCE_VALUE);
    }

    #[test]
    fn test_frame_resources_do_not_share_buffers() {
        let mut backend = SoftwareBackend::new(QueueMode::Immediate);
        let a = FrameResource::new(&mut backend, 0, 2, 1).unwrap();
        let b = FrameResource::new(&mut backend, 1, 2, 1).unwrap();
        assert_ne!(
            a.object_cb().buffer().gpu_address(),
            b.object_cb().buffer().gpu_address()
        );
        assert_ne!(a.allocator().id(), b.allocator().id());
    }
}
