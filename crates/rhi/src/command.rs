//! Command pool and command buffer wrappers.
//!
//! One [`CommandPool`] backs each frame slot: resetting the pool reclaims the
//! memory of every command buffer recorded from it, which is only legal once
//! the GPU has finished that slot's work.
//!
//! [`CommandBuffer`] exposes the handful of recording calls the frame loop
//! issues: dynamic rendering, pipeline/geometry binding, dynamic state,
//! push constants, indexed draws and layout barriers.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shapes_rhi::device::Device;
//! use shapes_rhi::command::{CommandBuffer, CommandPool};
//!
//! # fn example(device: Arc<Device>) -> Result<(), shapes_rhi::RhiError> {
//! let pool = CommandPool::new(device.clone(), device.graphics_family())?;
//! let cmd = CommandBuffer::new(device, &pool)?;
//!
//! cmd.begin()?;
//! // ... record ...
//! cmd.end()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan command pool wrapper.
pub struct CommandPool {
    device: Arc<Device>,
    pool: vk::CommandPool,
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a pool for `queue_family_index`.
    ///
    /// Command buffers from this pool are never reset individually; the whole
    /// pool is reset with [`CommandPool::reset`].
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT);

        let pool = unsafe { device.handle().create_command_pool(&create_info, None)? };

        debug!(
            "Command pool created for queue family {}",
            queue_family_index
        );

        Ok(Self {
            device,
            pool,
            queue_family_index,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Allocates a primary command buffer.
    pub fn allocate_command_buffer(&self) -> RhiResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe { self.device.handle().allocate_command_buffers(&alloc_info)? };
        buffers
            .into_iter()
            .next()
            .ok_or(crate::RhiError::VulkanError(vk::Result::ERROR_OUT_OF_HOST_MEMORY))
    }

    /// Returns every command buffer of this pool to the initial state.
    ///
    /// The caller must guarantee none of them are pending on the GPU.
    pub fn reset(&self) -> RhiResult<()> {
        unsafe {
            self.device
                .handle()
                .reset_command_pool(self.pool, vk::CommandPoolResetFlags::empty())?;
        }
        Ok(())
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_command_pool(self.pool, None);
        }
        debug!(
            "Command pool destroyed for queue family {}",
            self.queue_family_index
        );
    }
}

/// Recording wrapper around a `vk::CommandBuffer`.
///
/// Does not own the handle; it is freed with its pool. Every recording call
/// is only valid between [`CommandBuffer::begin`] and [`CommandBuffer::end`].
pub struct CommandBuffer {
    device: Arc<Device>,
    buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    pub fn new(device: Arc<Device>, pool: &CommandPool) -> RhiResult<Self> {
        let buffer = pool.allocate_command_buffer()?;
        Ok(Self { device, buffer })
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    #[inline]
    fn raw(&self) -> &ash::Device {
        self.device.handle()
    }

    /// Begins one-time-submit recording.
    pub fn begin(&self) -> RhiResult<()> {
        let info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.raw().begin_command_buffer(self.buffer, &info)? };
        Ok(())
    }

    pub fn end(&self) -> RhiResult<()> {
        unsafe { self.raw().end_command_buffer(self.buffer)? };
        Ok(())
    }

    pub fn begin_rendering(&self, info: &vk::RenderingInfo) {
        unsafe { self.raw().cmd_begin_rendering(self.buffer, info) }
    }

    pub fn end_rendering(&self) {
        unsafe { self.raw().cmd_end_rendering(self.buffer) }
    }

    pub fn bind_graphics_pipeline(&self, pipeline: vk::Pipeline) {
        let bind_point = vk::PipelineBindPoint::GRAPHICS;
        unsafe { self.raw().cmd_bind_pipeline(self.buffer, bind_point, pipeline) }
    }

    /// Binds the packed scene geometry: one vertex stream and 16-bit indices,
    /// both at offset 0.
    pub fn bind_geometry(&self, vertices: vk::Buffer, indices: vk::Buffer) {
        unsafe {
            let raw = self.raw();
            raw.cmd_bind_vertex_buffers(self.buffer, 0, &[vertices], &[0]);
            raw.cmd_bind_index_buffer(self.buffer, indices, 0, vk::IndexType::UINT16);
        }
    }

    pub fn set_viewport(&self, viewport: vk::Viewport) {
        unsafe { self.raw().cmd_set_viewport(self.buffer, 0, &[viewport]) }
    }

    pub fn set_scissor(&self, scissor: vk::Rect2D) {
        unsafe { self.raw().cmd_set_scissor(self.buffer, 0, &[scissor]) }
    }

    /// Dynamic topology (core in Vulkan 1.3).
    pub fn set_primitive_topology(&self, topology: vk::PrimitiveTopology) {
        unsafe { self.raw().cmd_set_primitive_topology(self.buffer, topology) }
    }

    pub fn push_constants_bytes(
        &self,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) {
        unsafe { self.raw().cmd_push_constants(self.buffer, layout, stages, offset, data) }
    }

    /// Indexed draw; `base_vertex` is added to every fetched index.
    pub fn draw_indexed(
        &self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.raw().cmd_draw_indexed(
                self.buffer,
                index_count,
                instance_count,
                first_index,
                base_vertex,
                first_instance,
            )
        }
    }

    /// Records a single image layout transition (synchronization2).
    pub fn image_barrier(&self, barrier: vk::ImageMemoryBarrier2) {
        let barriers = [barrier];
        let dependency = vk::DependencyInfo::default().image_memory_barriers(&barriers);
        unsafe { self.raw().cmd_pipeline_barrier2(self.buffer, &dependency) }
    }
}
