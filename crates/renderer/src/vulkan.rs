//! Vulkan implementation of [`Backend`].
//!
//! Constant records are read by buffer device address: the three addresses
//! for the current draw live in a 24-byte push-constant block, so setting a
//! "root constant buffer view" is a push-constant write. The fence is a
//! timeline semaphore signalled on the graphics queue after each submission.

use std::mem::ManuallyDrop;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info, warn};

use shapes_core::RenderConfig;
use shapes_platform::{Surface, Window};
use shapes_rhi::buffer::{Buffer, BufferUsage};
use shapes_rhi::command::{CommandBuffer, CommandPool};
use shapes_rhi::device::Device;
use shapes_rhi::instance::Instance;
use shapes_rhi::physical_device::select_physical_device;
use shapes_rhi::pipeline::{
    CompareOp, CullMode, FrontFace, GraphicsPipelineBuilder, MATERIAL_ADDRESS_OFFSET,
    OBJECT_ADDRESS_OFFSET, PASS_ADDRESS_OFFSET, Pipeline, PipelineLayout,
};
use shapes_rhi::shader::{Shader, ShaderStage};
use shapes_rhi::swapchain::Swapchain;
use shapes_rhi::sync::{Semaphore, TimelineSemaphore};
use shapes_rhi::vertex::Vertex;
use shapes_rhi::{
    Backend, Command, FillMode, GeometryId, GpuAddress, ResourceState, RhiError, RhiResult,
    align_constant_size,
};

use crate::depth_buffer::{DepthBuffer, select_depth_format};

/// Minimum stride between constant records, matching the 256-byte rule the
/// scene layout was designed around.
const MIN_CONSTANT_ALIGNMENT: u64 = 256;

const CONSTANT_STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw(),
);

/// Command pool plus the one primary command buffer recorded from it.
pub struct VulkanCommandAllocator {
    // Buffer before pool: the buffer is freed with its pool.
    command_buffer: CommandBuffer,
    pool: CommandPool,
}

impl VulkanCommandAllocator {
    #[inline]
    pub fn command_buffer(&self) -> &CommandBuffer {
        &self.command_buffer
    }
}

struct GpuGeometry {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
}

/// Size of the acquire semaphore pool.
///
/// The semaphore used at tick `t` is waited on by submission `t` and comes
/// around again at tick `t + count`. The frame ring only guarantees that
/// submission `t + count - frames_in_flight` has retired by then, so the pool
/// needs at least `frames_in_flight` semaphores; the image count on top keeps
/// one spare per image for a pending acquire.
pub fn acquire_semaphore_count(image_count: usize, frames_in_flight: usize) -> usize {
    image_count + frames_in_flight.max(1)
}

/// Swapchain image acquired by `begin_frame` and not yet presented.
#[derive(Clone, Copy, Debug)]
struct AcquiredImage {
    image_index: u32,
    acquire_semaphore: usize,
}

/// Swapchain-backed Vulkan backend for a winit window.
///
/// Owned GPU objects are wrapped in `ManuallyDrop` so `Drop` can release them
/// after the device is idle and before the instance goes away.
pub struct VulkanBackend {
    instance: ManuallyDrop<Instance>,
    device: ManuallyDrop<Arc<Device>>,
    surface: ManuallyDrop<Surface>,
    swapchain: ManuallyDrop<Swapchain>,
    depth_buffer: ManuallyDrop<DepthBuffer>,
    layout: ManuallyDrop<PipelineLayout>,
    solid_pipeline: ManuallyDrop<Pipeline>,
    wireframe_pipeline: ManuallyDrop<Pipeline>,
    geometry: Vec<GpuGeometry>,

    /// Cycled per acquire, sized by [`acquire_semaphore_count`].
    acquire_semaphores: Vec<Semaphore>,
    /// Indexed by swapchain image.
    render_finished: Vec<Semaphore>,
    next_acquire: usize,
    acquired: Option<AcquiredImage>,
    frames_in_flight: usize,

    width: u32,
    height: u32,
    vsync: bool,
    needs_recreate: bool,
    constant_alignment: u64,
}

impl VulkanBackend {
    /// Brings up the instance, device, swapchain and both pass pipelines.
    ///
    /// `frames_in_flight` is the frame-resource ring size; it bounds how many
    /// submissions may still be waiting on acquire semaphores.
    ///
    /// # Errors
    ///
    /// Fails if no GPU supports timeline semaphores, buffer device address,
    /// dynamic rendering and non-solid fill, or if the shaders cannot be loaded.
    pub fn new(
        window: &Window,
        config: &RenderConfig,
        frames_in_flight: usize,
    ) -> RhiResult<Self> {
        let extensions = window
            .required_extensions()
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;
        let instance = Instance::new(config.validation, &extensions)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let physical = select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &physical)?;

        let (width, height) = (window.width().max(1), window.height().max(1));
        let swapchain = Swapchain::new(
            &instance,
            device.clone(),
            surface.handle(),
            width,
            height,
            config.vsync,
        )?;

        let depth_format = select_depth_format(instance.handle(), physical.device);
        let extent = swapchain.extent();
        let depth_buffer =
            DepthBuffer::new(device.clone(), extent.width, extent.height, depth_format)?;

        let layout = PipelineLayout::with_constant_addresses(device.clone())?;
        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            &config.vertex_shader,
            ShaderStage::Vertex,
            "main",
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            &config.fragment_shader,
            ShaderStage::Fragment,
            "main",
        )?;

        let build_pipeline = |fill_mode: FillMode| {
            GraphicsPipelineBuilder::new()
                .vertex_shader(&vertex_shader)
                .fragment_shader(&fragment_shader)
                .vertex_binding(Vertex::binding_description())
                .vertex_attributes(&Vertex::attribute_descriptions())
                .fill_mode(fill_mode)
                .cull_mode(CullMode::Back)
                .front_face(FrontFace::CounterClockwise)
                .depth_test(true, true, CompareOp::Less)
                .color_attachment_format(swapchain.format())
                .depth_attachment_format(depth_format)
                .build(device.clone(), &layout)
        };
        let solid_pipeline = build_pipeline(FillMode::Solid)?;
        let wireframe_pipeline = build_pipeline(FillMode::Wireframe)?;

        let (acquire_semaphores, render_finished) =
            Self::create_semaphores(&device, swapchain.image_count(), frames_in_flight)?;

        let constant_alignment = device
            .min_uniform_buffer_offset_alignment()
            .max(MIN_CONSTANT_ALIGNMENT);

        info!(
            "Vulkan backend ready: {}x{}, {} swapchain images, depth {:?}, constant alignment {}",
            extent.width,
            extent.height,
            swapchain.image_count(),
            depth_format,
            constant_alignment
        );

        Ok(Self {
            instance: ManuallyDrop::new(instance),
            device: ManuallyDrop::new(device),
            surface: ManuallyDrop::new(surface),
            swapchain: ManuallyDrop::new(swapchain),
            depth_buffer: ManuallyDrop::new(depth_buffer),
            layout: ManuallyDrop::new(layout),
            solid_pipeline: ManuallyDrop::new(solid_pipeline),
            wireframe_pipeline: ManuallyDrop::new(wireframe_pipeline),
            geometry: Vec::new(),
            acquire_semaphores,
            render_finished,
            next_acquire: 0,
            acquired: None,
            frames_in_flight,
            width,
            height,
            vsync: config.vsync,
            needs_recreate: false,
            constant_alignment,
        })
    }

    fn create_semaphores(
        device: &Arc<Device>,
        image_count: usize,
        frames_in_flight: usize,
    ) -> RhiResult<(Vec<Semaphore>, Vec<Semaphore>)> {
        let acquire = (0..acquire_semaphore_count(image_count, frames_in_flight))
            .map(|_| Semaphore::new(device.clone()))
            .collect::<RhiResult<Vec<_>>>()?;
        let finished = (0..image_count)
            .map(|_| Semaphore::new(device.clone()))
            .collect::<RhiResult<Vec<_>>>()?;
        debug!(
            "Created {} acquire and {} render-finished semaphores",
            acquire.len(),
            finished.len()
        );
        Ok((acquire, finished))
    }

    /// Schedules a swapchain rebuild before the next acquire.
    ///
    /// Zero sizes are ignored; the caller skips frames while minimized.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            debug!("Ignoring resize to {}x{}", width, height);
            return;
        }
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.needs_recreate = true;
        }
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    fn recreate_swapchain(&mut self) -> RhiResult<()> {
        self.device.wait_idle()?;

        self.swapchain.recreate(
            &self.instance,
            self.surface.handle(),
            self.width,
            self.height,
            self.vsync,
        )?;

        let extent = self.swapchain.extent();
        let depth_buffer = DepthBuffer::new(
            Arc::clone(&*self.device),
            extent.width,
            extent.height,
            self.depth_buffer.format(),
        )?;
        // SAFETY: the device is idle, so nothing references the old depth image.
        unsafe {
            ManuallyDrop::drop(&mut self.depth_buffer);
        }
        self.depth_buffer = ManuallyDrop::new(depth_buffer);

        let (acquire, finished) =
            Self::create_semaphores(
                &self.device,
                self.swapchain.image_count(),
                self.frames_in_flight,
            )?;
        self.acquire_semaphores = acquire;
        self.render_finished = finished;
        self.next_acquire = 0;
        self.needs_recreate = false;
        Ok(())
    }

    fn try_acquire(&mut self) -> Result<AcquiredImage, vk::Result> {
        let acquire_semaphore = self.next_acquire;
        let semaphore = self.acquire_semaphores[acquire_semaphore].handle();
        let (image_index, suboptimal) = self.swapchain.acquire_next_image(semaphore)?;
        if suboptimal {
            debug!("Acquired suboptimal image {}", image_index);
            self.needs_recreate = true;
        }
        self.next_acquire = (self.next_acquire + 1) % self.acquire_semaphores.len();
        Ok(AcquiredImage {
            image_index,
            acquire_semaphore,
        })
    }

    fn color_target(&self, image_index: u32) -> RhiResult<(vk::Image, vk::ImageView)> {
        let index = image_index as usize;
        self.swapchain
            .image(index)
            .zip(self.swapchain.image_view(index))
            .ok_or_else(|| RhiError::InvalidHandle(format!("No swapchain image {}", index)))
    }

    fn pipeline(&self, fill_mode: FillMode) -> &Pipeline {
        match fill_mode {
            FillMode::Solid => &self.solid_pipeline,
            FillMode::Wireframe => &self.wireframe_pipeline,
        }
    }

    fn transition(
        &self,
        cmd: &CommandBuffer,
        color_image: vk::Image,
        from: ResourceState,
        to: ResourceState,
    ) {
        let color_range = vk::ImageSubresourceRange::default()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .level_count(1)
            .layer_count(1);

        match (from, to) {
            (ResourceState::Present, ResourceState::RenderTarget) => {
                // Contents are cleared, so the previous layout is discarded.
                cmd.image_barrier(
                    vk::ImageMemoryBarrier2::default()
                        .src_stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
                        .src_access_mask(vk::AccessFlags2::NONE)
                        .dst_stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
                        .dst_access_mask(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
                        .old_layout(vk::ImageLayout::UNDEFINED)
                        .new_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                        .image(color_image)
                        .subresource_range(color_range),
                );
                let depth_tests = vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS
                    | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS;
                cmd.image_barrier(
                    vk::ImageMemoryBarrier2::default()
                        .src_stage_mask(depth_tests)
                        .src_access_mask(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE)
                        .dst_stage_mask(depth_tests)
                        .dst_access_mask(
                            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ
                                | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
                        )
                        .old_layout(vk::ImageLayout::UNDEFINED)
                        .new_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                        .image(self.depth_buffer.image())
                        .subresource_range(DepthBuffer::subresource_range(
                            self.depth_buffer.format(),
                        )),
                );
            }
            (ResourceState::RenderTarget, ResourceState::Present) => {
                cmd.image_barrier(
                    vk::ImageMemoryBarrier2::default()
                        .src_stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
                        .src_access_mask(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
                        .dst_stage_mask(vk::PipelineStageFlags2::NONE)
                        .dst_access_mask(vk::AccessFlags2::NONE)
                        .old_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                        .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
                        .image(color_image)
                        .subresource_range(color_range),
                );
            }
            (from, to) => warn!("Ignoring no-op transition {:?} -> {:?}", from, to),
        }
    }

    fn push_address(&self, cmd: &CommandBuffer, offset: u32, address: GpuAddress) {
        cmd.push_constants_bytes(
            self.layout.handle(),
            CONSTANT_STAGES,
            offset,
            bytemuck::bytes_of(&address),
        );
    }
}

impl Backend for VulkanBackend {
    type Buffer = Buffer;
    type CommandAllocator = VulkanCommandAllocator;
    type Fence = TimelineSemaphore;

    fn name(&self) -> &'static str {
        "vulkan"
    }

    fn constant_buffer_alignment(&self) -> u64 {
        self.constant_alignment
    }

    fn create_constant_buffer(&mut self, size: u64, label: &str) -> RhiResult<Buffer> {
        let size = align_constant_size(size, self.constant_alignment);
        debug!("Creating constant buffer '{}' ({} bytes)", label, size);
        Buffer::new(Arc::clone(&*self.device), BufferUsage::Constant, size)
    }

    fn create_command_allocator(&mut self) -> RhiResult<VulkanCommandAllocator> {
        let pool = CommandPool::new(Arc::clone(&*self.device), self.device.graphics_family())?;
        let command_buffer = CommandBuffer::new(Arc::clone(&*self.device), &pool)?;
        Ok(VulkanCommandAllocator {
            command_buffer,
            pool,
        })
    }

    fn reset_command_allocator(&mut self, allocator: &mut VulkanCommandAllocator) -> RhiResult<()> {
        allocator.pool.reset()
    }

    fn create_fence(&mut self, initial_value: u64) -> RhiResult<TimelineSemaphore> {
        TimelineSemaphore::new(Arc::clone(&*self.device), initial_value)
    }

    fn create_geometry(&mut self, vertices: &[Vertex], indices: &[u16]) -> RhiResult<GeometryId> {
        let vertex_buffer = Buffer::new_with_data(
            Arc::clone(&*self.device),
            BufferUsage::Vertex,
            bytemuck::cast_slice(vertices),
        )?;
        let index_buffer = Buffer::new_with_data(
            Arc::clone(&*self.device),
            BufferUsage::Index,
            bytemuck::cast_slice(indices),
        )?;

        let id = GeometryId(self.geometry.len() as u32);
        self.geometry.push(GpuGeometry {
            vertex_buffer,
            index_buffer,
        });
        debug!(
            "Uploaded geometry {:?}: {} vertices, {} indices",
            id,
            vertices.len(),
            indices.len()
        );
        Ok(id)
    }

    fn begin_frame(&mut self) -> RhiResult<()> {
        if self.needs_recreate {
            self.recreate_swapchain()?;
        }

        let acquired = match self.try_acquire() {
            Ok(acquired) => acquired,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                debug!("Swapchain out of date on acquire, recreating");
                self.recreate_swapchain()?;
                self.try_acquire().map_err(|e| {
                    RhiError::SwapchainError(format!("Acquire after recreate failed: {:?}", e))
                })?
            }
            Err(vk::Result::ERROR_DEVICE_LOST) => {
                return Err(RhiError::DeviceLost("swapchain acquire".to_string()));
            }
            Err(e) => return Err(RhiError::VulkanError(e)),
        };

        self.acquired = Some(acquired);
        Ok(())
    }

    fn record(
        &mut self,
        allocator: &mut VulkanCommandAllocator,
        commands: &[Command],
    ) -> RhiResult<()> {
        let Some(acquired) = self.acquired else {
            return Err(RhiError::InvalidHandle(
                "record called without an acquired swapchain image".to_string(),
            ));
        };
        let (color_image, color_view) = self.color_target(acquired.image_index)?;
        let extent = self.swapchain.extent();
        let cmd = &allocator.command_buffer;

        cmd.begin()?;
        for command in commands {
            match *command {
                Command::SetPipeline(fill_mode) => {
                    cmd.bind_graphics_pipeline(self.pipeline(fill_mode).handle());
                }
                Command::Transition { from, to } => {
                    self.transition(cmd, color_image, from, to);
                }
                Command::BeginPass {
                    clear_color,
                    clear_depth,
                    clear_stencil,
                } => {
                    let color_attachment = vk::RenderingAttachmentInfo::default()
                        .image_view(color_view)
                        .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                        .load_op(vk::AttachmentLoadOp::CLEAR)
                        .store_op(vk::AttachmentStoreOp::STORE)
                        .clear_value(vk::ClearValue {
                            color: vk::ClearColorValue {
                                float32: clear_color,
                            },
                        });
                    let depth_attachment = vk::RenderingAttachmentInfo::default()
                        .image_view(self.depth_buffer.image_view())
                        .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                        .load_op(vk::AttachmentLoadOp::CLEAR)
                        .store_op(vk::AttachmentStoreOp::DONT_CARE)
                        .clear_value(vk::ClearValue {
                            depth_stencil: vk::ClearDepthStencilValue {
                                depth: clear_depth,
                                stencil: clear_stencil,
                            },
                        });
                    let rendering_info = vk::RenderingInfo::default()
                        .render_area(vk::Rect2D {
                            offset: vk::Offset2D::default(),
                            extent,
                        })
                        .layer_count(1)
                        .color_attachments(std::slice::from_ref(&color_attachment))
                        .depth_attachment(&depth_attachment);
                    cmd.begin_rendering(&rendering_info);
                }
                Command::EndPass => cmd.end_rendering(),
                Command::SetViewport(viewport) => {
                    cmd.set_viewport(vk::Viewport {
                        x: viewport.x,
                        y: viewport.y,
                        width: viewport.width,
                        height: viewport.height,
                        min_depth: viewport.min_depth,
                        max_depth: viewport.max_depth,
                    });
                }
                Command::SetScissor(rect) => {
                    cmd.set_scissor(vk::Rect2D {
                        offset: vk::Offset2D {
                            x: rect.x,
                            y: rect.y,
                        },
                        extent: vk::Extent2D {
                            width: rect.width,
                            height: rect.height,
                        },
                    });
                }
                Command::SetPassConstants(address) => {
                    self.push_address(cmd, PASS_ADDRESS_OFFSET, address);
                }
                Command::BindGeometry(id) => {
                    let geometry = self.geometry.get(id.0 as usize).ok_or_else(|| {
                        RhiError::InvalidHandle(format!("Unknown geometry {:?}", id))
                    })?;
                    cmd.bind_geometry(
                        geometry.vertex_buffer.handle(),
                        geometry.index_buffer.handle(),
                    );
                }
                Command::SetTopology(topology) => cmd.set_primitive_topology(topology.into()),
                Command::SetObjectConstants(address) => {
                    self.push_address(cmd, OBJECT_ADDRESS_OFFSET, address);
                }
                Command::SetMaterialConstants(address) => {
                    self.push_address(cmd, MATERIAL_ADDRESS_OFFSET, address);
                }
                Command::DrawIndexedInstanced {
                    index_count,
                    instance_count,
                    start_index,
                    base_vertex,
                    start_instance,
                } => cmd.draw_indexed(
                    index_count,
                    instance_count,
                    start_index,
                    base_vertex,
                    start_instance,
                ),
            }
        }
        cmd.end()
    }

    fn submit(&mut self, allocator: &mut VulkanCommandAllocator) -> RhiResult<()> {
        let acquired = self.acquired.take().ok_or_else(|| {
            RhiError::InvalidHandle("submit called without an acquired swapchain image".to_string())
        })?;
        let render_finished = self
            .render_finished
            .get(acquired.image_index as usize)
            .map(Semaphore::handle)
            .ok_or_else(|| {
                RhiError::InvalidHandle(format!("No semaphore for image {}", acquired.image_index))
            })?;

        let wait_semaphores = [self.acquire_semaphores[acquired.acquire_semaphore].handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [render_finished];
        let command_buffers = [allocator.command_buffer.handle()];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        // SAFETY: the command buffer was ended in `record` and every semaphore
        // is owned by this backend.
        unsafe {
            self.device
                .submit_graphics(&[submit_info], vk::Fence::null())?;
        }

        match self
            .swapchain
            .present(self.device.present_queue(), acquired.image_index, render_finished)
        {
            Ok(false) => {}
            Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR | vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                debug!("Present reported a stale swapchain, recreating next frame");
                self.needs_recreate = true;
            }
            Err(vk::Result::ERROR_DEVICE_LOST) => {
                return Err(RhiError::DeviceLost("present".to_string()));
            }
            Err(e) => return Err(RhiError::VulkanError(e)),
        }
        Ok(())
    }

    fn signal(&mut self, fence: &TimelineSemaphore, value: u64) -> RhiResult<()> {
        fence.signal_on_queue(self.device.graphics_queue(), value)
    }

    fn wait_idle(&mut self) -> RhiResult<()> {
        self.device.wait_idle()
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!("Failed to wait for device idle during drop: {}", e);
        }

        self.geometry.clear();
        self.acquire_semaphores.clear();
        self.render_finished.clear();

        // SAFETY: the device is idle and each field is dropped exactly once,
        // dependents before the device and the device before the instance.
        unsafe {
            ManuallyDrop::drop(&mut self.wireframe_pipeline);
            ManuallyDrop::drop(&mut self.solid_pipeline);
            ManuallyDrop::drop(&mut self.layout);
            ManuallyDrop::drop(&mut self.depth_buffer);
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.surface);
            if Arc::strong_count(&*self.device) > 1 {
                warn!(
                    "{} device references outlive the backend",
                    Arc::strong_count(&*self.device) - 1
                );
            }
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.instance);
        }
        info!("Vulkan backend destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_stages_cover_both_shaders() {
        assert!(CONSTANT_STAGES.contains(vk::ShaderStageFlags::VERTEX));
        assert!(CONSTANT_STAGES.contains(vk::ShaderStageFlags::FRAGMENT));
        assert!(!CONSTANT_STAGES.contains(vk::ShaderStageFlags::COMPUTE));
    }

    #[test]
    fn test_acquire_pool_covers_frames_in_flight() {
        assert_eq!(acquire_semaphore_count(3, 3), 6);
        assert_eq!(acquire_semaphore_count(2, 1), 3);
        for frames in 1..=16 {
            for images in 2..=4 {
                let count = acquire_semaphore_count(images, frames);
                assert!(count >= frames, "{images} images, {frames} frames");
                assert!(count > images);
            }
        }
    }

    #[test]
    fn test_push_constant_offsets_are_disjoint() {
        let size = std::mem::size_of::<GpuAddress>() as u32;
        assert_eq!(OBJECT_ADDRESS_OFFSET + size, MATERIAL_ADDRESS_OFFSET);
        assert_eq!(MATERIAL_ADDRESS_OFFSET + size, PASS_ADDRESS_OFFSET);
    }
}
