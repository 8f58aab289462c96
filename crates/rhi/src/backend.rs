//! Backend seam used by the frame loop.
//!
//! The renderer drives a GPU through a handful of capability points: create
//! constant buffers, create command allocators, create and signal a timeline
//! fence, record a command list, and submit it. [`Backend`] names exactly those
//! points so the same frame loop runs on Vulkan and on the headless
//! [`software`](crate::software) backend.
//!
//! Command lists are expressed as a flat slice of [`Command`]s. Every draw is
//! self-describing: constant records are bound by GPU address right before the
//! draw that reads them, nothing is inferred from a previous draw.

use std::time::Duration;

use crate::error::RhiResult;
use crate::vertex::Vertex;

/// A GPU virtual address of a constant record.
pub type GpuAddress = u64;

/// Round `size` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two. Constant records are laid out at this
/// stride, never at their raw struct size.
#[inline]
pub const fn align_constant_size(size: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (size + alignment - 1) & !(alignment - 1)
}

/// Polygon fill state selected per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FillMode {
    #[default]
    Solid,
    Wireframe,
}

impl FillMode {
    pub fn from_wireframe(wireframe: bool) -> Self {
        if wireframe {
            FillMode::Wireframe
        } else {
            FillMode::Solid
        }
    }
}

/// Primitive topology for input assembly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Usage state of the back buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Present,
    RenderTarget,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-target viewport with the standard `[0, 1]` depth range.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Handle to a vertex/index buffer pair uploaded with [`Backend::create_geometry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryId(pub u32);

/// One backend-neutral command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Select the solid or wireframe pipeline state.
    SetPipeline(FillMode),
    /// Back buffer state transition.
    Transition {
        from: ResourceState,
        to: ResourceState,
    },
    /// Begin the main pass, clearing color and depth/stencil.
    BeginPass {
        clear_color: [f32; 4],
        clear_depth: f32,
        clear_stencil: u32,
    },
    EndPass,
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    SetPassConstants(GpuAddress),
    BindGeometry(GeometryId),
    SetTopology(PrimitiveTopology),
    SetObjectConstants(GpuAddress),
    SetMaterialConstants(GpuAddress),
    DrawIndexedInstanced {
        index_count: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    },
}

/// A CPU-writable buffer the GPU reads constant records from.
pub trait ConstantBuffer {
    /// Size in bytes.
    fn size(&self) -> u64;

    /// GPU address of byte 0.
    fn gpu_address(&self) -> GpuAddress;

    /// Copy `data` into the buffer at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::OutOfBounds`](crate::RhiError::OutOfBounds) if the
    /// write does not fit.
    fn write(&mut self, offset: u64, data: &[u8]) -> RhiResult<()>;

    /// Copy bytes starting at `offset` into `out`.
    fn read(&self, offset: u64, out: &mut [u8]) -> RhiResult<()>;
}

/// A monotonically increasing counter signalled by the GPU.
pub trait GpuFence {
    /// Last value the GPU has signalled.
    fn completed_value(&self) -> RhiResult<u64>;

    /// Block the calling thread until the completed value is at least `value`.
    ///
    /// Implementations block on an OS or driver wait primitive, not a spin loop.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::FenceTimeout`](crate::RhiError::FenceTimeout) if
    /// `timeout` elapses first. A timeout is treated as device loss.
    fn wait(&self, value: u64, timeout: Option<Duration>) -> RhiResult<()>;
}

/// The capability points the frame loop needs from a GPU.
pub trait Backend {
    type Buffer: ConstantBuffer;
    type CommandAllocator;
    type Fence: GpuFence;

    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Required alignment of constant records addressed by GPU address.
    fn constant_buffer_alignment(&self) -> u64;

    fn create_constant_buffer(&mut self, size: u64, label: &str) -> RhiResult<Self::Buffer>;

    fn create_command_allocator(&mut self) -> RhiResult<Self::CommandAllocator>;

    /// Reclaim an allocator's command memory.
    ///
    /// Only valid once the GPU has finished every command list recorded from it.
    fn reset_command_allocator(&mut self, allocator: &mut Self::CommandAllocator)
    -> RhiResult<()>;

    fn create_fence(&mut self, initial_value: u64) -> RhiResult<Self::Fence>;

    /// Upload one shared vertex/index buffer pair.
    fn create_geometry(&mut self, vertices: &[Vertex], indices: &[u16])
    -> RhiResult<GeometryId>;

    /// Acquire the render target for the next frame.
    fn begin_frame(&mut self) -> RhiResult<()>;

    /// Record `commands` into `allocator`'s command list.
    fn record(
        &mut self,
        allocator: &mut Self::CommandAllocator,
        commands: &[Command],
    ) -> RhiResult<()>;

    /// Hand the recorded command list to the GPU queue (and present, if the
    /// backend has a surface).
    fn submit(&mut self, allocator: &mut Self::CommandAllocator) -> RhiResult<()>;

    /// Ask the GPU to set `fence` to `value` once all prior submissions complete.
    fn signal(&mut self, fence: &Self::Fence, value: u64) -> RhiResult<()>;

    /// Block until the queue is empty.
    fn wait_idle(&mut self) -> RhiResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_constant_size() {
        assert_eq!(align_constant_size(0, 256), 0);
        assert_eq!(align_constant_size(1, 256), 256);
        assert_eq!(align_constant_size(128, 256), 256);
        assert_eq!(align_constant_size(256, 256), 256);
        assert_eq!(align_constant_size(1216, 256), 1280);
        assert_eq!(align_constant_size(96, 16), 96);
    }

    #[test]
    fn test_fill_mode_from_wireframe() {
        assert_eq!(FillMode::from_wireframe(true), FillMode::Wireframe);
        assert_eq!(FillMode::from_wireframe(false), FillMode::Solid);
        assert_eq!(FillMode::default(), FillMode::Solid);
    }

    #[test]
    fn test_full_viewport() {
        let vp = Viewport::full(800, 600);
        assert_eq!(vp.width, 800.0);
        assert_eq!(vp.height, 600.0);
        assert_eq!(vp.max_depth, 1.0);
        assert_eq!(ScissorRect::full(800, 600).width, 800);
    }
}
