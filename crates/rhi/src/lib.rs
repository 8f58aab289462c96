//! Rendering hardware interface.
//!
//! Two layers live here:
//! - [`backend`]: the small capability seam the frame loop is written against
//!   (constant buffers, command allocators, a timeline fence, record/submit),
//!   plus its headless implementation in [`software`].
//! - Thin `ash` wrappers (instance, device, swapchain, buffers, pipelines,
//!   timeline semaphores) that the Vulkan backend is assembled from.

mod error;

pub mod backend;
pub mod buffer;
pub mod command;
pub mod device;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod shader;
pub mod software;
pub mod swapchain;
pub mod sync;
pub mod vertex;

pub use backend::{
    Backend, Command, ConstantBuffer, FillMode, GeometryId, GpuAddress, GpuFence,
    PrimitiveTopology, ResourceState, ScissorRect, Viewport, align_constant_size,
};
pub use error::{RhiError, RhiResult};
pub use software::{QueueController, QueueMode, SoftwareBackend};

pub use ash::vk;
