//! Frame-resource pipelined renderer for the shapes scene.
//!
//! The CPU prepares frame N+k while the GPU still executes frame N. Each of
//! the ring's slots owns a command allocator and constant buffers; a slot is
//! reused only after the timeline fence passes the value it was submitted
//! with. [`FrameOrchestrator`] drives one tick through that cycle against any
//! [`Backend`](shapes_rhi::Backend): [`VulkanBackend`] for the window, or the
//! headless software backend from `shapes-rhi`.

pub mod constants;
pub mod depth_buffer;
pub mod frame_pool;
pub mod frame_resource;
pub mod orchestrator;
pub mod submission;
pub mod update;
pub mod upload_buffer;
pub mod vulkan;

pub use constants::{MaterialConstants, ObjectConstants, PassConstants, PassInputs};
pub use frame_pool::FrameResourcePool;
pub use frame_resource::{FrameResource, UNUSED_FENCE_VALUE};
pub use orchestrator::{FrameInput, FrameOrchestrator, FrameState, FrameStats};
pub use submission::{FrameConstants, PassTarget, record_render_items, record_shapes_pass};
pub use upload_buffer::UploadBuffer;
pub use vulkan::{VulkanBackend, VulkanCommandAllocator};
