//! RHI-specific error types.

use thiserror::Error;

/// RHI-specific error type.
///
/// Every variant is fatal to the frame loop: nothing in the renderer retries a
/// failed submission or fence wait.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] ash::vk::Result),

    /// Failed to load Vulkan
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// GPU allocator error
    #[error("Allocator error: {0}")]
    AllocatorError(#[from] gpu_allocator::AllocationError),

    /// No suitable GPU found
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// A fence did not reach its target within the configured timeout
    #[error("Fence wait for value {value} timed out (completed value {completed})")]
    FenceTimeout { value: u64, completed: u64 },

    /// The device stopped responding
    #[error("Device lost: {0}")]
    DeviceLost(String),

    /// Queue submission failed
    #[error("Submission error: {0}")]
    SubmissionError(String),

    /// A write or read fell outside a buffer's mapped range
    #[error("Buffer access out of bounds: offset {offset} + len {len} > size {size}")]
    OutOfBounds { offset: u64, len: u64, size: u64 },

    /// Shader loading error
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Surface creation error
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Swapchain error
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// Invalid handle error
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_timeout_message() {
        let err = RhiError::FenceTimeout {
            value: 7,
            completed: 5,
        };
        assert_eq!(
            err.to_string(),
            "Fence wait for value 7 timed out (completed value 5)"
        );
    }

    #[test]
    fn test_vk_result_conversion() {
        let err: RhiError = ash::vk::Result::ERROR_DEVICE_LOST.into();
        assert!(matches!(err, RhiError::VulkanError(_)));
    }
}
