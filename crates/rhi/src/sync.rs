//! Synchronization primitives for Vulkan.
//!
//! - [`TimelineSemaphore`] - the GPU timeline fence. The CPU reads its counter
//!   and blocks on it; the queue advances it after submitted work completes.
//! - [`Semaphore`] - binary GPU-to-GPU semaphore for swapchain acquire/present.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shapes_rhi::backend::GpuFence;
//! use shapes_rhi::device::Device;
//! use shapes_rhi::sync::TimelineSemaphore;
//!
//! # fn example(device: Arc<Device>) -> Result<(), shapes_rhi::RhiError> {
//! let fence = TimelineSemaphore::new(device.clone(), 0)?;
//!
//! // Ask the graphics queue to bump the counter after prior work completes.
//! fence.signal_on_queue(device.graphics_queue(), 1)?;
//!
//! // Block until it does.
//! fence.wait(1, None)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use tracing::{debug, error};

use crate::backend::GpuFence;
use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Binary semaphore for queue-to-queue ordering.
pub struct Semaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();

        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        debug!("Created semaphore");

        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
        debug!("Destroyed semaphore");
    }
}

/// Timeline semaphore used as the frame fence.
///
/// Values only increase. A wait for `v` returns once the GPU has signalled any
/// value `>= v`.
pub struct TimelineSemaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl TimelineSemaphore {
    /// Creates a timeline semaphore with the given initial counter value.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails (e.g. the device was created
    /// without the `timelineSemaphore` feature).
    pub fn new(device: Arc<Device>, initial_value: u64) -> RhiResult<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let create_info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);

        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        debug!("Created timeline semaphore (initial value {})", initial_value);

        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }

    /// Enqueue a signal of `value` on `queue`, ordered after all prior submissions.
    ///
    /// This is an empty batch: no command buffers, one timeline signal.
    pub fn signal_on_queue(&self, queue: vk::Queue, value: u64) -> RhiResult<()> {
        let signal_semaphores = [self.semaphore];
        let signal_values = [value];
        let mut timeline_info =
            vk::TimelineSemaphoreSubmitInfo::default().signal_semaphore_values(&signal_values);
        let submit_info = vk::SubmitInfo::default()
            .signal_semaphores(&signal_semaphores)
            .push_next(&mut timeline_info);

        unsafe {
            self.device
                .handle()
                .queue_submit(queue, &[submit_info], vk::Fence::null())
                .map_err(|e| {
                    RhiError::SubmissionError(format!("Fence signal {} failed: {:?}", value, e))
                })?;
        }
        Ok(())
    }
}

impl GpuFence for TimelineSemaphore {
    fn completed_value(&self) -> RhiResult<u64> {
        let value = unsafe {
            self.device
                .handle()
                .get_semaphore_counter_value(self.semaphore)?
        };
        Ok(value)
    }

    fn wait(&self, value: u64, timeout: Option<Duration>) -> RhiResult<()> {
        let semaphores = [self.semaphore];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);
        let timeout_ns = timeout.map_or(u64::MAX, |t| t.as_nanos().min(u64::MAX as u128) as u64);

        match unsafe { self.device.handle().wait_semaphores(&wait_info, timeout_ns) } {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(RhiError::FenceTimeout {
                value,
                completed: self.completed_value()?,
            }),
            Err(vk::Result::ERROR_DEVICE_LOST) => {
                error!("Device lost while waiting for fence value {}", value);
                Err(RhiError::DeviceLost(format!(
                    "waiting for fence value {}",
                    value
                )))
            }
            Err(e) => Err(RhiError::VulkanError(e)),
        }
    }
}

impl Drop for TimelineSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
        debug!("Destroyed timeline semaphore");
    }
}
