//! The ring of frame resources and the fence that paces it.
//!
//! # Synchronization Flow
//!
//! ```text
//! 1. advance()          select slot (current + 1) % N
//! 2. wait_until_ready() block until fence >= slot checkpoint, reset allocator
//! 3. write constants, record, submit (caller)
//! 4. advance_fence()    checkpoint = ++fence_value, queue a signal of it
//! ```
//!
//! Step 2 is the only place the CPU blocks. Because a slot is reused only
//! after its checkpoint is reached, at most N frames are in flight.

use std::time::Duration;

use shapes_rhi::{Backend, GpuFence, RhiResult};
use tracing::{debug, info, trace};

use crate::frame_resource::{FrameResource, UNUSED_FENCE_VALUE};

/// Ring of `N` frame resources sharing one timeline fence.
pub struct FrameResourcePool<B: Backend> {
    frames: Vec<FrameResource<B>>,
    current: usize,
    fence: B::Fence,
    /// Last value handed to the GPU to signal.
    fence_value: u64,
    timeout: Option<Duration>,
}

impl<B: Backend> FrameResourcePool<B> {
    /// Creates `frame_count` slots sized for the scene.
    ///
    /// The first [`advance`](Self::advance) selects slot 0.
    pub fn new(
        backend: &mut B,
        frame_count: usize,
        object_count: usize,
        material_count: usize,
        timeout: Option<Duration>,
    ) -> RhiResult<Self> {
        debug_assert!(frame_count > 0, "frame ring must have at least one slot");
        let frame_count = frame_count.max(1);

        let frames = (0..frame_count)
            .map(|slot| FrameResource::new(backend, slot, object_count, material_count))
            .collect::<RhiResult<Vec<_>>>()?;
        let fence = backend.create_fence(UNUSED_FENCE_VALUE)?;

        info!(
            "Frame resource pool created with {} slots on the {} backend",
            frame_count,
            backend.name()
        );

        Ok(Self {
            frames,
            current: frame_count - 1,
            fence,
            fence_value: UNUSED_FENCE_VALUE,
            timeout,
        })
    }

    /// Selects the next slot in the ring and returns its index.
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.frames.len();
        trace!("Selected frame resource {}", self.current);
        self.current
    }

    /// Blocks until the GPU has retired the current slot's previous work, then
    /// resets its command allocator.
    ///
    /// Returns `true` if the call had to block. A slot that was never
    /// submitted returns immediately.
    ///
    /// # Errors
    ///
    /// A failed or timed-out fence wait is fatal.
    pub fn wait_until_ready(&mut self, backend: &mut B) -> RhiResult<bool> {
        let checkpoint = self.frames[self.current].fence();
        if checkpoint == UNUSED_FENCE_VALUE {
            return Ok(false);
        }

        let blocked = self.fence.completed_value()? < checkpoint;
        if blocked {
            debug!(
                "Waiting for fence {} before reusing frame resource {}",
                checkpoint, self.current
            );
            self.fence.wait(checkpoint, self.timeout)?;
        }

        backend.reset_command_allocator(self.frames[self.current].allocator_mut())?;
        Ok(blocked)
    }

    /// Stamps the current slot with a new fence value and asks the GPU to
    /// signal it once everything submitted so far has completed.
    pub fn advance_fence(&mut self, backend: &mut B) -> RhiResult<u64> {
        self.fence_value += 1;
        self.frames[self.current].set_fence(self.fence_value);
        backend.signal(&self.fence, self.fence_value)?;
        trace!(
            "Frame resource {} checkpoint set to {}",
            self.current, self.fence_value
        );
        Ok(self.fence_value)
    }

    /// Blocks until every submitted frame has completed.
    pub fn drain(&self) -> RhiResult<()> {
        if self.fence_value == UNUSED_FENCE_VALUE {
            return Ok(());
        }
        debug!("Draining frame resources up to fence {}", self.fence_value);
        self.fence.wait(self.fence_value, self.timeout)
    }

    #[inline]
    pub fn current(&self) -> &FrameResource<B> {
        &self.frames[self.current]
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut FrameResource<B> {
        &mut self.frames[self.current]
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn frame(&self, slot: usize) -> Option<&FrameResource<B>> {
        self.frames.get(slot)
    }

    pub fn frames(&self) -> &[FrameResource<B>] {
        &self.frames
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Last fence value queued for signalling.
    #[inline]
    pub fn fence_value(&self) -> u64 {
        self.fence_value
    }

    pub fn completed_value(&self) -> RhiResult<u64> {
        self.fence.completed_value()
    }
}
