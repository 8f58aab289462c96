//! GPU buffer management.
//!
//! Vertex, index and constant buffers live in host-visible memory managed by
//! gpu-allocator. Constant buffers are also created with
//! `SHADER_DEVICE_ADDRESS` so shaders can read a constant record given only
//! its 64-bit address (the Vulkan stand-in for a root constant buffer view).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shapes_rhi::device::Device;
//! use shapes_rhi::buffer::{Buffer, BufferUsage};
//!
//! # fn example(device: Arc<Device>) -> Result<(), shapes_rhi::RhiError> {
//! let indices: [u16; 3] = [0, 1, 2];
//! let index_buffer = Buffer::new_with_data(
//!     device,
//!     BufferUsage::Index,
//!     bytemuck::cast_slice(&indices),
//! )?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::{debug, error};

use crate::backend::{ConstantBuffer, GpuAddress};
use crate::device::Device;
use crate::error::{RhiError, RhiResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    /// Constant records read through buffer device addresses.
    Constant,
}

impl BufferUsage {
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
            BufferUsage::Constant => {
                vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
            }
        }
    }

    /// All buffers are written by the CPU directly; none need a staging copy.
    pub fn memory_location(self) -> MemoryLocation {
        MemoryLocation::CpuToGpu
    }

    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
            BufferUsage::Constant => "constant",
        }
    }
}

/// A persistently mapped buffer.
pub struct Buffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
    usage: BufferUsage,
    address: GpuAddress,
}

impl Buffer {
    /// Creates a new buffer of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero, buffer creation fails or memory
    /// cannot be allocated.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::InvalidHandle(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };

        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocation = device.lock_allocator()?.allocate(&AllocationCreateDesc {
            name: usage.name(),
            requirements,
            location: usage.memory_location(),
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;

        unsafe {
            device
                .handle()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())?;
        }

        let address = if usage == BufferUsage::Constant {
            let info = vk::BufferDeviceAddressInfo::default().buffer(buffer);
            unsafe { device.handle().get_buffer_device_address(&info) }
        } else {
            0
        };

        debug!("Created {} buffer: {} bytes", usage.name(), size);

        Ok(Self {
            device,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
            address,
        })
    }

    /// Creates a buffer sized to `data` and fills it.
    pub fn new_with_data(device: Arc<Device>, usage: BufferUsage, data: &[u8]) -> RhiResult<Self> {
        let buffer = Self::new(device, usage, data.len() as vk::DeviceSize)?;
        buffer.write_data(0, data)?;
        Ok(buffer)
    }

    fn mapped_range(&self, offset: vk::DeviceSize, len: usize) -> RhiResult<*mut u8> {
        let end = offset + len as vk::DeviceSize;
        if end > self.size {
            return Err(RhiError::OutOfBounds {
                offset,
                len: len as u64,
                size: self.size,
            });
        }

        let allocation = self.allocation.as_ref().ok_or_else(|| {
            RhiError::InvalidHandle("Buffer allocation is not available".to_string())
        })?;

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| RhiError::InvalidHandle("Buffer memory is not mapped".to_string()))?;

        Ok(unsafe { (mapped_ptr.as_ptr() as *mut u8).add(offset as usize) })
    }

    /// Copies `data` into the mapping at `offset`.
    pub fn write_data(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let dst = self.mapped_range(offset, data.len())?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
        Ok(())
    }

    /// Copies bytes at `offset` out of the mapping.
    pub fn read_data(&self, offset: vk::DeviceSize, out: &mut [u8]) -> RhiResult<()> {
        if out.is_empty() {
            return Ok(());
        }
        let src = self.mapped_range(offset, out.len())?;
        unsafe {
            std::ptr::copy_nonoverlapping(src as *const u8, out.as_mut_ptr(), out.len());
        }
        Ok(())
    }

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Buffer device address, or 0 for buffers not created as [`BufferUsage::Constant`].
    #[inline]
    pub fn device_address(&self) -> GpuAddress {
        self.address
    }
}

impl ConstantBuffer for Buffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn gpu_address(&self) -> GpuAddress {
        self.address
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> RhiResult<()> {
        self.write_data(offset, data)
    }

    fn read(&self, offset: u64, out: &mut [u8]) -> RhiResult<()> {
        self.read_data(offset, out)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        // Free allocation first, then destroy buffer
        if let Some(allocation) = self.allocation.take() {
            match self.device.lock_allocator() {
                Ok(mut allocator) => {
                    if let Err(e) = allocator.free(allocation) {
                        error!("Failed to free buffer allocation: {:?}", e);
                    }
                }
                Err(e) => error!("Leaking buffer allocation: {}", e),
            }
        }

        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }

        debug!("Destroyed {} buffer", self.usage.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_to_vk_usage() {
        assert!(
            BufferUsage::Vertex
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::VERTEX_BUFFER)
        );
        assert!(
            BufferUsage::Index
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::INDEX_BUFFER)
        );
        let constant = BufferUsage::Constant.to_vk_usage();
        assert!(constant.contains(vk::BufferUsageFlags::UNIFORM_BUFFER));
        assert!(constant.contains(vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS));
    }

    #[test]
    fn test_buffer_usage_memory_location() {
        for usage in [BufferUsage::Vertex, BufferUsage::Index, BufferUsage::Constant] {
            assert_eq!(usage.memory_location(), MemoryLocation::CpuToGpu);
        }
    }

    #[test]
    fn test_buffer_usage_name() {
        assert_eq!(BufferUsage::Vertex.name(), "vertex");
        assert_eq!(BufferUsage::Index.name(), "index");
        assert_eq!(BufferUsage::Constant.name(), "constant");
    }
}
