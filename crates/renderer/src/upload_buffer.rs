//! Typed arrays of constant records in a CPU-writable buffer.
//!
//! Elements are laid out at the backend's constant alignment, so element `i`
//! lives at `gpu_address() + i * stride()`. That address is what a draw binds.

use std::marker::PhantomData;

use bytemuck::Pod;
use shapes_rhi::{Backend, ConstantBuffer, GpuAddress, RhiResult, align_constant_size};

/// A fixed-length array of `T` records.
pub struct UploadBuffer<B, T> {
    buffer: B,
    len: usize,
    stride: u64,
    _marker: PhantomData<T>,
}

impl<B: ConstantBuffer, T: Pod> UploadBuffer<B, T> {
    /// Allocates room for `len` records from `backend`.
    pub fn new<Bk>(backend: &mut Bk, len: usize, label: &str) -> RhiResult<Self>
    where
        Bk: Backend<Buffer = B>,
    {
        let stride = align_constant_size(
            std::mem::size_of::<T>() as u64,
            backend.constant_buffer_alignment(),
        );
        // Keep one record even for empty arrays so the buffer has a valid address.
        let buffer = backend.create_constant_buffer(stride * len.max(1) as u64, label)?;
        Ok(Self {
            buffer,
            len,
            stride,
            _marker: PhantomData,
        })
    }

    /// Writes `value` into record `index`.
    pub fn copy_data(&mut self, index: usize, value: &T) -> RhiResult<()> {
        debug_assert!(
            index < self.len,
            "constant index {} out of range ({} records)",
            index,
            self.len
        );
        self.buffer
            .write(index as u64 * self.stride, bytemuck::bytes_of(value))
    }

    /// Reads record `index` back from the CPU side of the buffer.
    pub fn read(&self, index: usize) -> RhiResult<T> {
        let mut bytes = vec![0u8; std::mem::size_of::<T>()];
        self.buffer.read(index as u64 * self.stride, &mut bytes)?;
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }

    /// GPU address of record `index`.
    #[inline]
    pub fn address_of(&self, index: usize) -> GpuAddress {
        debug_assert!(index < self.len.max(1));
        self.buffer.gpu_address() + index as u64 * self.stride
    }

    /// Distance between records: the record size rounded up to the alignment.
    #[inline]
    pub fn stride(&self) -> u64 {
        self.stride
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn buffer(&self) -> &B {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ObjectConstants, PassConstants};
    use bytemuck::Zeroable;
    use glam::{Mat4, Vec3};
    use shapes_rhi::{QueueMode, SoftwareBackend};

    #[test]
    fn test_stride_is_aligned_size() {
        let mut backend = SoftwareBackend::new(QueueMode::Immediate);
        let objects = UploadBuffer::<_, ObjectConstants>::new(&mut backend, 4, "objects").unwrap();
        assert_eq!(objects.stride(), 256);
        assert_eq!(objects.buffer().size(), 1024);

        let pass = UploadBuffer::<_, PassConstants>::new(&mut backend, 1, "pass").unwrap();
        assert_eq!(pass.stride(), 1280);
    }

    #[test]
    fn test_address_of() {
        let mut backend = SoftwareBackend::new(QueueMode::Immediate);
        let objects = UploadBuffer::<_, ObjectConstants>::new(&mut backend, 22, "objects").unwrap();
        let base = objects.buffer().gpu_address();
        assert_eq!(objects.address_of(0), base);
        assert_eq!(objects.address_of(5), base + 5 * 256);
    }

    #[test]
    fn test_copy_and_read() {
        let mut backend = SoftwareBackend::new(QueueMode::Immediate);
        let mut objects =
            UploadBuffer::<_, ObjectConstants>::new(&mut backend, 3, "objects").unwrap();
        let record = ObjectConstants {
            world: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            tex_transform: Mat4::IDENTITY,
        };
        objects.copy_data(2, &record).unwrap();
        assert_eq!(objects.read(2).unwrap(), record);
        assert_eq!(objects.read(1).unwrap(), ObjectConstants::zeroed());
    }

    #[test]
    fn test_empty_array_still_allocates() {
        let mut backend = SoftwareBackend::new(QueueMode::Immediate);
        let empty = UploadBuffer::<_, ObjectConstants>::new(&mut backend, 0, "empty").unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.buffer().size(), 256);
    }
}
