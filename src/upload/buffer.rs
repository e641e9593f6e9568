use bytemuck::Pod;
use wgpu::util::DeviceExt;

use super::Upload;
use crate::errors::{Result, SyncError};

/// Staging upload into a region of a GPU buffer.
///
/// Owns a `COPY_SRC` staging buffer holding the source bytes and a handle to
/// the destination. Recording the upload issues one `copy_buffer_to_buffer`;
/// dropping it releases the staging buffer.
#[derive(Debug)]
pub struct BufferUpload {
    staging: wgpu::Buffer,
    target: wgpu::Buffer,
    target_offset: wgpu::BufferAddress,
    size: wgpu::BufferAddress,
}

impl BufferUpload {
    /// Creates the staging buffer from `data`.
    ///
    /// `data.len()` and `target_offset` must be multiples of
    /// [`wgpu::COPY_BUFFER_ALIGNMENT`], `target` must have
    /// [`wgpu::BufferUsages::COPY_DST`], and the copied range must lie inside
    /// `target`.
    pub fn new(
        device: &wgpu::Device,
        data: &[u8],
        target: &wgpu::Buffer,
        target_offset: wgpu::BufferAddress,
        label: Option<&str>,
    ) -> Result<Self> {
        let size = data.len() as wgpu::BufferAddress;
        for value in [size, target_offset] {
            if !value.is_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT) {
                return Err(SyncError::MisalignedCopy { value });
            }
        }

        if !target.usage().contains(wgpu::BufferUsages::COPY_DST) {
            return Err(SyncError::CopyTargetUsage {
                usage: target.usage(),
            });
        }

        let target_size = target.size();
        if target_offset
            .checked_add(size)
            .is_none_or(|end| end > target_size)
        {
            return Err(SyncError::CopyOutOfBounds {
                offset: target_offset,
                size,
                target_size,
            });
        }

        let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label.unwrap_or("Staging Buffer")),
            contents: data,
            usage: wgpu::BufferUsages::COPY_SRC,
        });

        Ok(Self {
            staging,
            target: target.clone(),
            target_offset,
            size,
        })
    }

    /// Same as [`new`](Self::new) for a slice of plain-old-data values.
    pub fn from_pod<T: Pod>(
        device: &wgpu::Device,
        data: &[T],
        target: &wgpu::Buffer,
        target_offset: wgpu::BufferAddress,
        label: Option<&str>,
    ) -> Result<Self> {
        Self::new(
            device,
            bytemuck::cast_slice(data),
            target,
            target_offset,
            label,
        )
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> wgpu::BufferAddress {
        self.size
    }

    #[inline]
    #[must_use]
    pub fn target_offset(&self) -> wgpu::BufferAddress {
        self.target_offset
    }
}

impl Upload<wgpu::CommandEncoder> for BufferUpload {
    fn upload(&mut self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_buffer_to_buffer(
            &self.staging,
            0,
            &self.target,
            self.target_offset,
            self.size,
        );
    }
}
