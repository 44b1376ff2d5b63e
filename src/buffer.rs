//! Shared-memory pixel buffers
//!
//! A [`PixelBuffer`] is a read/write mapping of an anonymous shm region plus
//! the compositor-side handle the region was registered under. Pixels are
//! ARGB8888, stored little-endian as `[B, G, R, A]`.

use crate::presenter::Presenter;
use crate::shm::{self, ShmError};
use log::debug;
use memmap2::{MmapMut, MmapOptions};
use std::os::fd::AsFd;
use thiserror::Error;

/// Bytes per ARGB8888 pixel
pub const BYTES_PER_PIXEL: u32 = 4;

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("invalid buffer size {width}x{height}")]
    InvalidLayout { width: u32, height: u32 },

    #[error(transparent)]
    Allocation(#[from] ShmError),

    #[error("failed to map shared memory: {0}")]
    Map(#[source] std::io::Error),
}

/// Geometry of a pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayout {
    pub width: u32,
    pub height: u32,
    /// Bytes per row, always `width * 4`
    pub stride: u32,
}

impl BufferLayout {
    /// Layout for a `width` x `height` buffer.
    ///
    /// Fails for zero dimensions or when the stride or total size would not
    /// fit the protocol's signed 32-bit fields.
    pub fn new(width: u32, height: u32) -> Result<Self, BufferError> {
        let invalid = BufferError::InvalidLayout { width, height };
        if width == 0 || height == 0 {
            return Err(invalid);
        }

        let stride = width.checked_mul(BYTES_PER_PIXEL).ok_or(invalid)?;
        let size = (stride as u64) * (height as u64);
        if stride > i32::MAX as u32 || size > i32::MAX as u64 {
            return Err(BufferError::InvalidLayout { width, height });
        }

        Ok(Self {
            width,
            height,
            stride,
        })
    }

    /// Total size in bytes (`height * stride`)
    pub fn size(&self) -> usize {
        self.height as usize * self.stride as usize
    }

    /// Byte offset of pixel `(x, y)`
    pub fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride as usize + x as usize * BYTES_PER_PIXEL as usize
    }
}

pub struct PixelBuffer<B> {
    mmap: MmapMut,
    layout: BufferLayout,
    handle: B,
}

impl<B> PixelBuffer<B> {
    /// Allocate, map and register a new buffer.
    ///
    /// Nothing is left behind on failure: the shm handle is closed and no
    /// mapping survives. On success the handle is closed as well, leaving the
    /// mapping (and the compositor's copy of the descriptor) as the only
    /// owners of the memory.
    pub fn allocate<P>(presenter: &mut P, width: u32, height: u32) -> Result<Self, BufferError>
    where
        P: Presenter<Buffer = B>,
    {
        let layout = BufferLayout::new(width, height)?;
        let file = shm::allocate(layout.size() as u64)?;

        // SAFETY: the region is anonymous and only shared with the compositor,
        // which never truncates it.
        let mmap = unsafe { MmapOptions::new().len(layout.size()).map_mut(&file) }
            .map_err(BufferError::Map)?;

        let handle = presenter.create_buffer(file.as_fd(), &layout)?;
        drop(file);

        debug!(
            "Mapped {}x{} buffer (stride {}, {} bytes)",
            layout.width,
            layout.height,
            layout.stride,
            layout.size()
        );

        Ok(Self {
            mmap,
            layout,
            handle,
        })
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    pub fn handle(&self) -> &B {
        &self.handle
    }

    pub fn pixels(&self) -> &[u8] {
        &self.mmap
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    /// Split into the mapping-free handle, unmapping the pixels.
    pub fn into_handle(self) -> B {
        let Self { mmap, handle, .. } = self;
        drop(mmap);
        handle
    }
}
