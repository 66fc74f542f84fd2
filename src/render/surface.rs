//! Caller-owned pixel surfaces
//!
//! A [`RenderTarget`] is whatever pixel buffer the host hands over: a window
//! surface, a bitmap object, or a plain [`OwnedSurface`]. The pipeline locks
//! it right before rasterizing and the [`SurfaceLock`] guard unlocks it on
//! every exit path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pixel layout of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 4 bytes, R G B A in memory
    Rgba8888,
    /// 2 bytes, native-endian 5-6-5
    Rgb565,
    /// 1 byte coverage
    Alpha8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8888 => 4,
            PixelFormat::Rgb565 => 2,
            PixelFormat::Alpha8 => 1,
        }
    }
}

/// Geometry of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceInfo {
    pub width: u32,
    pub height: u32,
    /// Bytes per row
    pub stride: usize,
    pub format: PixelFormat,
}

impl SurfaceInfo {
    /// Bytes a buffer must hold for this geometry
    pub fn required_len(&self) -> usize {
        match self.height {
            0 => 0,
            h => self.stride * (h as usize - 1) + self.width as usize * self.format.bytes_per_pixel(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface does not support reconfiguration")]
    Unsupported,

    #[error("failed to set buffer geometry: {0}")]
    Configure(String),

    #[error("locking the surface failed: {0}")]
    Lock(String),
}

/// A writable pixel buffer owned by the host
pub trait RenderTarget {
    fn info(&self) -> SurfaceInfo;

    /// Switch the surface to `format`, keeping its width and height
    fn set_format(&mut self, _format: PixelFormat) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported)
    }

    fn lock(&mut self) -> Result<(), SurfaceError>;

    /// Pixel memory; only valid between `lock` and `unlock`
    fn pixels_mut(&mut self) -> &mut [u8];

    fn unlock(&mut self);
}

/// RAII guard - unlocks the surface on drop
pub struct SurfaceLock<'a, T: RenderTarget + ?Sized> {
    target: &'a mut T,
}

impl<'a, T: RenderTarget + ?Sized> SurfaceLock<'a, T> {
    pub fn acquire(target: &'a mut T) -> Result<Self, SurfaceError> {
        target.lock()?;
        Ok(Self { target })
    }

    pub fn info(&self) -> SurfaceInfo {
        self.target.info()
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        self.target.pixels_mut()
    }
}

impl<T: RenderTarget + ?Sized> Drop for SurfaceLock<'_, T> {
    fn drop(&mut self) {
        self.target.unlock();
    }
}

/// Heap-backed surface
///
/// Counts lock/unlock calls and can be told to fail locking, which makes it
/// the target of choice for exercising the pipeline's abort paths.
#[derive(Debug, Clone)]
pub struct OwnedSurface {
    info: SurfaceInfo,
    data: Vec<u8>,
    locked: bool,
    lock_calls: usize,
    unlock_calls: usize,
    fail_lock: bool,
    reconfigurable: bool,
}

impl OwnedSurface {
    /// Tightly packed surface
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let stride = width as usize * format.bytes_per_pixel();
        Self::with_stride(width, height, stride, format)
    }

    /// Surface with row padding (`stride` is raised to the packed row size)
    pub fn with_stride(width: u32, height: u32, stride: usize, format: PixelFormat) -> Self {
        let stride = stride.max(width as usize * format.bytes_per_pixel());
        let info = SurfaceInfo {
            width,
            height,
            stride,
            format,
        };
        Self {
            info,
            data: vec![0; stride * height as usize],
            locked: false,
            lock_calls: 0,
            unlock_calls: 0,
            fail_lock: false,
            reconfigurable: true,
        }
    }

    /// Make every later `lock` fail
    pub fn failing_lock(mut self) -> Self {
        self.fail_lock = true;
        self
    }

    /// Refuse `set_format`
    pub fn fixed_format(mut self) -> Self {
        self.reconfigurable = false;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock_calls(&self) -> usize {
        self.lock_calls
    }

    pub fn unlock_calls(&self) -> usize {
        self.unlock_calls
    }

    /// Pixel at (x, y) as `[r, g, b, a]` for RGBA surfaces
    pub fn rgba_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if self.info.format != PixelFormat::Rgba8888
            || x >= self.info.width
            || y >= self.info.height
        {
            return None;
        }
        let at = y as usize * self.info.stride + x as usize * 4;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[at..at + 4]);
        Some(px)
    }

    /// Pixel at (x, y) for RGB_565 surfaces
    pub fn rgb565_at(&self, x: u32, y: u32) -> Option<u16> {
        if self.info.format != PixelFormat::Rgb565 || x >= self.info.width || y >= self.info.height
        {
            return None;
        }
        let at = y as usize * self.info.stride + x as usize * 2;
        Some(u16::from_ne_bytes([self.data[at], self.data[at + 1]]))
    }

    /// Copy an RGBA surface into an image buffer (row padding removed)
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        if self.info.format != PixelFormat::Rgba8888 {
            return None;
        }
        let row_bytes = self.info.width as usize * 4;
        let mut packed = Vec::with_capacity(row_bytes * self.info.height as usize);
        for row in 0..self.info.height as usize {
            let start = row * self.info.stride;
            packed.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        image::RgbaImage::from_raw(self.info.width, self.info.height, packed)
    }
}

impl RenderTarget for OwnedSurface {
    fn info(&self) -> SurfaceInfo {
        self.info
    }

    fn set_format(&mut self, format: PixelFormat) -> Result<(), SurfaceError> {
        if !self.reconfigurable {
            return Err(SurfaceError::Unsupported);
        }
        if format == self.info.format {
            return Ok(());
        }
        let stride = self.info.width as usize * format.bytes_per_pixel();
        self.info = SurfaceInfo {
            stride,
            format,
            ..self.info
        };
        self.data = vec![0; stride * self.info.height as usize];
        Ok(())
    }

    fn lock(&mut self) -> Result<(), SurfaceError> {
        self.lock_calls += 1;
        if self.fail_lock {
            return Err(SurfaceError::Lock("surface refused lock".to_string()));
        }
        self.locked = true;
        Ok(())
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn unlock(&mut self) {
        self.unlock_calls += 1;
        self.locked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_guard_unlocks_on_drop() {
        let mut surface = OwnedSurface::new(2, 2, PixelFormat::Rgba8888);
        {
            let mut lock = SurfaceLock::acquire(&mut surface).unwrap();
            lock.pixels_mut()[0] = 9;
        }
        assert!(!surface.is_locked());
        assert_eq!(surface.lock_calls(), 1);
        assert_eq!(surface.unlock_calls(), 1);
        assert_eq!(surface.data()[0], 9);
    }

    #[test]
    fn test_failed_lock_does_not_unlock() {
        let mut surface = OwnedSurface::new(2, 2, PixelFormat::Rgba8888).failing_lock();
        assert!(SurfaceLock::acquire(&mut surface).is_err());
        assert_eq!(surface.unlock_calls(), 0);
    }

    #[test]
    fn test_set_format_reallocates() {
        let mut surface = OwnedSurface::new(3, 2, PixelFormat::Alpha8);
        surface.set_format(PixelFormat::Rgba8888).unwrap();
        let info = surface.info();
        assert_eq!(info.stride, 12);
        assert_eq!(surface.data().len(), 24);

        let mut fixed = OwnedSurface::new(3, 2, PixelFormat::Alpha8).fixed_format();
        assert!(fixed.set_format(PixelFormat::Rgba8888).is_err());
    }

    #[test]
    fn test_to_rgba_image_strips_padding() {
        let surface = OwnedSurface::with_stride(2, 2, 16, PixelFormat::Rgba8888);
        let image = surface.to_rgba_image().unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.as_raw().len(), 16);
    }

    #[test]
    fn test_required_len() {
        let info = SurfaceInfo {
            width: 2,
            height: 3,
            stride: 10,
            format: PixelFormat::Rgba8888,
        };
        assert_eq!(info.required_len(), 28);
    }
}
