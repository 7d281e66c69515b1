//! Raw capture frames.
//!
//! - `Plane`: one byte buffer plus its row and pixel strides.
//! - `RawFrame`: three planes (Y, U, V) borrowed from the capture side for a
//!   single analysis call.
//! - `RgbRaster`: packed RGBA raster used for every stage after conversion.
//!
//! A `RawFrame` is consumed by value. Dropping it runs the capture side's
//! release hook and zeroizes the plane buffers, so pixel data cannot outlive
//! the stage that extracted it.

use image::RgbaImage;
use zeroize::Zeroize;

use crate::geometry::Size;

/// Packed 32-bit RGBA raster, row-major, no padding.
pub type RgbRaster = RgbaImage;

/// Callback that hands the frame's buffers back to the capture side.
pub type ReleaseHook = Box<dyn FnOnce() + Send + 'static>;

// ----------------------------------------------------------------------------
// Plane
// ----------------------------------------------------------------------------

/// A single image plane.
///
/// `row_stride` is the byte distance between vertically adjacent samples,
/// `pixel_stride` the distance between horizontally adjacent ones (1 for
/// planar chroma, 2 for semi-planar NV12/NV21).
pub struct Plane {
    data: Vec<u8>,
    row_stride: usize,
    pixel_stride: usize,
}

impl Plane {
    pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.data
    }
}

// Explicitly NOT implementing Clone: a plane lives exactly as long as its frame.

// ----------------------------------------------------------------------------
// RawFrame
// ----------------------------------------------------------------------------

/// Planar YUV 4:2:0 frame. Width and height are in luma pixels.
pub struct RawFrame {
    luma: Plane,
    chroma_u: Plane,
    chroma_v: Plane,

    pub width: u32,
    pub height: u32,

    release: Option<ReleaseHook>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, luma: Plane, chroma_u: Plane, chroma_v: Plane) -> Self {
        Self {
            luma,
            chroma_u,
            chroma_v,
            width,
            height,
            release: None,
        }
    }

    /// Register the callback that returns the buffers to the capture side.
    /// It runs exactly once, when the frame is dropped.
    pub fn with_release(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(hook));
        self
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn luma(&self) -> &Plane {
        &self.luma
    }

    pub fn chroma_u(&self) -> &Plane {
        &self.chroma_u
    }

    pub fn chroma_v(&self) -> &Plane {
        &self.chroma_v
    }

    /// Total buffered bytes across the three planes.
    pub fn byte_len(&self) -> usize {
        self.luma.len() + self.chroma_u.len() + self.chroma_v.len()
    }
}

impl Drop for RawFrame {
    fn drop(&mut self) {
        self.luma.data.zeroize();
        self.chroma_u.data.zeroize();
        self.chroma_v.data.zeroize();
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
