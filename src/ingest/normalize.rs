use image::Rgba;

use crate::error::PipelineError;
use crate::frame::{Plane, RawFrame, RgbRaster};

/// Chroma planes are subsampled 2x in both directions (4:2:0).
const CHROMA_SHIFT: usize = 1;

/// Fixed-point channel ceiling: 2^18 - 1, i.e. 255 << 10 plus rounding room.
const MAX_CHANNEL: i32 = 262_143;

/// Convert a YUV 4:2:0 frame to RGBA.
///
/// Plane geometry comes entirely from the strides, so planar (I420) and
/// semi-planar (NV12/NV21) chroma both work. Every plane is bounds-checked
/// before the first read.
pub fn yuv420_to_rgb(frame: &RawFrame) -> Result<RgbRaster, PipelineError> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    if width == 0 || height == 0 {
        return Err(PipelineError::layout(format!(
            "frame has zero dimension {}x{}",
            width, height
        )));
    }

    let chroma_w = (width + 1) >> CHROMA_SHIFT;
    let chroma_h = (height + 1) >> CHROMA_SHIFT;
    check_plane("luma", frame.luma(), width, height)?;
    check_plane("chroma U", frame.chroma_u(), chroma_w, chroma_h)?;
    check_plane("chroma V", frame.chroma_v(), chroma_w, chroma_h)?;

    let (y_plane, u_plane, v_plane) = (frame.luma(), frame.chroma_u(), frame.chroma_v());
    let (y_bytes, u_bytes, v_bytes) = (y_plane.bytes(), u_plane.bytes(), v_plane.bytes());

    let mut rgb = RgbRaster::new(frame.width, frame.height);
    for (i, j, pixel) in rgb.enumerate_pixels_mut() {
        let (i, j) = (i as usize, j as usize);
        let y = y_bytes[j * y_plane.row_stride() + i * y_plane.pixel_stride()];
        let (ci, cj) = (i >> CHROMA_SHIFT, j >> CHROMA_SHIFT);
        let u = u_bytes[cj * u_plane.row_stride() + ci * u_plane.pixel_stride()];
        let v = v_bytes[cj * v_plane.row_stride() + ci * v_plane.pixel_stride()];
        *pixel = yuv_to_rgba(y, u, v);
    }

    Ok(rgb)
}

/// Validate that `rows x cols` samples can be read from `plane`.
fn check_plane(name: &str, plane: &Plane, cols: usize, rows: usize) -> Result<(), PipelineError> {
    if plane.pixel_stride() == 0 {
        return Err(PipelineError::layout(format!(
            "{} plane has zero pixel stride",
            name
        )));
    }
    let row_span = (cols - 1)
        .checked_mul(plane.pixel_stride())
        .and_then(|v| v.checked_add(1))
        .ok_or_else(|| PipelineError::layout(format!("{} plane row span overflows", name)))?;
    if plane.row_stride() < row_span {
        return Err(PipelineError::layout(format!(
            "{} plane row stride {} shorter than row span {}",
            name,
            plane.row_stride(),
            row_span
        )));
    }
    let required = (rows - 1)
        .checked_mul(plane.row_stride())
        .and_then(|v| v.checked_add(row_span))
        .ok_or_else(|| PipelineError::layout(format!("{} plane size overflows", name)))?;
    if plane.len() < required {
        return Err(PipelineError::layout(format!(
            "{} plane holds {} bytes, need {}",
            name,
            plane.len(),
            required
        )));
    }
    Ok(())
}

/// BT.601 limited-range conversion in 10-bit fixed point.
///
/// Float equivalent:
/// r = 1.164*(y-16) + 1.596*(v-128)
/// g = 1.164*(y-16) - 0.813*(v-128) - 0.391*(u-128)
/// b = 1.164*(y-16) + 2.018*(u-128)
fn yuv_to_rgba(y: u8, u: u8, v: u8) -> Rgba<u8> {
    let y = (y as i32 - 16).max(0);
    let u = u as i32 - 128;
    let v = v as i32 - 128;

    let y1192 = 1192 * y;
    let r = (y1192 + 1634 * v).clamp(0, MAX_CHANNEL);
    let g = (y1192 - 833 * v - 400 * u).clamp(0, MAX_CHANNEL);
    let b = (y1192 + 2066 * u).clamp(0, MAX_CHANNEL);

    Rgba([(r >> 10) as u8, (g >> 10) as u8, (b >> 10) as u8, u8::MAX])
}
