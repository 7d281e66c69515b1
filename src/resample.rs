//! Raster resampling for the orient, crop and resize stages.

use image::imageops::{self, FilterType};
use image::Rgba;

use crate::error::PipelineError;
use crate::frame::RgbRaster;
use crate::geometry::{AffineTransform, Point, Size};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Render `src` through `transform` onto a fresh `dst`-sized raster.
///
/// Each destination pixel centre is pulled back through the inverse and
/// sampled nearest-neighbour. Destination pixels with no source pixel stay
/// transparent.
pub fn warp_affine(src: &RgbRaster, transform: &AffineTransform, dst: Size) -> RgbRaster {
    let (sw, sh) = src.dimensions();
    let mut out = RgbRaster::new(dst.width, dst.height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let p = transform.inverse_map_point(Point::new(x as f64 + 0.5, y as f64 + 0.5));
        let (sx, sy) = (p.x.floor(), p.y.floor());
        *pixel = if sx >= 0.0 && sy >= 0.0 && sx < sw as f64 && sy < sh as f64 {
            *src.get_pixel(sx as u32, sy as u32)
        } else {
            TRANSPARENT
        };
    }
    out
}

/// Copy the `size` region anchored at the top-left corner of `src`.
pub fn crop_top_left(src: &RgbRaster, size: Size) -> Result<RgbRaster, PipelineError> {
    let (w, h) = src.dimensions();
    if size.is_empty() || !Size::new(w, h).contains(size) {
        return Err(PipelineError::degenerate(format!(
            "crop {} does not fit in {}x{}",
            size, w, h
        )));
    }
    Ok(imageops::crop_imm(src, 0, 0, size.width, size.height).to_image())
}

/// Stretch `src` to exactly `size`, ignoring aspect ratio.
///
/// Equivalent to warping through a zero-rotation transform between the two
/// sizes, but filtered so small objects survive heavy downscaling.
pub fn resize_exact(src: &RgbRaster, size: Size) -> Result<RgbRaster, PipelineError> {
    if size.is_empty() || src.width() == 0 || src.height() == 0 {
        return Err(PipelineError::degenerate(format!(
            "cannot resize {}x{} to {}",
            src.width(),
            src.height(),
            size
        )));
    }
    if src.dimensions() == (size.width, size.height) {
        return Ok(src.clone());
    }
    Ok(imageops::resize(
        src,
        size.width,
        size.height,
        FilterType::Triangle,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{build_transform, Rotation};

    fn marked(width: u32, height: u32) -> RgbRaster {
        let mut img = RgbRaster::from_pixel(width, height, Rgba([10, 10, 10, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img
    }

    #[test]
    fn identity_warp_copies_pixels() {
        let src = marked(7, 5);
        let t = build_transform(Size::new(7, 5), Size::new(7, 5), Rotation::Deg0, false).unwrap();
        assert_eq!(warp_affine(&src, &t, Size::new(7, 5)), src);
    }

    #[test]
    fn quarter_turn_moves_top_left_to_top_right() {
        let src = marked(4, 2);
        let t = build_transform(Size::new(4, 2), Size::new(2, 4), Rotation::Deg90, false).unwrap();
        let out = warp_affine(&src, &t, Size::new(2, 4));
        assert_eq!(out.dimensions(), (2, 4));
        assert_eq!(*out.get_pixel(1, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(0, 0), Rgba([10, 10, 10, 255]));
    }

    #[test]
    fn mirror_moves_marker_to_right_edge() {
        let src = marked(6, 3);
        let t = build_transform(Size::new(6, 3), Size::new(6, 3), Rotation::Deg0, true).unwrap();
        let out = warp_affine(&src, &t, Size::new(6, 3));
        assert_eq!(*out.get_pixel(5, 0), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn uncovered_destination_is_transparent() {
        let src = marked(4, 4);
        let t = AffineTransform::identity();
        let out = warp_affine(&src, &t, Size::new(6, 6));
        assert_eq!(*out.get_pixel(5, 5), TRANSPARENT);
        assert_eq!(*out.get_pixel(3, 3), Rgba([10, 10, 10, 255]));
    }

    #[test]
    fn crop_keeps_top_left_region() {
        let src = marked(10, 8);
        let out = crop_top_left(&src, Size::new(3, 2)).unwrap();
        assert_eq!(out.dimensions(), (3, 2));
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn oversized_crop_is_degenerate() {
        let src = marked(10, 8);
        for size in [Size::new(11, 8), Size::new(10, 9), Size::new(0, 4)] {
            assert!(matches!(
                crop_top_left(&src, size),
                Err(PipelineError::DegenerateTransform(_))
            ));
        }
    }

    #[test]
    fn resize_stretches_to_exact_size() {
        let src = marked(30, 60);
        let out = resize_exact(&src, Size::new(16, 16)).unwrap();
        assert_eq!(out.dimensions(), (16, 16));
        assert!(resize_exact(&src, Size::new(0, 16)).is_err());
    }
}
