//! Overlay rendering.
//!
//! Draws detection boxes and labels onto a transparent RGBA canvas the size
//! of the preview viewport. The canvas is meant to be composited over the
//! live preview, so everything not drawn stays fully transparent.

mod font;

use image::Rgba;
use imageproc::drawing::draw_filled_rect_mut;

use crate::detect::Detection;
use crate::frame::RgbRaster;
use crate::geometry::{Rect, Size};

use font::{glyph, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

/// A detection re-expressed in preview coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayDetection {
    pub rect: Rect,
    pub label: String,
    pub confidence: f32,
}

impl OverlayDetection {
    /// Keep label and confidence, replace the rectangle.
    pub fn from_detection(detection: Detection, preview_rect: Rect) -> Self {
        Self {
            rect: preview_rect,
            label: detection.label,
            confidence: detection.confidence,
        }
    }

    /// `"<label>:<confidence>"` with two decimals, e.g. `"person:0.87"`.
    pub fn label_text(&self) -> String {
        format!("{}:{:.2}", self.label, self.confidence)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    /// Box stroke width in pixels, centred on the rectangle edge.
    pub stroke_width: u32,
    pub box_color: Rgba<u8>,
    pub text_color: Rgba<u8>,
    /// Integer magnification of the 5x7 label font.
    pub text_scale: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            stroke_width: 5,
            box_color: Rgba([0, 255, 0, 255]),
            text_color: Rgba([255, 0, 0, 255]),
            text_scale: 4,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Render detections in order; later boxes paint over earlier ones.
    pub fn render(&self, viewport: Size, detections: &[OverlayDetection]) -> RgbRaster {
        let mut canvas = RgbRaster::new(viewport.width, viewport.height);
        for detection in detections {
            self.stroke_rect(&mut canvas, &detection.rect);
            self.draw_label(&mut canvas, &detection.rect, &detection.label_text());
        }
        canvas
    }

    fn stroke_rect(&self, canvas: &mut RgbRaster, rect: &Rect) {
        if ![rect.left, rect.top, rect.right, rect.bottom]
            .iter()
            .all(|v| v.is_finite())
        {
            return;
        }
        let half = self.style.stroke_width as f32 / 2.0;
        let outer = Rect::new(
            rect.left - half,
            rect.top - half,
            rect.right + half,
            rect.bottom + half,
        );
        let inner = Rect::new(
            rect.left + half,
            rect.top + half,
            rect.right - half,
            rect.bottom - half,
        );

        // Pixels whose centre lies in `outer` but not strictly inside `inner`.
        let (w, h) = canvas.dimensions();
        let (w, h) = (w as i64, h as i64);
        let first = |edge: f32, max: i64| ((edge - 0.5).ceil() as i64).clamp(0, max);
        let after = |edge: f32, max: i64| ((edge - 0.5).floor() as i64 + 1).clamp(0, max);
        let (x0, x1) = (first(outer.left, w), first(outer.right, w));
        let (y0, y1) = (first(outer.top, h), first(outer.bottom, h));
        let (ix0, ix1) = (
            after(inner.left, w).clamp(x0, x1.max(x0)),
            first(inner.right, w).clamp(x0, x1.max(x0)),
        );
        let (iy0, iy1) = (
            after(inner.top, h).clamp(y0, y1.max(y0)),
            first(inner.bottom, h).clamp(y0, y1.max(y0)),
        );

        let color = self.style.box_color;
        if ix0 >= ix1 || iy0 >= iy1 {
            fill(canvas, (x0, y0, x1, y1), color);
            return;
        }
        fill(canvas, (x0, y0, x1, iy0), color);
        fill(canvas, (x0, iy1, x1, y1), color);
        fill(canvas, (x0, iy0, ix0, iy1), color);
        fill(canvas, (ix1, iy0, x1, iy1), color);
    }

    /// Label baseline sits on the box's top edge. When that would push the
    /// text off the top of the canvas, it drops inside the box instead.
    fn draw_label(&self, canvas: &mut RgbRaster, rect: &Rect, text: &str) {
        if !rect.left.is_finite() || !rect.top.is_finite() {
            return;
        }
        let scale = self.style.text_scale.max(1) as i64;
        let text_height = GLYPH_HEIGHT as i64 * scale;
        let left = rect.left.round() as i64;
        let mut top = rect.top.round() as i64 - text_height;
        if top < 0 {
            top = rect.top.round() as i64;
        }

        let (w, h) = (canvas.width() as i64, canvas.height() as i64);
        for (i, ch) in text.chars().enumerate() {
            let origin_x = left + i as i64 * GLYPH_ADVANCE as i64 * scale;
            if origin_x >= w {
                break;
            }
            for (row, bits) in glyph(ch).iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    let px = origin_x + col as i64 * scale;
                    let py = top + row as i64 * scale;
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let (x, y) = (px + dx, py + dy);
                            if x >= 0 && y >= 0 && x < w && y < h {
                                canvas.put_pixel(x as u32, y as u32, self.style.text_color);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Fill the half-open pixel box `(x0, y0, x1, y1)`; empty boxes are skipped.
fn fill(canvas: &mut RgbRaster, (x0, y0, x1, y1): (i64, i64, i64, i64), color: Rgba<u8>) {
    if x1 <= x0 || y1 <= y0 {
        return;
    }
    let area = imageproc::rect::Rect::at(x0 as i32, y0 as i32)
        .of_size((x1 - x0) as u32, (y1 - y0) as u32);
    draw_filled_rect_mut(canvas, area, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn hit(rect: Rect) -> OverlayDetection {
        OverlayDetection {
            rect,
            label: "cat".to_string(),
            confidence: 0.5,
        }
    }

    #[test]
    fn empty_list_is_fully_transparent() {
        let canvas = OverlayRenderer::default().render(Size::new(48, 30), &[]);
        assert_eq!(canvas.dimensions(), (48, 30));
        assert!(canvas.pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn label_text_uses_two_decimals() {
        let det = OverlayDetection {
            rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            label: "person".to_string(),
            confidence: 0.87,
        };
        assert_eq!(det.label_text(), "person:0.87");

        let det = OverlayDetection {
            confidence: 1.0,
            ..det
        };
        assert_eq!(det.label_text(), "person:1.00");
    }

    #[test]
    fn box_stroke_is_centred_on_edges() {
        let style = OverlayStyle::default();
        let renderer = OverlayRenderer::new(style);
        let canvas = renderer.render(Size::new(100, 100), &[hit(Rect::new(40.0, 40.0, 80.0, 80.0))]);

        // Edge pixels and the pixels within half a stroke either side.
        assert_eq!(*canvas.get_pixel(60, 40), style.box_color);
        assert_eq!(*canvas.get_pixel(60, 38), style.box_color);
        assert_eq!(*canvas.get_pixel(60, 41), style.box_color);
        assert_eq!(*canvas.get_pixel(79, 60), style.box_color);
        // Well inside and well outside stay clear.
        assert_eq!(*canvas.get_pixel(60, 60), TRANSPARENT);
        assert_eq!(*canvas.get_pixel(60, 90), TRANSPARENT);
    }

    #[test]
    fn stroke_covers_exactly_the_centred_band() {
        let style = OverlayStyle::default();
        let renderer = OverlayRenderer::new(style);
        let rects = [
            Rect::new(10.25, 12.5, 50.75, 40.0),
            Rect::new(-6.0, -3.0, 30.0, 20.0),
            Rect::new(40.0, 30.0, 90.0, 70.0),
            Rect::new(20.0, 20.0, 22.0, 23.0),
        ];
        for rect in rects {
            let mut canvas = RgbRaster::new(64, 48);
            renderer.stroke_rect(&mut canvas, &rect);
            let half = style.stroke_width as f32 / 2.0;
            for (x, y, p) in canvas.enumerate_pixels() {
                let (cx, cy) = (x as f32 + 0.5, y as f32 + 0.5);
                let in_outer = cx >= rect.left - half
                    && cx < rect.right + half
                    && cy >= rect.top - half
                    && cy < rect.bottom + half;
                let in_inner = cx > rect.left + half
                    && cx < rect.right - half
                    && cy > rect.top + half
                    && cy < rect.bottom - half;
                let expected = if in_outer && !in_inner {
                    style.box_color
                } else {
                    TRANSPARENT
                };
                assert_eq!(*p, expected, "{:?} at ({}, {})", rect, x, y);
            }
        }
    }

    #[test]
    fn label_sits_above_box_when_room() {
        let style = OverlayStyle {
            text_scale: 1,
            ..OverlayStyle::default()
        };
        let renderer = OverlayRenderer::new(style);
        let canvas = renderer.render(Size::new(100, 100), &[hit(Rect::new(40.0, 50.0, 90.0, 90.0))]);

        let text_pixels: Vec<(u32, u32)> = canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == style.text_color)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!text_pixels.is_empty());
        assert!(text_pixels.iter().all(|&(x, y)| (43..50).contains(&y) && x >= 40));
    }

    #[test]
    fn label_drops_inside_box_at_canvas_top() {
        let style = OverlayStyle::default();
        let renderer = OverlayRenderer::new(style);
        let canvas = renderer.render(Size::new(200, 100), &[hit(Rect::new(10.0, 0.0, 150.0, 90.0))]);
        let has_text = canvas.pixels().any(|p| *p == style.text_color);
        assert!(has_text);
    }

    #[test]
    fn boxes_outside_canvas_are_clipped() {
        let renderer = OverlayRenderer::default();
        let canvas = renderer.render(
            Size::new(20, 20),
            &[
                hit(Rect::new(-50.0, -50.0, -10.0, -10.0)),
                hit(Rect::new(f32::NAN, 0.0, 5.0, 5.0)),
            ],
        );
        assert!(canvas.pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn later_boxes_paint_over_earlier_ones() {
        let renderer = OverlayRenderer::default();
        let first = OverlayDetection {
            rect: Rect::new(10.0, 10.0, 40.0, 40.0),
            label: " ".to_string(),
            confidence: 0.0,
        };
        let canvas = renderer.render(Size::new(60, 60), &[first.clone(), first]);
        assert_eq!(*canvas.get_pixel(25, 10), renderer.style().box_color);
    }
}
