use anyhow::{anyhow, Result};

use crate::detect::backend::Detector;
use crate::detect::result::Detection;
use crate::frame::RgbRaster;
use crate::geometry::{Rect, Size};

/// Luma difference that counts a pixel as changed.
const DEFAULT_DIFF_THRESHOLD: u8 = 24;
/// Fewer changed pixels than this is treated as sensor noise.
const DEFAULT_MIN_CHANGED: usize = 16;

/// CPU frame-difference backend.
///
/// Compares each frame's luma with the previous frame's and reports the
/// bounding box of the changed pixels as a single "motion" detection.
/// Confidence is the fraction of the box that actually changed.
///
/// Only the previous frame's luma is retained, never the RGB raster.
pub struct MotionDetector {
    input: Size,
    previous: Option<Vec<u8>>,
    diff_threshold: u8,
    min_changed: usize,
}

impl MotionDetector {
    pub fn new(input: Size) -> Self {
        Self {
            input,
            previous: None,
            diff_threshold: DEFAULT_DIFF_THRESHOLD,
            min_changed: DEFAULT_MIN_CHANGED,
        }
    }

    fn luma(image: &RgbRaster) -> Vec<u8> {
        image
            .pixels()
            .map(|p| {
                let [r, g, b, _] = p.0;
                ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
            })
            .collect()
    }
}

impl Detector for MotionDetector {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn input_size(&self) -> Size {
        self.input
    }

    fn detect(&mut self, image: &RgbRaster) -> Result<Vec<Detection>> {
        let (width, height) = image.dimensions();
        if Size::new(width, height) != self.input {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}",
                width,
                height,
                self.input
            ));
        }

        let current = Self::luma(image);
        let detections = match self.previous.as_deref() {
            Some(previous) => self.changed_region(previous, &current, width as usize),
            None => Vec::new(),
        };
        self.previous = Some(current);
        Ok(detections)
    }
}

impl MotionDetector {
    fn changed_region(&self, previous: &[u8], current: &[u8], width: usize) -> Vec<Detection> {
        let mut changed = 0usize;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (usize::MAX, usize::MAX, 0, 0);
        for (idx, (&now, &before)) in current.iter().zip(previous).enumerate() {
            if now.abs_diff(before) <= self.diff_threshold {
                continue;
            }
            let (x, y) = (idx % width, idx / width);
            changed += 1;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        if changed < self.min_changed {
            return Vec::new();
        }

        let rect = Rect::new(
            min_x as f32,
            min_y as f32,
            (max_x + 1) as f32,
            (max_y + 1) as f32,
        );
        let box_area = ((max_x + 1 - min_x) * (max_y + 1 - min_y)) as f32;
        vec![Detection::new(rect, "motion", changed as f32 / box_area)]
    }
}
