use anyhow::{anyhow, Result};

use crate::detect::backend::Detector;
use crate::detect::result::Detection;
use crate::frame::RgbRaster;
use crate::geometry::Size;

/// Scripted backend for testing. Returns the same detections for every frame.
pub struct StubDetector {
    input: Size,
    detections: Vec<Detection>,
    calls: u64,
}

impl StubDetector {
    pub fn new(input: Size) -> Self {
        Self {
            input,
            detections: Vec::new(),
            calls: 0,
        }
    }

    /// Detections returned on every call, in this order.
    pub fn with_detections(mut self, detections: Vec<Detection>) -> Self {
        self.detections = detections;
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Detector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
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
        self.calls += 1;
        Ok(self.detections.clone())
    }
}
