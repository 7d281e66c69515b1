//! Per-frame processing.
//!
//! A frame walks a fixed sequence of states:
//!
//! Received -> Converted -> Oriented -> Cropped -> Resized -> Detected
//!          -> Mapped -> Rendered -> Delivered
//!
//! Any stage may instead end the walk in `Failed`. A failure is logged and
//! reported for that frame only; the pipeline carries nothing over to the
//! next one.
//!
//! The raw frame is dropped as soon as conversion has read it, which returns
//! its buffers to the capture side whether or not conversion succeeded.

use log::{debug, warn};

use crate::detect::Detector;
use crate::error::PipelineError;
use crate::frame::{RawFrame, RgbRaster};
use crate::geometry::{Rotation, Size, TransformPlanner};
use crate::ingest::yuv420_to_rgb;
use crate::overlay::{OverlayDetection, OverlayRenderer, OverlayStyle};
use crate::resample::{crop_top_left, resize_exact, warp_affine};

/// One unit of work: a captured frame plus the display state at capture time.
pub struct FrameJob {
    pub frame_id: u64,
    pub frame: RawFrame,
    /// Preview surface size in screen pixels.
    pub viewport: Size,
    /// Clockwise rotation of the device from its natural orientation.
    pub device_rotation: Rotation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    InvalidFrameLayout,
    DegenerateTransform,
    Detector,
    Disconnected,
}

impl From<&PipelineError> for FailureKind {
    fn from(err: &PipelineError) -> Self {
        match err {
            PipelineError::InvalidFrameLayout(_) => Self::InvalidFrameLayout,
            PipelineError::DegenerateTransform(_) => Self::DegenerateTransform,
            PipelineError::Detector(_) => Self::Detector,
            PipelineError::Disconnected => Self::Disconnected,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    Received,
    Converted,
    Oriented,
    Cropped,
    Resized,
    Detected,
    Mapped,
    Rendered,
    Delivered,
    Failed(FailureKind),
}

impl FrameState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed(_))
    }
}

/// Finished overlay for one frame, ready to composite over the preview.
#[derive(Clone, Debug)]
pub struct Overlay {
    pub frame_id: u64,
    pub viewport: Size,
    pub raster: RgbRaster,
    pub detections: Vec<OverlayDetection>,
}

/// Presentation side of the pipeline.
pub trait OverlaySink {
    fn deliver(&mut self, overlay: Overlay) -> Result<(), PipelineError>;
}

impl OverlaySink for Vec<Overlay> {
    fn deliver(&mut self, overlay: Overlay) -> Result<(), PipelineError> {
        self.push(overlay);
        Ok(())
    }
}

/// Outcome of one `process` call.
#[derive(Debug)]
pub struct FrameReport {
    pub frame_id: u64,
    /// Every state the frame passed through, in order, ending in a terminal one.
    pub states: Vec<FrameState>,
    pub error: Option<PipelineError>,
}

impl FrameReport {
    pub fn final_state(&self) -> FrameState {
        self.states
            .last()
            .copied()
            .unwrap_or(FrameState::Received)
    }

    pub fn is_delivered(&self) -> bool {
        self.final_state() == FrameState::Delivered
    }
}

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    /// Clockwise rotation that turns sensor pixels upright.
    pub sensor_orientation: Rotation,
    pub mirror: bool,
    /// Detections below this confidence are not drawn.
    pub confidence_threshold: f32,
    pub style: OverlayStyle,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            sensor_orientation: Rotation::Deg90,
            mirror: false,
            confidence_threshold: 0.0,
            style: OverlayStyle::default(),
        }
    }
}

pub struct FramePipeline {
    detector: Box<dyn Detector>,
    planner: TransformPlanner,
    renderer: OverlayRenderer,
    confidence_threshold: f32,
}

impl FramePipeline {
    pub fn new(detector: Box<dyn Detector>, settings: PipelineSettings) -> Self {
        let planner = TransformPlanner::new(settings.sensor_orientation, detector.input_size())
            .with_mirror(settings.mirror);
        Self {
            detector,
            planner,
            renderer: OverlayRenderer::new(settings.style),
            confidence_threshold: settings.confidence_threshold,
        }
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    pub fn planner(&self) -> &TransformPlanner {
        &self.planner
    }

    pub fn warm_up(&mut self) -> anyhow::Result<()> {
        self.detector.warm_up()
    }

    /// Run one frame to a terminal state and hand the overlay to `sink`.
    pub fn process(&mut self, job: FrameJob, sink: &mut dyn OverlaySink) -> FrameReport {
        let frame_id = job.frame_id;
        let mut states = vec![FrameState::Received];

        let outcome = self
            .run(job, &mut states)
            .and_then(|overlay| sink.deliver(overlay));

        let error = match outcome {
            Ok(()) => {
                states.push(FrameState::Delivered);
                debug!("frame {}: delivered", frame_id);
                None
            }
            Err(e) => {
                states.push(FrameState::Failed(FailureKind::from(&e)));
                warn!("frame {} dropped: {}", frame_id, e);
                Some(e)
            }
        };

        FrameReport {
            frame_id,
            states,
            error,
        }
    }

    fn run(
        &mut self,
        job: FrameJob,
        states: &mut Vec<FrameState>,
    ) -> Result<Overlay, PipelineError> {
        let FrameJob {
            frame_id,
            frame,
            viewport,
            device_rotation,
        } = job;
        let frame_size = frame.size();

        let converted = yuv420_to_rgb(&frame);
        drop(frame);
        let rgb = converted?;
        states.push(FrameState::Converted);

        let plan = self.planner.plan(frame_size, viewport, device_rotation)?;
        let oriented = warp_affine(&rgb, &plan.orient, plan.oriented_size);
        drop(rgb);
        states.push(FrameState::Oriented);
        debug!(
            "frame {}: {} rotated {} -> {}",
            frame_id,
            frame_size,
            plan.applied_rotation.degrees(),
            plan.oriented_size
        );

        let preview = crop_top_left(&oriented, plan.crop)?;
        drop(oriented);
        states.push(FrameState::Cropped);

        let model_input = resize_exact(&preview, plan.model_input)?;
        drop(preview);
        states.push(FrameState::Resized);

        let detections = self
            .detector
            .detect(&model_input)
            .map_err(PipelineError::detector)?;
        drop(model_input);
        states.push(FrameState::Detected);
        debug!(
            "frame {}: {} returned {} detections",
            frame_id,
            self.detector.name(),
            detections.len()
        );

        let threshold = self.confidence_threshold;
        let mapped: Vec<OverlayDetection> = detections
            .into_iter()
            .filter(|d| d.confidence >= threshold)
            .map(|d| {
                let rect = plan.model_to_preview(&d.rect).clamped(viewport);
                OverlayDetection::from_detection(d, rect)
            })
            .collect();
        states.push(FrameState::Mapped);

        let raster = self.renderer.render(viewport, &mapped);
        states.push(FrameState::Rendered);

        Ok(Overlay {
            frame_id,
            viewport,
            raster,
            detections: mapped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Detection, StubDetector};
    use crate::frame::Plane;
    use crate::geometry::Rect;

    fn gray_frame(width: u32, height: u32) -> RawFrame {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        RawFrame::new(
            width,
            height,
            Plane::new(vec![100; w * h], w, 1),
            Plane::new(vec![128; cw * ch], cw, 1),
            Plane::new(vec![128; cw * ch], cw, 1),
        )
    }

    fn job(frame: RawFrame, viewport: Size) -> FrameJob {
        FrameJob {
            frame_id: 1,
            frame,
            viewport,
            device_rotation: Rotation::Deg0,
        }
    }

    struct ClosedSink;

    impl OverlaySink for ClosedSink {
        fn deliver(&mut self, _overlay: Overlay) -> Result<(), PipelineError> {
            Err(PipelineError::Disconnected)
        }
    }

    #[test]
    fn threshold_filters_low_confidence() {
        let detector = StubDetector::new(Size::new(32, 32)).with_detections(vec![
            Detection::new(Rect::new(0.0, 0.0, 8.0, 8.0), "keep", 0.9),
            Detection::new(Rect::new(0.0, 0.0, 8.0, 8.0), "drop", 0.2),
        ]);
        let mut pipeline = FramePipeline::new(
            Box::new(detector),
            PipelineSettings {
                confidence_threshold: 0.5,
                ..PipelineSettings::default()
            },
        );
        let mut sink = Vec::new();
        let report = pipeline.process(job(gray_frame(64, 48), Size::new(48, 64)), &mut sink);

        assert!(report.is_delivered(), "{:?}", report);
        assert_eq!(sink.len(), 1);
        let labels: Vec<&str> = sink[0].detections.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["keep"]);
    }

    #[test]
    fn disconnected_sink_fails_the_frame() {
        let mut pipeline = FramePipeline::new(
            Box::new(StubDetector::new(Size::new(16, 16))),
            PipelineSettings::default(),
        );
        let report = pipeline.process(job(gray_frame(32, 24), Size::new(24, 32)), &mut ClosedSink);
        assert_eq!(
            report.final_state(),
            FrameState::Failed(FailureKind::Disconnected)
        );
        // Rendering finished before the hand-off failed.
        assert_eq!(report.states[report.states.len() - 2], FrameState::Rendered);
    }

    #[test]
    fn empty_viewport_is_degenerate() {
        let mut pipeline = FramePipeline::new(
            Box::new(StubDetector::new(Size::new(16, 16))),
            PipelineSettings::default(),
        );
        let mut sink = Vec::new();
        let report = pipeline.process(job(gray_frame(32, 24), Size::new(0, 32)), &mut sink);
        assert_eq!(
            report.states,
            vec![
                FrameState::Received,
                FrameState::Converted,
                FrameState::Failed(FailureKind::DegenerateTransform),
            ]
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn terminal_states() {
        assert!(FrameState::Delivered.is_terminal());
        assert!(FrameState::Failed(FailureKind::Detector).is_terminal());
        assert!(!FrameState::Mapped.is_terminal());
    }
}
