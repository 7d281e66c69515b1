//! Frame Overlay
//!
//! Turns live camera frames into detection overlays aligned with the on-screen
//! preview.
//!
//! # Architecture
//!
//! Every frame takes the same path:
//!
//! 1. **Convert**: YUV 4:2:0 planes -> packed RGBA (`ingest`).
//! 2. **Orient**: rotate the sensor image upright and scale it to fill the
//!    preview (`geometry`, `resample`).
//! 3. **Crop**: cut the preview-sized region from the top-left corner.
//! 4. **Resize**: stretch the preview crop to the detector's fixed input size.
//! 5. **Detect**: run the injected `Detector` (`detect`).
//! 6. **Map back**: invert the model-input transform so detections land in
//!    preview coordinates.
//! 7. **Render**: boxes and labels on a transparent canvas (`overlay`).
//!
//! `dispatch` runs this on one worker thread with at most one frame in flight
//! and hands overlays to the presentation side.
//!
//! # Module Structure
//!
//! - `frame`: capture-side frame and plane types
//! - `geometry`: sizes, rotations, affine transforms, per-frame planning
//! - `pipeline`: the per-frame state machine
//! - `dispatch`: worker thread, single-flight gate, presenter
//! - `config`: JSON file + environment configuration

pub mod config;
pub mod detect;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod overlay;
pub mod pipeline;
pub mod resample;

pub use detect::{BackendRegistry, Detection, Detector, MotionDetector, StubDetector};
pub use dispatch::{DispatchStats, Dispatcher, OverlayReceiver, Presenter, Submission};
pub use error::PipelineError;
pub use frame::{Plane, RawFrame, RgbRaster};
pub use geometry::{
    build_transform, AffineTransform, FramePlan, Matrix, Point, Rect, Rotation, Size,
    TransformPlanner,
};
pub use ingest::{yuv420_to_rgb, CaptureConfig, CaptureSource, ChromaLayout};
pub use overlay::{OverlayDetection, OverlayRenderer, OverlayStyle};
pub use pipeline::{
    FailureKind, FrameJob, FramePipeline, FrameReport, FrameState, Overlay, OverlaySink,
    PipelineSettings,
};
