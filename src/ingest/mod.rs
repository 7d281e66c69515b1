//! Frame ingestion.
//!
//! - `synthetic`: `stub://` capture source producing YUV 4:2:0 `RawFrame`s
//! - `normalize`: YUV 4:2:0 -> RGBA conversion, the first pipeline stage
//!
//! The ingestion layer hands each `RawFrame` to the pipeline by value and
//! never keeps a copy. It MUST NOT:
//! - Retain plane buffers after the frame is released
//! - Log raw frame content

mod normalize;
pub mod synthetic;

pub use normalize::yuv420_to_rgb;
pub use synthetic::{CaptureConfig, CaptureSource, CaptureStats, ChromaLayout};
