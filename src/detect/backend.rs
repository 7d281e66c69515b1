use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::RgbRaster;
use crate::geometry::Size;

/// Object detector boundary.
///
/// The pipeline owns exactly one detector and calls it synchronously on its
/// worker thread, once per frame, with a raster of exactly `input_size()`.
/// Rectangles come back in that raster's pixel coordinates.
///
/// Implementations must treat the raster as read-only and ephemeral: nothing
/// derived from it may be written to disk or sent over the network, and the
/// raster itself must not be kept past the call.
pub trait Detector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Fixed model input size.
    fn input_size(&self) -> Size;

    /// Run detection. Errors are reported, never retried.
    fn detect(&mut self, image: &RgbRaster) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
