//! Synthetic capture source.
//!
//! `stub://` URLs produce YUV 4:2:0 frames without touching hardware: a dim
//! luma gradient with a bright square that sweeps left to right, which gives
//! the motion detector something to find. Chroma is emitted either fully
//! planar (I420) or semi-planar (NV12) so both converter paths get exercised.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::frame::{Plane, RawFrame};
use crate::geometry::Size;

/// Side of the moving square, in luma pixels.
const SQUARE_SIDE: u32 = 64;
/// Horizontal travel per frame.
const SQUARE_STEP: u32 = 12;
const SQUARE_LUMA: u8 = 235;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChromaLayout {
    /// Separate U and V planes, pixel stride 1.
    Planar,
    /// Interleaved UV, pixel stride 2.
    #[default]
    SemiPlanar,
}

impl ChromaLayout {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "planar" | "i420" => Some(Self::Planar),
            "semi-planar" | "semiplanar" | "nv12" => Some(Self::SemiPlanar),
            _ => None,
        }
    }
}

/// Configuration for a capture source.
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Source URL; only `stub://` is built in.
    pub url: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    pub chroma_layout: ChromaLayout,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
            chroma_layout: ChromaLayout::SemiPlanar,
        }
    }
}

/// Frame counters for health logging.
#[derive(Clone, Debug)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub frames_released: u64,
    pub url: String,
}

/// Capture source producing `RawFrame`s.
pub struct CaptureSource {
    config: CaptureConfig,
    frame_count: u64,
    released: Arc<AtomicU64>,
    connected: bool,
}

impl CaptureSource {
    pub fn new(config: CaptureConfig) -> Result<Self> {
        if !config.url.starts_with("stub://") {
            return Err(anyhow!(
                "unsupported capture url '{}': only stub:// sources are built in",
                config.url
            ));
        }
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!(
                "capture size must be nonzero, got {}x{}",
                config.width,
                config.height
            ));
        }
        Ok(Self {
            config,
            frame_count: 0,
            released: Arc::new(AtomicU64::new(0)),
            connected: false,
        })
    }

    /// Synthetic sources are always reachable.
    pub fn connect(&mut self) -> Result<()> {
        log::info!(
            "CaptureSource: connected to {} ({}x{}, {:?} chroma, synthetic)",
            self.config.url,
            self.config.width,
            self.config.height,
            self.config.chroma_layout
        );
        self.connected = true;
        Ok(())
    }

    pub fn frame_size(&self) -> Size {
        Size::new(self.config.width, self.config.height)
    }

    pub fn target_fps(&self) -> u32 {
        self.config.target_fps
    }

    /// Capture the next frame. The frame reports back through its release
    /// hook once the pipeline is done with it.
    pub fn next_frame(&mut self) -> Result<RawFrame> {
        if !self.connected {
            return Err(anyhow!("capture source {} not connected", self.config.url));
        }
        let (luma, chroma_u, chroma_v) = self.generate_planes();
        self.frame_count += 1;

        let released = self.released.clone();
        Ok(
            RawFrame::new(self.config.width, self.config.height, luma, chroma_u, chroma_v)
                .with_release(move || {
                    released.fetch_add(1, Ordering::SeqCst);
                }),
        )
    }

    pub fn is_healthy(&self) -> bool {
        self.connected
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frame_count,
            frames_released: self.released.load(Ordering::SeqCst),
            url: self.config.url.clone(),
        }
    }

    /// Horizontal position of the square in the frame about to be generated.
    fn square_origin(&self) -> (u32, u32) {
        let travel = self.config.width.saturating_sub(SQUARE_SIDE).max(1);
        let x = ((self.frame_count * SQUARE_STEP as u64) % travel as u64) as u32;
        let y = self.config.height.saturating_sub(SQUARE_SIDE) / 2;
        (x, y)
    }

    fn generate_planes(&self) -> (Plane, Plane, Plane) {
        let w = self.config.width as usize;
        let h = self.config.height as usize;
        let (sx, sy) = self.square_origin();
        let in_square = |x: usize, y: usize| {
            x >= sx as usize
                && x < (sx + SQUARE_SIDE) as usize
                && y >= sy as usize
                && y < (sy + SQUARE_SIDE) as usize
        };

        let mut luma = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                luma[y * w + x] = if in_square(x, y) {
                    SQUARE_LUMA
                } else {
                    // Dim, static gradient.
                    16 + ((x + y) % 48) as u8
                };
            }
        }

        let cw = w.div_ceil(2);
        let ch = h.div_ceil(2);
        let chroma_at = |cx: usize, cy: usize| -> (u8, u8) {
            if in_square(cx * 2, cy * 2) {
                (90, 200)
            } else {
                (128, 128)
            }
        };

        match self.config.chroma_layout {
            ChromaLayout::Planar => {
                let mut u = vec![0u8; cw * ch];
                let mut v = vec![0u8; cw * ch];
                for cy in 0..ch {
                    for cx in 0..cw {
                        let (cu, cv) = chroma_at(cx, cy);
                        u[cy * cw + cx] = cu;
                        v[cy * cw + cx] = cv;
                    }
                }
                (
                    Plane::new(luma, w, 1),
                    Plane::new(u, cw, 1),
                    Plane::new(v, cw, 1),
                )
            }
            ChromaLayout::SemiPlanar => {
                let row = cw * 2;
                let mut uv = vec![0u8; row * ch];
                for cy in 0..ch {
                    for cx in 0..cw {
                        let (cu, cv) = chroma_at(cx, cy);
                        uv[cy * row + cx * 2] = cu;
                        uv[cy * row + cx * 2 + 1] = cv;
                    }
                }
                let v = uv[1..].to_vec();
                (
                    Plane::new(luma, w, 1),
                    Plane::new(uv, row, 2),
                    Plane::new(v, row, 2),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::yuv420_to_rgb;

    fn source(layout: ChromaLayout) -> CaptureSource {
        let mut source = CaptureSource::new(CaptureConfig {
            width: 160,
            height: 120,
            chroma_layout: layout,
            ..CaptureConfig::default()
        })
        .unwrap();
        source.connect().unwrap();
        source
    }

    #[test]
    fn rejects_non_stub_urls() {
        let cfg = CaptureConfig {
            url: "rtsp://10.0.0.2/stream".to_string(),
            ..CaptureConfig::default()
        };
        assert!(CaptureSource::new(cfg).is_err());
    }

    #[test]
    fn requires_connect() {
        let mut source = CaptureSource::new(CaptureConfig::default()).unwrap();
        assert!(!source.is_healthy());
        assert!(source.next_frame().is_err());
    }

    #[test]
    fn frames_convert_in_both_layouts() {
        for layout in [ChromaLayout::Planar, ChromaLayout::SemiPlanar] {
            let mut source = source(layout);
            let frame = source.next_frame().unwrap();
            assert_eq!(frame.size(), source.frame_size());
            assert_eq!(frame.size(), Size::new(160, 120));
            let rgb = yuv420_to_rgb(&frame).unwrap();
            assert_eq!(rgb.dimensions(), (160, 120));
        }
    }

    #[test]
    fn release_is_counted_on_drop() {
        let mut source = source(ChromaLayout::SemiPlanar);
        let first = source.next_frame().unwrap();
        let second = source.next_frame().unwrap();
        assert_eq!(source.stats().frames_captured, 2);
        assert_eq!(source.stats().frames_released, 0);
        drop(first);
        drop(second);
        assert_eq!(source.stats().frames_released, 2);
    }

    #[test]
    fn square_moves_between_frames() {
        let source = source(ChromaLayout::Planar);
        let (x0, _) = source.square_origin();
        let mut source = source;
        let _ = source.next_frame().unwrap();
        let (x1, _) = source.square_origin();
        assert_ne!(x0, x1);
    }

    #[test]
    fn chroma_layout_parsing() {
        assert_eq!(ChromaLayout::parse("NV12"), Some(ChromaLayout::SemiPlanar));
        assert_eq!(ChromaLayout::parse("planar"), Some(ChromaLayout::Planar));
        assert_eq!(ChromaLayout::parse("yuyv"), None);
    }
}
