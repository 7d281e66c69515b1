use anyhow::{anyhow, Result};
use image::Rgba;
use serde::Deserialize;
use std::path::Path;

use crate::detect::BackendRegistry;
use crate::geometry::{Rotation, Size};
use crate::ingest::{CaptureConfig, ChromaLayout};
use crate::overlay::OverlayStyle;
use crate::pipeline::PipelineSettings;

const DEFAULT_CAPTURE_URL: &str = "stub://camera";
const DEFAULT_CAPTURE_FPS: u32 = 10;
const DEFAULT_CAPTURE_WIDTH: u32 = 640;
const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
const DEFAULT_PREVIEW_WIDTH: u32 = 480;
const DEFAULT_PREVIEW_HEIGHT: u32 = 640;
const DEFAULT_SENSOR_DEGREES: i32 = 90;
const DEFAULT_BACKEND: &str = "motion";
const DEFAULT_MODEL_INPUT: u32 = 320;
const DEFAULT_THRESHOLD: f32 = 0.0;

#[derive(Debug, Deserialize, Default)]
struct OverlayConfigFile {
    capture: Option<CaptureConfigFile>,
    preview: Option<PreviewConfigFile>,
    orientation: Option<OrientationConfigFile>,
    model: Option<ModelConfigFile>,
    overlay: Option<StyleConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
    chroma_layout: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PreviewConfigFile {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct OrientationConfigFile {
    sensor_degrees: Option<i32>,
    device_rotation: Option<i32>,
    mirror: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    backend: Option<String>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct StyleConfigFile {
    stroke_width: Option<u32>,
    text_scale: Option<u32>,
    box_color: Option<[u8; 4]>,
    text_color: Option<[u8; 4]>,
}

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub capture: CaptureConfig,
    /// Preview surface size in screen pixels.
    pub preview: Size,
    pub orientation: OrientationSettings,
    pub model: ModelSettings,
    pub style: OverlayStyle,
}

#[derive(Debug, Clone, Copy)]
pub struct OrientationSettings {
    pub sensor: Rotation,
    pub device_rotation: Rotation,
    pub mirror: bool,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub backend: String,
    pub input: Size,
    pub threshold: f32,
}

impl OverlayConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("OVERLAY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Settings for `FramePipeline::new`.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            sensor_orientation: self.orientation.sensor,
            mirror: self.orientation.mirror,
            confidence_threshold: self.model.threshold,
            style: self.style,
        }
    }

    fn from_file(file: OverlayConfigFile) -> Result<Self> {
        let capture_file = file.capture.unwrap_or_default();
        let chroma_layout = match capture_file.chroma_layout.as_deref() {
            Some(raw) => ChromaLayout::parse(raw)
                .ok_or_else(|| anyhow!("capture.chroma_layout '{}' is not recognised", raw))?,
            None => ChromaLayout::default(),
        };
        let capture = CaptureConfig {
            url: capture_file
                .url
                .unwrap_or_else(|| DEFAULT_CAPTURE_URL.to_string()),
            target_fps: capture_file.target_fps.unwrap_or(DEFAULT_CAPTURE_FPS),
            width: capture_file.width.unwrap_or(DEFAULT_CAPTURE_WIDTH),
            height: capture_file.height.unwrap_or(DEFAULT_CAPTURE_HEIGHT),
            chroma_layout,
        };

        let preview_file = file.preview.unwrap_or_default();
        let preview = Size::new(
            preview_file.width.unwrap_or(DEFAULT_PREVIEW_WIDTH),
            preview_file.height.unwrap_or(DEFAULT_PREVIEW_HEIGHT),
        );

        let orientation_file = file.orientation.unwrap_or_default();
        let orientation = OrientationSettings {
            sensor: parse_rotation(
                "orientation.sensor_degrees",
                orientation_file
                    .sensor_degrees
                    .unwrap_or(DEFAULT_SENSOR_DEGREES),
            )?,
            device_rotation: parse_rotation(
                "orientation.device_rotation",
                orientation_file.device_rotation.unwrap_or(0),
            )?,
            mirror: orientation_file.mirror.unwrap_or(false),
        };

        let model_file = file.model.unwrap_or_default();
        let model = ModelSettings {
            backend: model_file
                .backend
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            input: Size::new(
                model_file.input_width.unwrap_or(DEFAULT_MODEL_INPUT),
                model_file.input_height.unwrap_or(DEFAULT_MODEL_INPUT),
            ),
            threshold: model_file.threshold.unwrap_or(DEFAULT_THRESHOLD),
        };

        let style_file = file.overlay.unwrap_or_default();
        let defaults = OverlayStyle::default();
        let style = OverlayStyle {
            stroke_width: style_file.stroke_width.unwrap_or(defaults.stroke_width),
            text_scale: style_file.text_scale.unwrap_or(defaults.text_scale),
            box_color: style_file.box_color.map(Rgba).unwrap_or(defaults.box_color),
            text_color: style_file.text_color.map(Rgba).unwrap_or(defaults.text_color),
        };

        Ok(Self {
            capture,
            preview,
            orientation,
            model,
            style,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("OVERLAY_CAPTURE_URL") {
            if !url.trim().is_empty() {
                self.capture.url = url;
            }
        }
        if let Ok(degrees) = std::env::var("OVERLAY_DEVICE_ROTATION") {
            self.orientation.device_rotation =
                parse_rotation("OVERLAY_DEVICE_ROTATION", parse_degrees(&degrees)?)?;
        }
        if let Ok(degrees) = std::env::var("OVERLAY_SENSOR_ORIENTATION") {
            self.orientation.sensor =
                parse_rotation("OVERLAY_SENSOR_ORIENTATION", parse_degrees(&degrees)?)?;
        }
        if let Ok(size) = std::env::var("OVERLAY_PREVIEW_SIZE") {
            self.preview = size
                .parse()
                .map_err(|e| anyhow!("OVERLAY_PREVIEW_SIZE: {}", e))?;
        }
        if let Ok(backend) = std::env::var("OVERLAY_DETECTOR") {
            if !backend.trim().is_empty() {
                self.model.backend = backend.trim().to_string();
            }
        }
        if let Ok(mirror) = std::env::var("OVERLAY_MIRROR") {
            self.orientation.mirror = parse_bool(&mirror)
                .ok_or_else(|| anyhow!("OVERLAY_MIRROR must be true or false"))?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow!("capture size must be nonzero"));
        }
        if self.capture.target_fps == 0 {
            return Err(anyhow!("capture.target_fps must be greater than zero"));
        }
        if self.preview.is_empty() {
            return Err(anyhow!("preview size must be nonzero"));
        }
        if self.model.input.is_empty() {
            return Err(anyhow!("model input size must be nonzero"));
        }
        if !(0.0..=1.0).contains(&self.model.threshold) {
            return Err(anyhow!("model.threshold must be within [0, 1]"));
        }
        self.model.backend = self.model.backend.to_lowercase();
        let registry = BackendRegistry::with_builtin();
        if !registry.contains(&self.model.backend) {
            return Err(anyhow!(
                "unknown detector backend '{}' (available: {})",
                self.model.backend,
                registry.list().join(", ")
            ));
        }
        if self.style.stroke_width == 0 || self.style.text_scale == 0 {
            return Err(anyhow!("overlay stroke_width and text_scale must be nonzero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<OverlayConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn parse_rotation(field: &str, degrees: i32) -> Result<Rotation> {
    Rotation::from_degrees(degrees)
        .ok_or_else(|| anyhow!("{} must be a multiple of 90, got {}", field, degrees))
}

fn parse_degrees(value: &str) -> Result<i32> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("rotation '{}' must be an integer number of degrees", value))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
