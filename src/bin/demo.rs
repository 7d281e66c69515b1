//! demo - synthetic end-to-end run of the overlay pipeline
//!
//! Captures N frames from the synthetic source, pushes each one through the
//! pipeline synchronously and writes every overlay as a PNG, plus a JSON
//! summary of what was detected where.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;

use frame_overlay::{
    BackendRegistry, CaptureConfig, CaptureSource, ChromaLayout, FrameJob, FramePipeline,
    Overlay, PipelineSettings, Rotation, Size,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames to process.
    #[arg(long, default_value_t = 20)]
    frames: u64,
    /// Detector backend.
    #[arg(long, env = "OVERLAY_DETECTOR", default_value = "motion")]
    detector: String,
    /// Device rotation in degrees (multiple of 90).
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    rotation: i32,
    /// Sensor orientation in degrees (multiple of 90).
    #[arg(long, default_value_t = 90)]
    sensor: i32,
    /// Preview size as WIDTHxHEIGHT.
    #[arg(long, default_value = "480x640")]
    preview: Size,
    /// Capture size as WIDTHxHEIGHT.
    #[arg(long, default_value = "640x480")]
    capture: Size,
    /// Use planar (I420) chroma instead of semi-planar.
    #[arg(long)]
    planar: bool,
    /// Mirror frames horizontally.
    #[arg(long)]
    mirror: bool,
    /// Output directory for overlay PNGs and summary.json.
    #[arg(long, default_value = "demo_out")]
    out: PathBuf,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

#[derive(Serialize)]
struct FrameSummary {
    frame_id: u64,
    final_state: String,
    error: Option<String>,
    detections: Vec<DetectionSummary>,
}

#[derive(Serialize)]
struct DetectionSummary {
    label: String,
    rect: [f32; 4],
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let device_rotation = Rotation::from_degrees(args.rotation)
        .ok_or_else(|| anyhow!("--rotation must be a multiple of 90"))?;
    let sensor_orientation = Rotation::from_degrees(args.sensor)
        .ok_or_else(|| anyhow!("--sensor must be a multiple of 90"))?;

    let mut pipeline = {
        let _stage = ui.stage("Build detector");
        let registry = BackendRegistry::with_builtin();
        let detector = registry.create(&args.detector, Size::new(320, 320))?;
        let mut pipeline = FramePipeline::new(
            detector,
            PipelineSettings {
                sensor_orientation,
                mirror: args.mirror,
                ..PipelineSettings::default()
            },
        );
        pipeline.warm_up()?;
        pipeline
    };

    let mut source = {
        let _stage = ui.stage("Connect synthetic source");
        let mut source = CaptureSource::new(CaptureConfig {
            width: args.capture.width,
            height: args.capture.height,
            chroma_layout: if args.planar {
                ChromaLayout::Planar
            } else {
                ChromaLayout::SemiPlanar
            },
            ..CaptureConfig::default()
        })?;
        source.connect()?;
        source
    };

    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    let mut summaries = Vec::new();
    let mut progress = ui.frames(args.frames);
    for frame_id in 1..=args.frames {
        let frame = source.next_frame()?;
        let mut delivered: Vec<Overlay> = Vec::new();
        let report = pipeline.process(
            FrameJob {
                frame_id,
                frame,
                viewport: args.preview,
                device_rotation,
            },
            &mut delivered,
        );

        let mut detections = Vec::new();
        if let Some(overlay) = delivered.pop() {
            let path = args.out.join(format!("overlay_{:04}.png", frame_id));
            overlay
                .raster
                .save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            detections = overlay
                .detections
                .iter()
                .map(|d| DetectionSummary {
                    label: d.label_text(),
                    rect: [d.rect.left, d.rect.top, d.rect.right, d.rect.bottom],
                })
                .collect();
        }

        progress.record(frame_id, report.is_delivered());
        summaries.push(FrameSummary {
            frame_id,
            final_state: format!("{:?}", report.final_state()),
            error: report.error.as_ref().map(|e| e.to_string()),
            detections,
        });
    }
    progress.finish();

    {
        let _stage = ui.stage("Write summary");
        let path = args.out.join("summary.json");
        let json = serde_json::to_string_pretty(&summaries)?;
        fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }

    let stats = source.stats();
    println!(
        "processed {} frames ({} released) from {}; overlays in {}",
        stats.frames_captured,
        stats.frames_released,
        stats.url,
        args.out.display()
    );
    Ok(())
}
