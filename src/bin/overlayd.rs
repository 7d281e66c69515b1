//! overlayd - live detection overlay daemon
//!
//! This daemon:
//! 1. Loads configuration ($OVERLAY_CONFIG plus OVERLAY_* overrides)
//! 2. Captures frames from the configured source
//! 3. Pushes each frame through the overlay pipeline, one in flight at a time
//! 4. Keeps the latest overlay on the presentation side
//! 5. On Ctrl-C, optionally writes the latest overlay to $OVERLAY_SNAPSHOT_PATH

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use frame_overlay::{
    config::OverlayConfig, BackendRegistry, CaptureSource, Dispatcher, FrameJob, FramePipeline,
    PipelineError, Presenter, Submission,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = OverlayConfig::load()?;
    let snapshot_path = std::env::var("OVERLAY_SNAPSHOT_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    let registry = BackendRegistry::with_builtin();
    let detector = registry.create(&cfg.model.backend, cfg.model.input)?;
    let pipeline = FramePipeline::new(detector, cfg.pipeline_settings());
    let (dispatcher, overlays) = Dispatcher::spawn(pipeline)?;
    let mut presenter = Presenter::new(overlays);

    let mut source = CaptureSource::new(cfg.capture.clone())?;
    source.connect()?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    log::info!(
        "overlayd running. capture={} {} preview={} detector={} {}",
        cfg.capture.url,
        source.frame_size(),
        cfg.preview,
        cfg.model.backend,
        cfg.model.input
    );
    log::info!(
        "orientation: sensor={} device={} mirror={} threshold={:.2}",
        cfg.orientation.sensor.degrees(),
        cfg.orientation.device_rotation.degrees(),
        cfg.orientation.mirror,
        cfg.model.threshold
    );

    let frame_interval = Duration::from_millis(1000 / u64::from(source.target_fps().max(1)));
    let mut last_health_log = Instant::now();
    let mut frame_id = 0u64;

    while running.load(Ordering::SeqCst) {
        let tick = Instant::now();

        let frame = source.next_frame()?;
        frame_id += 1;
        let submission = dispatcher.submit(FrameJob {
            frame_id,
            frame,
            viewport: cfg.preview,
            device_rotation: cfg.orientation.device_rotation,
        });
        if submission == Submission::Dropped {
            log::debug!("frame {} skipped, pipeline busy", frame_id);
        }

        match presenter.poll() {
            Ok(true) => {
                if let Some(overlay) = presenter.current() {
                    for det in &overlay.detections {
                        log::debug!(
                            "frame {}: {} at ({:.0},{:.0})-({:.0},{:.0})",
                            overlay.frame_id,
                            det.label_text(),
                            det.rect.left,
                            det.rect.top,
                            det.rect.right,
                            det.rect.bottom
                        );
                    }
                }
            }
            Ok(false) => {}
            Err(PipelineError::Disconnected) => {
                return Err(anyhow!("pipeline worker exited unexpectedly"));
            }
            Err(e) => return Err(e.into()),
        }

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let capture = source.stats();
            let dispatch = dispatcher.stats();
            log::info!(
                "capture health={} frames={} released={} url={}",
                source.is_healthy(),
                capture.frames_captured,
                capture.frames_released,
                capture.url
            );
            log::info!(
                "dispatch submitted={} dropped={} delivered={} failed={} presented={}",
                dispatch.submitted,
                dispatch.dropped,
                dispatch.delivered,
                dispatch.failed,
                presenter.presented()
            );
            last_health_log = Instant::now();
        }

        if let Some(rest) = frame_interval.checked_sub(tick.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    log::info!("shutdown signal received, stopping pipeline...");
    if let Some(path) = snapshot_path {
        match presenter.current() {
            Some(overlay) => {
                overlay
                    .raster
                    .save(&path)
                    .with_context(|| format!("failed to write snapshot {}", path.display()))?;
                log::info!(
                    "overlay for frame {} written to {}",
                    overlay.frame_id,
                    path.display()
                );
            }
            None => log::warn!("no overlay presented yet, snapshot skipped"),
        }
    }

    drop(presenter);
    dispatcher.shutdown()?;
    Ok(())
}
