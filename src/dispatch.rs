//! Single-flight frame dispatch.
//!
//! The capture side calls `Dispatcher::submit` for every frame. At most one
//! frame is in the pipeline at a time: while the worker is busy, new frames
//! are dropped on the spot (their buffers go straight back to the capture
//! side) instead of queueing. Finished overlays travel to the presentation
//! side over a one-slot channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::error::PipelineError;
use crate::pipeline::{FrameJob, FramePipeline, Overlay, OverlaySink};

/// How long the worker waits between attempts to hand over an overlay while
/// the presentation side still holds the previous one.
const DELIVERY_RETRY: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    /// The pipeline was busy; the frame was released unprocessed.
    Dropped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub submitted: u64,
    pub accepted: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    accepted: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            submitted: self.submitted.load(Ordering::SeqCst),
            accepted: self.accepted.load(Ordering::SeqCst),
            dropped: self.dropped.load(Ordering::SeqCst),
            delivered: self.delivered.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Owns the pipeline worker thread.
pub struct Dispatcher {
    jobs: Option<SyncSender<FrameJob>>,
    busy: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
    counters: Arc<Counters>,
    join: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Move `pipeline` onto a dedicated worker thread.
    pub fn spawn(pipeline: FramePipeline) -> Result<(Self, OverlayReceiver)> {
        let (job_tx, job_rx) = mpsc::sync_channel::<FrameJob>(1);
        let (overlay_tx, overlay_rx) = mpsc::sync_channel::<Overlay>(1);
        let busy = Arc::new(AtomicBool::new(false));
        let stopping = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());

        let worker_busy = busy.clone();
        let worker_counters = counters.clone();
        let sink = ChannelSink {
            tx: overlay_tx,
            stopping: stopping.clone(),
        };
        let join = std::thread::Builder::new()
            .name("frame-pipeline".to_string())
            .spawn(move || run_worker(pipeline, job_rx, sink, worker_busy, worker_counters))?;

        Ok((
            Self {
                jobs: Some(job_tx),
                busy,
                stopping,
                counters,
                join: Some(join),
            },
            OverlayReceiver { rx: overlay_rx },
        ))
    }

    /// Hand a frame to the worker, or drop it if one is already in flight.
    pub fn submit(&self, job: FrameJob) -> Submission {
        self.counters.submitted.fetch_add(1, Ordering::SeqCst);
        let frame_id = job.frame_id;

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.counters.dropped.fetch_add(1, Ordering::SeqCst);
            log::debug!("frame {} dropped: pipeline busy", frame_id);
            return Submission::Dropped;
        }

        let Some(jobs) = &self.jobs else {
            self.busy.store(false, Ordering::Release);
            self.counters.dropped.fetch_add(1, Ordering::SeqCst);
            return Submission::Dropped;
        };

        match jobs.try_send(job) {
            Ok(()) => {
                self.counters.accepted.fetch_add(1, Ordering::SeqCst);
                Submission::Accepted
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.busy.store(false, Ordering::Release);
                self.counters.dropped.fetch_add(1, Ordering::SeqCst);
                log::warn!("frame {} dropped: pipeline worker unavailable", frame_id);
                Submission::Dropped
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> DispatchStats {
        self.counters.snapshot()
    }

    /// Stop accepting frames, let the in-flight one finish, and join the
    /// worker. An overlay that cannot be handed over because the receiver
    /// is still full is abandoned and its frame counts as failed.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        self.stopping.store(true, Ordering::Release);
        self.jobs.take();
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("frame pipeline worker panicked"))?;
        }
        Ok(())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("dispatcher shutdown: {}", e);
        }
    }
}

/// Waits for the one-slot overlay channel to free up, but gives up once the
/// dispatcher is stopping so `join` cannot hang on an idle receiver.
struct ChannelSink {
    tx: SyncSender<Overlay>,
    stopping: Arc<AtomicBool>,
}

impl OverlaySink for ChannelSink {
    fn deliver(&mut self, overlay: Overlay) -> Result<(), PipelineError> {
        let mut pending = overlay;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Disconnected(_)) => return Err(PipelineError::Disconnected),
                Err(TrySendError::Full(overlay)) => {
                    if self.stopping.load(Ordering::Acquire) {
                        log::debug!(
                            "overlay for frame {} abandoned: dispatcher stopping",
                            overlay.frame_id
                        );
                        return Err(PipelineError::Disconnected);
                    }
                    pending = overlay;
                    std::thread::sleep(DELIVERY_RETRY);
                }
            }
        }
    }
}

fn run_worker(
    mut pipeline: FramePipeline,
    jobs: Receiver<FrameJob>,
    mut sink: ChannelSink,
    busy: Arc<AtomicBool>,
    counters: Arc<Counters>,
) {
    if let Err(e) = pipeline.warm_up() {
        log::warn!("detector {} warm-up failed: {:#}", pipeline.detector_name(), e);
    }
    log::info!("frame pipeline worker started ({})", pipeline.detector_name());

    for job in jobs {
        let report = pipeline.process(job, &mut sink);
        if report.is_delivered() {
            counters.delivered.fetch_add(1, Ordering::SeqCst);
        } else {
            counters.failed.fetch_add(1, Ordering::SeqCst);
        }
        busy.store(false, Ordering::Release);
    }

    log::info!("frame pipeline worker stopped");
}

/// Presentation end of the overlay channel.
pub struct OverlayReceiver {
    rx: Receiver<Overlay>,
}

impl OverlayReceiver {
    /// Block until the next overlay arrives.
    pub fn recv(&self) -> Result<Overlay, PipelineError> {
        self.rx.recv().map_err(|_| PipelineError::Disconnected)
    }

    pub fn try_recv(&self) -> Result<Option<Overlay>, PipelineError> {
        match self.rx.try_recv() {
            Ok(overlay) => Ok(Some(overlay)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(PipelineError::Disconnected),
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Overlay>, PipelineError> {
        match self.rx.recv_timeout(timeout) {
            Ok(overlay) => Ok(Some(overlay)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(PipelineError::Disconnected),
        }
    }
}

/// Keeps whatever overlay is currently on screen.
///
/// A new overlay replaces the old one wholesale. Frames that fail never
/// produce an overlay, so the previous one stays up until a later frame
/// succeeds.
pub struct Presenter {
    receiver: OverlayReceiver,
    current: Option<Overlay>,
    presented: u64,
}

impl Presenter {
    pub fn new(receiver: OverlayReceiver) -> Self {
        Self {
            receiver,
            current: None,
            presented: 0,
        }
    }

    /// Take every pending overlay without blocking. Returns true if the
    /// displayed overlay changed.
    pub fn poll(&mut self) -> Result<bool, PipelineError> {
        let mut changed = false;
        while let Some(overlay) = self.receiver.try_recv()? {
            self.replace(overlay);
            changed = true;
        }
        Ok(changed)
    }

    /// Like `poll`, but waits up to `timeout` for the first overlay.
    pub fn wait(&mut self, timeout: Duration) -> Result<bool, PipelineError> {
        match self.receiver.recv_timeout(timeout)? {
            Some(overlay) => {
                self.replace(overlay);
                // A hang-up right after delivery is reported on the next call.
                match self.poll() {
                    Ok(_) | Err(PipelineError::Disconnected) => Ok(true),
                    Err(e) => Err(e),
                }
            }
            None => Ok(false),
        }
    }

    pub fn current(&self) -> Option<&Overlay> {
        self.current.as_ref()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    fn replace(&mut self, overlay: Overlay) {
        log::debug!(
            "presenting overlay for frame {} ({} detections)",
            overlay.frame_id,
            overlay.detections.len()
        );
        self.current = Some(overlay);
        self.presented += 1;
    }
}
