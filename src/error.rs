//! Per-frame failure taxonomy.
//!
//! Every variant is fatal to a single frame only. The pipeline logs it, drops the
//! frame and waits for the next one; nothing is retried.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Plane buffers, strides or dimensions do not describe a readable frame.
    #[error("invalid frame layout: {0}")]
    InvalidFrameLayout(String),

    /// Zero-sized request, singular matrix, or a crop that leaves the image.
    #[error("degenerate transform: {0}")]
    DegenerateTransform(String),

    /// Opaque failure reported by the detector.
    #[error("detector error: {0}")]
    Detector(String),

    /// The presentation side hung up before the overlay could be handed over.
    #[error("presentation channel disconnected")]
    Disconnected,
}

impl PipelineError {
    pub(crate) fn layout(msg: impl Into<String>) -> Self {
        Self::InvalidFrameLayout(msg.into())
    }

    pub(crate) fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateTransform(msg.into())
    }

    /// Wraps a detector failure, keeping the full context chain in the message.
    pub fn detector(err: anyhow::Error) -> Self {
        Self::Detector(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn display_names_the_condition() {
        let err = PipelineError::layout("luma plane holds 10 bytes, need 12");
        assert!(err.to_string().starts_with("invalid frame layout"));
        assert!(err.to_string().contains("need 12"));

        let err = PipelineError::degenerate("0x0 target");
        assert!(err.to_string().contains("degenerate transform"));
    }

    #[test]
    fn detector_error_keeps_context_chain() {
        let inner: anyhow::Result<()> = Err(anyhow!("tensor shape mismatch"));
        let err = PipelineError::detector(inner.context("inference failed").unwrap_err());
        match err {
            PipelineError::Detector(msg) => {
                assert!(msg.contains("inference failed"));
                assert!(msg.contains("tensor shape mismatch"));
            }
            other => panic!("expected Detector, got {other:?}"),
        }
    }
}
