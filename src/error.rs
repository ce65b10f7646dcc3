//! Crate-wide error taxonomy: one `thiserror` enum, one variant per error
//! class. Only [`PipelineError::Config`] is returned from constructors and
//! aborts the caller; every other variant is captured into
//! [`crate::context::SpeechContext::error`] by a stage and cleared by the
//! driver before the next frame.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid or missing configuration. Surfaced at construction only.
    #[error("configuration error: {0}")]
    Config(String),

    /// Capture produced an undersized or malformed frame.
    #[error("frame size error: {0}")]
    FrameSize(String),

    /// A native DSP primitive (VAD, AGC, noise suppressor) failed.
    #[error("DSP error: {0}")]
    Dsp(String),

    /// A model runner failed to load, resize, or run.
    #[error("model error: {0}")]
    Model(String),

    /// An ASR bridge failed. Kept for completeness of the taxonomy; no ASR
    /// bridge ships in this crate.
    #[error("recognizer error: {0}")]
    Recognizer(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        PipelineError::Config(msg.into())
    }

    pub fn frame_size(msg: impl Into<String>) -> Self {
        PipelineError::FrameSize(msg.into())
    }

    pub fn dsp(msg: impl Into<String>) -> Self {
        PipelineError::Dsp(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        PipelineError::Model(msg.into())
    }
}
