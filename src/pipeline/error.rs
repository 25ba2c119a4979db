//! Pipeline-specific error types.

use thiserror::Error;

/// Errors produced while running the pre-processing pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Processor `{name}` in stage `{stage}` failed: {message}")]
    Processor {
        stage: &'static str,
        name: String,
        message: String,
    },

    /// Free-form failure raised by a registered processor; the executor
    /// wraps it with stage and processor context.
    #[error("{0}")]
    Message(String),
}

impl PipelineError {
    pub fn message(msg: impl Into<String>) -> Self {
        PipelineError::Message(msg.into())
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
