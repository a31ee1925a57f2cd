//! Unified error type for the pipeline.

use thiserror::Error;

/// Errors that can occur during a pipeline run.
///
/// `OptimizerMissing` is fatal at startup; within a run, per-image failures
/// are contained at the call site that produced them.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("photo library authorization denied")]
    AuthorizationDenied,

    #[error("optimizer executable not found")]
    OptimizerMissing,

    #[error("optimizer failed: {0}")]
    OptimizerFailed(String),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("asset library error: {0}")]
    Library(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
