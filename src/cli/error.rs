//! CLI error types and conversions

use crate::metrics::MetricsError;
use crate::pipeline::PipelineError;
use crate::window::WindowError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Run failed
    #[error("{0}")]
    PipelineError(#[from] PipelineError),

    /// Date range cannot be windowed
    #[error("{0}")]
    WindowError(#[from] WindowError),

    /// Metrics exporter could not start
    #[error("metrics error: {0}")]
    MetricsError(#[from] MetricsError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Summary could not be rendered
    #[error("output error: {0}")]
    OutputError(String),
}
