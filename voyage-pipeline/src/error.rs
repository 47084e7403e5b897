//! Pipeline error types.

use thiserror::Error;
use voyage_sinks::SinkError;

/// Fatal pipeline failures. Per-entry write failures stay inside the sinks
/// unless a sink is configured to fail on error.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid environment configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport failure while downloading a dump
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Decompression or channel-bridge failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML dump
    #[error("XML parse error: {0}")]
    Xml(String),

    /// Sink construction or fail-on-error write failure
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// A worker task panicked or was aborted
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
