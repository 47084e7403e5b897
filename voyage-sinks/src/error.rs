//! Sink error types.

use std::io;

use thiserror::Error;

/// Errors raised while constructing or writing to sinks.
#[derive(Error, Debug)]
pub enum SinkError {
    /// I/O error from a file-backed sink
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Missing or ill-typed sink parameter
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport failure in an HTTP-backed sink
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Object store failure
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Entry could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend rejected the write (bad status code, failed probe, ...)
    #[error("backend error: {0}")]
    Backend(String),

    /// Surfaced by a fail-on-error sink after a counted write failure
    #[error("failed to write entry {uid}")]
    WriteFailed { uid: String },

    /// Name not present in the sink registry
    #[error("unknown sink: {0}")]
    UnknownSink(String),
}

/// Result type for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_uid() {
        let err = SinkError::WriteFailed {
            uid: "Q42".to_string(),
        };
        assert_eq!(err.to_string(), "failed to write entry Q42");
    }

    #[test]
    fn io_errors_convert() {
        let err: SinkError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, SinkError::Io(_)));
    }
}
