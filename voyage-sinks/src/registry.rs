//! Static sink registry.
//!
//! Sinks are selected by name at startup; each name maps to an async
//! constructor consuming the typed parameter record derived from the
//! environment.

use crate::bunny::BunnyStorageSink;
use crate::csv::CsvSink;
use crate::error::{Result, SinkError};
use crate::filesystem::FilesystemSink;
use crate::params::SinkParams;
use crate::s3::S3Sink;
use crate::sink::{Sink, SinkBackend, SinkOptions};

/// Names accepted in the `HANDLER` environment variable.
pub const SINK_NAMES: [&str; 4] = ["filesystem", "csv", "bunny_storage", "s3"];

/// Builds a configured sink by name.
pub async fn build_sink(name: &str, params: &SinkParams) -> Result<Sink> {
    let options = SinkOptions::from_params(params)?;
    let backend: Box<dyn SinkBackend> = match name {
        "filesystem" => Box::new(FilesystemSink::create(params).await?),
        "csv" => Box::new(CsvSink::create(params).await?),
        "bunny_storage" => Box::new(BunnyStorageSink::create(params).await?),
        "s3" => Box::new(S3Sink::create(params).await?),
        other => return Err(SinkError::UnknownSink(other.to_string())),
    };
    Ok(Sink::new(backend, options))
}
