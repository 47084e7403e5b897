//! voyage-sinks: output destinations for structured Wikivoyage entries.
//!
//! A [`Sink`] pairs one backend (local files, a shared CSV file, Bunny edge
//! storage, an S3-compatible bucket) with the write discipline every backend
//! shares: an optional concurrency gate, success/failure accounting and the
//! fail-on-error policy. Sinks are constructed by name through
//! [`registry::build_sink`] from typed parameters decoded out of the host
//! environment.

pub mod bunny;
pub mod csv;
pub mod error;
pub mod filesystem;
pub mod params;
pub mod registry;
pub mod s3;
pub mod sink;

pub use error::{Result, SinkError};
pub use params::{ParamValue, SinkParams};
pub use registry::build_sink;
pub use sink::{Sink, SinkBackend, SinkOptions};
