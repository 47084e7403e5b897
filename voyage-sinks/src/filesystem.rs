//! Sink that writes one JSON file per entry.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};
use voyage::Node;

use crate::error::Result;
use crate::params::SinkParams;
use crate::sink::SinkBackend;

/// Writes `<output_dir>/<uid>.json`, one file per entry.
pub struct FilesystemSink {
    output_dir: PathBuf,
}

impl FilesystemSink {
    /// Parameters: `output_dir` (required). The directory is created
    /// recursively.
    pub async fn create(params: &SinkParams) -> Result<FilesystemSink> {
        let output_dir = PathBuf::from(params.require_str("output_dir")?);
        fs::create_dir_all(&output_dir).await?;
        info!(dir = %output_dir.display(), "filesystem sink ready");
        Ok(FilesystemSink { output_dir })
    }
}

#[async_trait]
impl SinkBackend for FilesystemSink {
    fn kind(&self) -> &'static str {
        "filesystem"
    }

    async fn put(&self, entry: &Node, uid: &str) -> Result<()> {
        let path = self.output_dir.join(format!("{uid}.json"));
        let payload = serde_json::to_vec(entry)?;
        debug!(path = %path.display(), size = payload.len(), "writing entry");
        fs::write(&path, &payload).await?;
        Ok(())
    }
}
