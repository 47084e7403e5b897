//! Sink that appends `(id, title)` rows to one shared CSV file.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::info;
use voyage::Node;

use crate::error::Result;
use crate::params::SinkParams;
use crate::sink::SinkBackend;

/// Appends one row per entry to a single CSV file kept open for the whole
/// run. The header is written only when the file is new.
pub struct CsvSink {
    writer: Mutex<BufWriter<File>>,
}

impl CsvSink {
    /// Parameters: `output_path` (required). The parent directory is
    /// created if needed.
    pub async fn create(params: &SinkParams) -> Result<CsvSink> {
        let output_path = PathBuf::from(params.require_str("output_path")?);
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&output_path)
            .await?;
        let fresh = file.metadata().await?.len() == 0;

        let mut writer = BufWriter::new(file);
        if fresh {
            writer.write_all(b"\"id\",\"title\"\n").await?;
        }

        info!(path = %output_path.display(), "csv sink ready");
        Ok(CsvSink {
            writer: Mutex::new(writer),
        })
    }
}

/// Doubles embedded quotes per CSV quoting rules.
fn escape(field: &str) -> String {
    field.replace('"', "\"\"")
}

#[async_trait]
impl SinkBackend for CsvSink {
    fn kind(&self) -> &'static str {
        "csv"
    }

    async fn put(&self, entry: &Node, uid: &str) -> Result<()> {
        let title = entry.title().unwrap_or_default();
        let row = format!("\"{uid}\",\"{}\"\n", escape(title));
        let mut writer = self.writer.lock().await;
        writer.write_all(row.as_bytes()).await?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}
