//! Sink that uploads entries to Bunny edge storage over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use tracing::debug;
use voyage::Node;

use crate::error::{Result, SinkError};
use crate::params::SinkParams;
use crate::sink::SinkBackend;

/// PUTs `<base_url>/<uid>.json` against a storage zone, reusing one HTTP
/// client with keepalive connections for the whole run.
pub struct BunnyStorageSink {
    client: reqwest::Client,
    base_url: String,
}

impl BunnyStorageSink {
    /// Parameters: `region`, `base_path`, `api_key` (required) and
    /// `keepalive_timeout` in seconds (default 75).
    pub async fn create(params: &SinkParams) -> Result<BunnyStorageSink> {
        let region = params.require_str("region")?;
        let base_path = params.require_str("base_path")?;
        let api_key = params.require_str("api_key")?;
        let keepalive = params.int_or("keepalive_timeout", 75)?;
        let keepalive = u64::try_from(keepalive).map_err(|_| {
            SinkError::Config("keepalive_timeout must be >= 0".to_string())
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "AccessKey",
            HeaderValue::from_str(api_key).map_err(|_| {
                SinkError::Config("api_key is not a valid header value".to_string())
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .pool_idle_timeout(Duration::from_secs(keepalive))
            .build()?;

        Ok(BunnyStorageSink {
            client,
            base_url: format!("https://{region}.bunnycdn.com/{base_path}"),
        })
    }
}

#[async_trait]
impl SinkBackend for BunnyStorageSink {
    fn kind(&self) -> &'static str {
        "bunny_storage"
    }

    async fn put(&self, entry: &Node, uid: &str) -> Result<()> {
        let url = format!("{}/{uid}.json", self.base_url);
        let payload = serde_json::to_vec(entry)?;
        let response = self.client.put(&url).body(payload).send().await?;
        let status = response.status();
        if matches!(status.as_u16(), 200 | 201 | 204) {
            debug!(uid, "uploaded entry");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SinkError::Backend(format!(
                "upload of {uid} returned {status}: {body}"
            )))
        }
    }
}
