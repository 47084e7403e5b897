//! S3-compatible object storage sink.
//!
//! Uses the `object_store` crate, so AWS S3, MinIO and other compatible
//! services all work; non-AWS endpoints get path-style requests.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tracing::{debug, info};
use voyage::Node;

use crate::error::{Result, SinkError};
use crate::params::SinkParams;
use crate::sink::SinkBackend;

/// Uploads entries as `<uid>.json` objects into one preconfigured bucket.
pub struct S3Sink {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl S3Sink {
    /// Parameters: `url` (endpoint host or full URL), `access_key`,
    /// `secret_key`, `bucket_name` (all required). Startup probes the
    /// bucket and fails when it is unreachable; it is never auto-created.
    pub async fn create(params: &SinkParams) -> Result<S3Sink> {
        let url = params.require_str("url")?;
        let access_key = params.require_str("access_key")?;
        let secret_key = params.require_str("secret_key")?;
        let bucket = params.require_str("bucket_name")?.to_string();

        let endpoint = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{url}")
        };

        let store = AmazonS3Builder::new()
            .with_bucket_name(&bucket)
            .with_region("us-east-1")
            .with_endpoint(&endpoint)
            .with_allow_http(endpoint.starts_with("http://"))
            .with_virtual_hosted_style_request(false)
            .with_access_key_id(access_key)
            .with_secret_access_key(secret_key)
            .build()
            .map_err(|e| SinkError::Config(e.to_string()))?;
        let store: Arc<dyn ObjectStore> = Arc::new(store);

        ensure_bucket_exists(store.as_ref(), &bucket).await?;
        info!(bucket = %bucket, "s3 sink ready");
        Ok(S3Sink { store, bucket })
    }
}

/// Issues a list request against the bucket; any error aborts startup.
async fn ensure_bucket_exists(store: &dyn ObjectStore, bucket: &str) -> Result<()> {
    let mut listing = store.list(None);
    match listing.next().await {
        None | Some(Ok(_)) => Ok(()),
        Some(Err(e)) => Err(SinkError::Config(format!(
            "bucket {bucket} is not accessible: {e}"
        ))),
    }
}

#[async_trait]
impl SinkBackend for S3Sink {
    fn kind(&self) -> &'static str {
        "s3"
    }

    async fn put(&self, entry: &Node, uid: &str) -> Result<()> {
        let path = ObjectPath::from(format!("{uid}.json"));
        let payload = Bytes::from(serde_json::to_vec(entry)?);
        debug!(bucket = %self.bucket, path = %path, size = payload.len(), "uploading entry");
        self.store.put(&path, payload.into()).await?;
        Ok(())
    }
}
