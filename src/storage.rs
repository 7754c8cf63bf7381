//! Blob store collaborator: named JSON object writes with cache directives.

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use tracing::debug;

use crate::error::WxError;
use crate::Result;

/// Sink for job artifacts. A write replaces any prior object at the name.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_json(&self, object_name: &str, body: Vec<u8>, cache_control: &str) -> Result<()>;
}

/// HTTP blob gateway: objects live under a base URL and are replaced by PUT.
#[derive(Debug)]
pub struct HttpBlobStore {
    http: ClientWithMiddleware,
    base_url: String,
}

impl HttpBlobStore {
    /// Fails fast when no destination is configured, before anything is
    /// fetched upstream.
    pub fn new(http: ClientWithMiddleware, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(WxError::storage("Blob store base URL is required"));
        }
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put_json(&self, object_name: &str, body: Vec<u8>, cache_control: &str) -> Result<()> {
        let url = format!("{}/{}", self.base_url, object_name);
        debug!(%url, bytes = body.len(), "uploading object");

        let response = self
            .http
            .put(&url)
            .header("content-type", "application/json")
            .header("cache-control", cache_control)
            .body(body)
            .send()
            .await
            .map_err(|e| WxError::storage(format!("upload failed: {e}")))?;

        response
            .error_for_status()
            .map_err(|e| WxError::storage(format!("upload rejected: {e}")))?;
        Ok(())
    }
}
