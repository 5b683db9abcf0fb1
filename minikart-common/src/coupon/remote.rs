//! Object store coupon loader
//!
//! Fetches `{endpoint}/{bucket}/{key}` over HTTP and streams the body through
//! the same gzip line reader as local files, so a large object is never held
//! in memory whole. Requests are unsigned, so the bucket must allow reads from
//! this host (public, VPC endpoint policy, or a proxy).

use async_trait::async_trait;
use futures::TryStreamExt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{read_coupon_stream, CouponLoader, CouponSet, LoadError, LoadOptions};

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Loads coupon files from an S3-compatible object store
#[derive(Debug, Clone)]
pub struct ObjectStoreLoader {
    http_client: reqwest::Client,
    endpoint: String,
    bucket: String,
    options: LoadOptions,
}

impl ObjectStoreLoader {
    /// Loader for `bucket` at an explicit endpoint (e.g. `http://localhost:9000`)
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        options: LoadOptions,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let bucket = bucket.into();
        info!(endpoint = %endpoint, bucket = %bucket, "Object store loader initialised");

        Ok(Self {
            http_client,
            endpoint,
            bucket,
            options,
        })
    }

    /// Loader for an AWS S3 bucket using the regional path-style endpoint
    pub fn for_s3(
        bucket: impl Into<String>,
        region: &str,
        options: LoadOptions,
    ) -> Result<Self, reqwest::Error> {
        Self::new(format!("https://s3.{}.amazonaws.com", region), bucket, options)
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key.trim_start_matches('/'))
    }

    /// Send the request and check the status; the body is left unread
    async fn fetch(&self, key: &str) -> Result<reqwest::Response, LoadError> {
        let url = self.object_url(key);
        debug!(url = %url, "Fetching coupon object");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| LoadError::Open {
                source_id: key.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Open {
                source_id: key.to_string(),
                reason: format!("object store returned HTTP {}", status.as_u16()),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl CouponLoader for ObjectStoreLoader {
    async fn load(
        &self,
        cancel: &CancellationToken,
        source_id: &str,
    ) -> Result<Arc<dyn CouponSet>, LoadError> {
        info!(bucket = %self.bucket, key = %source_id, "Loading coupon file from object store");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(key = %source_id, "Coupon download cancelled");
                return Err(LoadError::Cancelled { source_id: source_id.to_string() });
            }
            response = self.fetch(source_id) => response,
        };
        let response = response.inspect_err(|e| {
            warn!(bucket = %self.bucket, key = %source_id, error = %e, "Failed to fetch coupon object")
        })?;

        // Network errors mid-body surface as `Other` and become read failures
        let chunks = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        // The bridge captures the current runtime handle, so build it here
        let body = SyncIoBridge::new(StreamReader::new(Box::pin(chunks)));

        let key = source_id.to_string();
        let options = self.options;
        let cancel = cancel.clone();
        let set = tokio::task::spawn_blocking(move || {
            read_coupon_stream(body, &key, options, &cancel)
        })
        .await
        .map_err(|e| LoadError::Read {
            source_id: source_id.to_string(),
            reason: format!("loader task failed: {}", e),
        })??;

        info!(
            bucket = %self.bucket,
            key = %source_id,
            coupons_loaded = set.len(),
            "Coupon file loaded from object store"
        );
        Ok(Arc::new(set))
    }
}
