//! Primary/secondary loader chain
//!
//! Tries the primary loader (typically the object store) and falls back to
//! the secondary (typically the local filesystem) on any failure. The primary
//! sees `prefix + source_id`; the secondary sees `source_id` unchanged.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{CouponLoader, CouponSet, LoadError};

/// Loader that tries a primary source before a secondary one
pub struct FallbackLoader {
    primary: Option<Arc<dyn CouponLoader>>,
    secondary: Arc<dyn CouponLoader>,
    primary_prefix: String,
    primary_enabled: bool,
}

impl FallbackLoader {
    pub fn new(
        primary: Option<Arc<dyn CouponLoader>>,
        secondary: Arc<dyn CouponLoader>,
        primary_prefix: impl Into<String>,
        primary_enabled: bool,
    ) -> Self {
        Self {
            primary,
            secondary,
            primary_prefix: primary_prefix.into(),
            primary_enabled,
        }
    }

    /// Key the primary loader is asked for
    pub fn primary_key(&self, source_id: &str) -> String {
        format!("{}{}", self.primary_prefix, source_id)
    }
}

#[async_trait]
impl CouponLoader for FallbackLoader {
    async fn load(
        &self,
        cancel: &CancellationToken,
        source_id: &str,
    ) -> Result<Arc<dyn CouponSet>, LoadError> {
        match (&self.primary, self.primary_enabled) {
            (Some(primary), true) => {
                let key = self.primary_key(source_id);
                info!(primary_key = %key, fallback = %source_id, "Attempting primary coupon source");

                match primary.load(cancel, &key).await {
                    Ok(set) => return Ok(set),
                    Err(e) => warn!(
                        primary_key = %key,
                        error = %e,
                        "Primary coupon source failed, falling back"
                    ),
                }
            }
            _ => debug!(
                primary_enabled = self.primary_enabled,
                has_primary = self.primary.is_some(),
                "Primary coupon source disabled, using secondary only"
            ),
        }

        // The primary's failure is expected; only the secondary's error surfaces
        self.secondary.load(cancel, source_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::MemoryCouponSet;
    use std::sync::Mutex;

    /// Records requested keys; serves a fixed set or fails
    struct RecordingLoader {
        codes: Option<Vec<&'static str>>,
        requested: Mutex<Vec<String>>,
    }

    impl RecordingLoader {
        fn serving(codes: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                codes: Some(codes),
                requested: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                codes: None,
                requested: Mutex::new(Vec::new()),
            })
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CouponLoader for RecordingLoader {
        async fn load(
            &self,
            _cancel: &CancellationToken,
            source_id: &str,
        ) -> Result<Arc<dyn CouponSet>, LoadError> {
            self.requested.lock().unwrap().push(source_id.to_string());
            match &self.codes {
                Some(codes) => Ok(Arc::new(codes.iter().copied().collect::<MemoryCouponSet>())),
                None => Err(LoadError::Open {
                    source_id: source_id.to_string(),
                    reason: "not found".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let primary = RecordingLoader::serving(vec!["REMOTE123"]);
        let secondary = RecordingLoader::serving(vec!["LOCAL1234"]);
        let chain = FallbackLoader::new(Some(primary.clone()), secondary.clone(), "coupons/", true);

        let set = chain.load(&CancellationToken::new(), "base1.gz").await.unwrap();

        assert!(set.contains("REMOTE123"));
        assert_eq!(primary.requested(), vec!["coupons/base1.gz"]);
        assert!(secondary.requested().is_empty());
    }

    #[tokio::test]
    async fn test_primary_failure_falls_back_with_original_id() {
        let primary = RecordingLoader::failing();
        let secondary = RecordingLoader::serving(vec!["LOCAL1234"]);
        let chain = FallbackLoader::new(Some(primary.clone()), secondary.clone(), "coupons/", true);

        let set = chain
            .load(&CancellationToken::new(), "data/base1.gz")
            .await
            .unwrap();

        assert!(set.contains("LOCAL1234"));
        assert_eq!(primary.requested(), vec!["coupons/data/base1.gz"]);
        assert_eq!(secondary.requested(), vec!["data/base1.gz"]);
    }

    #[tokio::test]
    async fn test_disabled_primary_is_never_called() {
        let primary = RecordingLoader::serving(vec!["REMOTE123"]);
        let secondary = RecordingLoader::serving(vec!["LOCAL1234"]);
        let chain = FallbackLoader::new(Some(primary.clone()), secondary.clone(), "coupons/", false);

        let set = chain.load(&CancellationToken::new(), "base1.gz").await.unwrap();

        assert!(set.contains("LOCAL1234"));
        assert!(primary.requested().is_empty());
    }

    #[tokio::test]
    async fn test_missing_primary_uses_secondary() {
        let secondary = RecordingLoader::serving(vec!["LOCAL1234"]);
        let chain = FallbackLoader::new(None, secondary.clone(), "coupons/", true);

        let set = chain.load(&CancellationToken::new(), "base1.gz").await.unwrap();

        assert!(set.contains("LOCAL1234"));
        assert_eq!(secondary.requested(), vec!["base1.gz"]);
    }

    #[tokio::test]
    async fn test_both_fail_reports_secondary_error() {
        let chain = FallbackLoader::new(
            Some(RecordingLoader::failing()),
            RecordingLoader::failing(),
            "coupons/",
            true,
        );

        let err = match chain.load(&CancellationToken::new(), "base1.gz").await {
            Err(e) => e,
            Ok(_) => panic!("expected both loaders to fail"),
        };

        // Secondary saw the unprefixed id
        assert_eq!(err.source_id(), "base1.gz");
    }

    #[test]
    fn test_primary_key_prefixing() {
        let chain = FallbackLoader::new(None, RecordingLoader::failing(), "prefix/path/", true);
        assert_eq!(chain.primary_key("file.gz"), "prefix/path/file.gz");

        let chain = FallbackLoader::new(None, RecordingLoader::failing(), "", true);
        assert_eq!(chain.primary_key("file.gz"), "file.gz");
    }
}
