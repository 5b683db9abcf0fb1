//! Promo code validation
//!
//! A promo code is accepted when it appears in at least `min_match_count` of
//! several independently loaded coupon sources. Each source is a
//! gzip-compressed text file with one code per line, loaded once at startup
//! into an immutable [`CouponSet`].
//!
//! - [`set`]: in-memory membership sets
//! - [`loader`]: local file loader and the shared gzip line reader
//! - [`remote`]: object store loader (HTTP)
//! - [`fallback`]: primary/secondary loader chain
//! - [`validator`]: concurrent quorum lookup

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub mod fallback;
pub mod loader;
pub mod remote;
pub mod set;
pub mod validator;

pub use fallback::FallbackLoader;
pub use loader::{read_coupon_stream, FileLoader, LoadOptions};
pub use remote::ObjectStoreLoader;
pub use set::MemoryCouponSet;
pub use validator::{CouponValidator, Validation, ValidatorConfig, ValidatorError};

/// Read-only membership set built from one coupon source
///
/// Matching is exact and case-sensitive. Implementations must be safe to
/// query from many tasks at once without locking.
pub trait CouponSet: Send + Sync {
    /// Whether `code` is present (byte-for-byte)
    fn contains(&self, code: &str) -> bool;

    /// Number of distinct codes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source of coupon sets
///
/// `source_id` is a file path, an object key, or whatever the implementation
/// understands. Implementations check `cancel` periodically while streaming.
#[async_trait]
pub trait CouponLoader: Send + Sync {
    async fn load(
        &self,
        cancel: &CancellationToken,
        source_id: &str,
    ) -> Result<Arc<dyn CouponSet>, LoadError>;
}

/// Coupon source load failure
///
/// All variants are terminal: no partial set is ever returned.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Source missing or unreadable
    #[error("failed to open coupon source {source_id}: {reason}")]
    Open { source_id: String, reason: String },

    /// Stream is not valid gzip data
    #[error("coupon source {source_id} is not valid gzip data: {reason}")]
    Decompress { source_id: String, reason: String },

    /// I/O failure part way through the stream
    #[error("error reading coupon source {source_id}: {reason}")]
    Read { source_id: String, reason: String },

    /// Caller abandoned the load
    #[error("loading coupon source {source_id} was cancelled")]
    Cancelled { source_id: String },
}

impl LoadError {
    /// Identifier of the source that failed
    pub fn source_id(&self) -> &str {
        match self {
            LoadError::Open { source_id, .. }
            | LoadError::Decompress { source_id, .. }
            | LoadError::Read { source_id, .. }
            | LoadError::Cancelled { source_id } => source_id,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoadError::Cancelled { .. })
    }
}
