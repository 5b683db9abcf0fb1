//! Concurrent quorum validator
//!
//! Construction loads every configured source in parallel and fails as a
//! whole if any single source fails. After that the set list is never
//! mutated, so concurrent `validate` calls share it without locking.
//!
//! Each `validate` call fans out one lookup task per source and stops as soon
//! as the outcome is decided: quorum reached, quorum no longer reachable,
//! deadline elapsed, or caller cancelled.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{CouponLoader, CouponSet, LoadError};

/// Outcome of validating one candidate code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// Found in at least `min_match_count` sources
    Valid,
    /// Length outside the accepted window; no source was consulted
    InvalidLength,
    /// Quorum not met
    InvalidCode,
    /// Lookup deadline elapsed before the outcome was decided
    TimedOut,
    /// Caller cancelled before the outcome was decided
    Cancelled,
}

impl Validation {
    pub fn is_valid(self) -> bool {
        self == Validation::Valid
    }
}

/// Validator construction failure
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("failed to load coupon source #{index} ({source_id}): {error}")]
    Load {
        index: usize,
        source_id: String,
        #[source]
        error: LoadError,
    },

    /// A load task panicked or was aborted
    #[error("coupon load task failed: {reason}")]
    TaskFailed { reason: String },
}

/// Sources and quorum policy
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Source identifiers; order is kept for reporting only
    pub sources: Vec<String>,
    /// Sources a code must appear in
    pub min_match_count: usize,
    /// Accepted code length in characters, inclusive
    pub code_length: RangeInclusive<usize>,
    /// Deadline for the lookup phase of each `validate` call
    pub lookup_timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                "data/coupons/couponbase1.gz".to_string(),
                "data/coupons/couponbase2.gz".to_string(),
                "data/coupons/couponbase3.gz".to_string(),
            ],
            min_match_count: 2,
            code_length: 8..=10,
            lookup_timeout: Duration::from_secs(2),
        }
    }
}

/// Immutable aggregate of loaded coupon sets plus the quorum policy
pub struct CouponValidator {
    sets: Vec<Arc<dyn CouponSet>>,
    min_match_count: usize,
    code_length: RangeInclusive<usize>,
    lookup_timeout: Duration,
}

impl std::fmt::Debug for CouponValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouponValidator")
            .field("sources", &self.sets.len())
            .field("min_match_count", &self.min_match_count)
            .field("code_length", &self.code_length)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}

impl CouponValidator {
    /// Load every source concurrently and build the validator
    ///
    /// Fails on the first source that cannot be loaded; the remaining loads
    /// are cancelled and awaited before returning, so no load outlives this
    /// call.
    pub async fn new(
        cancel: &CancellationToken,
        config: ValidatorConfig,
        loader: Arc<dyn CouponLoader>,
    ) -> Result<Self, ValidatorError> {
        let source_count = config.sources.len();
        info!(
            sources = source_count,
            min_match_count = config.min_match_count,
            "Initialising coupon validator"
        );
        if config.min_match_count > source_count {
            warn!(
                sources = source_count,
                min_match_count = config.min_match_count,
                "Quorum exceeds source count; no code can ever validate"
            );
        }

        let load_cancel = cancel.child_token();
        let mut join_set = JoinSet::new();
        for (index, source_id) in config.sources.iter().enumerate() {
            let loader = Arc::clone(&loader);
            let source_id = source_id.clone();
            let token = load_cancel.clone();
            join_set.spawn(async move {
                let result = loader.load(&token, &source_id).await;
                (index, source_id, result)
            });
        }

        let mut slots: Vec<Option<Arc<dyn CouponSet>>> = vec![None; source_count];
        let mut first_error: Option<ValidatorError> = None;

        while let Some(joined) = join_set.join_next().await {
            let failure = match joined {
                Ok((index, source_id, Ok(set))) => {
                    info!(index, source_id = %source_id, size = set.len(), "Coupon source loaded");
                    slots[index] = Some(set);
                    continue;
                }
                Ok((index, source_id, Err(error))) => ValidatorError::Load {
                    index,
                    source_id,
                    error,
                },
                Err(join_error) => ValidatorError::TaskFailed {
                    reason: join_error.to_string(),
                },
            };

            if first_error.is_none() {
                error!(error = %failure, "Coupon source failed to load; aborting remaining loads");
                load_cancel.cancel();
                first_error = Some(failure);
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }

        let sets: Vec<Arc<dyn CouponSet>> = slots.into_iter().flatten().collect();
        let total_codes: usize = sets.iter().map(|s| s.len()).sum();
        info!(sources = sets.len(), total_codes, "Coupon validator initialised");

        Ok(Self {
            sets,
            min_match_count: config.min_match_count,
            code_length: config.code_length,
            lookup_timeout: config.lookup_timeout,
        })
    }

    /// Validate `code` with the configured lookup deadline
    pub async fn validate(&self, cancel: &CancellationToken, code: &str) -> Validation {
        self.validate_until(cancel, code, Instant::now() + self.lookup_timeout)
            .await
    }

    /// Validate `code`, giving up at `deadline`
    pub async fn validate_until(
        &self,
        cancel: &CancellationToken,
        code: &str,
        deadline: Instant,
    ) -> Validation {
        let length = code.chars().count();
        if !self.code_length.contains(&length) {
            debug!(length, "Promo code length invalid");
            return Validation::InvalidLength;
        }

        let outcome = self.lookup_quorum(cancel, code, deadline).await;
        debug!(?outcome, "Promo code lookup finished");
        outcome
    }

    /// Fan out one lookup per source and count matches until decided
    async fn lookup_quorum(
        &self,
        cancel: &CancellationToken,
        code: &str,
        deadline: Instant,
    ) -> Validation {
        let total = self.sets.len();
        let quorum = self.min_match_count;
        if quorum > total {
            return Validation::InvalidCode;
        }
        if quorum == 0 {
            return Validation::Valid;
        }

        // Capacity = number of tasks, so a late task never blocks on send
        let (tx, mut rx) = mpsc::channel::<bool>(total);
        let lookup_cancel = cancel.child_token();
        let _stop_lookups = lookup_cancel.clone().drop_guard();
        let code: Arc<str> = Arc::from(code);

        for set in &self.sets {
            let set = Arc::clone(set);
            let code = Arc::clone(&code);
            let tx = tx.clone();
            let token = lookup_cancel.clone();
            tokio::spawn(async move {
                if token.is_cancelled() {
                    return;
                }
                let found = set.contains(&code);
                if token.is_cancelled() {
                    return;
                }
                let _ = tx.try_send(found);
            });
        }
        drop(tx);

        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        let mut matches = 0usize;
        let mut checked = 0usize;

        while checked < total {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Validation::Cancelled,
                _ = &mut sleep => return Validation::TimedOut,
                result = rx.recv() => {
                    let Some(found) = result else {
                        // Every sender gone before all results arrived: only
                        // possible when lookups were cancelled.
                        return if cancel.is_cancelled() {
                            Validation::Cancelled
                        } else {
                            Validation::TimedOut
                        };
                    };
                    checked += 1;
                    if found {
                        matches += 1;
                        if matches >= quorum {
                            return Validation::Valid;
                        }
                    }
                    if matches + (total - checked) < quorum {
                        return Validation::InvalidCode;
                    }
                }
            }
        }

        if matches >= quorum {
            Validation::Valid
        } else {
            Validation::InvalidCode
        }
    }

    /// Number of loaded sources
    pub fn source_count(&self) -> usize {
        self.sets.len()
    }

    /// Code count per source, in configured order
    pub fn source_sizes(&self) -> Vec<usize> {
        self.sets.iter().map(|s| s.len()).collect()
    }

    /// Sum of code counts across sources
    pub fn total_codes(&self) -> usize {
        self.sets.iter().map(|s| s.len()).sum()
    }

    pub fn min_match_count(&self) -> usize {
        self.min_match_count
    }

    /// Release the loaded sets
    ///
    /// Consumes the validator, so no lookup can run afterwards. Sets still
    /// referenced by in-flight lookup tasks are freed when those tasks exit.
    pub fn close(self) {
        let sources = self.sets.len();
        drop(self.sets);
        info!(sources, "Coupon validator closed");
    }
}
