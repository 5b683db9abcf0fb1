//! Hash-backed coupon set

use std::collections::HashSet;

use super::CouponSet;

/// [`CouponSet`] backed by a `HashSet<String>`
///
/// Built once by a loader, then shared read-only.
#[derive(Debug, Default, Clone)]
pub struct MemoryCouponSet {
    codes: HashSet<String>,
}

impl MemoryCouponSet {
    /// Empty set pre-sized for `capacity` codes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            codes: HashSet::with_capacity(capacity),
        }
    }

    /// Add a code; re-adding an existing code is a no-op
    pub(crate) fn insert(&mut self, code: &str) {
        if !self.codes.contains(code) {
            self.codes.insert(code.to_owned());
        }
    }

    /// Release unused capacity left over from pre-sizing
    pub(crate) fn shrink_to_fit(&mut self) {
        self.codes.shrink_to_fit();
    }
}

impl CouponSet for MemoryCouponSet {
    fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    fn len(&self) -> usize {
        self.codes.len()
    }
}

impl<S: Into<String>> FromIterator<S> for MemoryCouponSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().map(Into::into).collect(),
        }
    }
}
