//! Pagination for catalog listings
//!
//! `limit` defaults to 10 and is clamped to [1, 100]; negative offsets become 0.

/// Rows returned when no limit is given
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page a caller may request
pub const MAX_LIMIT: i64 = 100;

/// Sanitized LIMIT/OFFSET pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

/// Clamp requested paging values into the accepted range
///
/// # Examples
/// ```
/// use minikart_api::pagination::calculate_page;
///
/// let p = calculate_page(None, None);
/// assert_eq!((p.limit, p.offset), (10, 0));
///
/// // Out-of-range values get clamped
/// let p = calculate_page(Some(500), Some(-3));
/// assert_eq!((p.limit, p.offset), (100, 0));
/// ```
pub fn calculate_page(limit: Option<i64>, offset: Option<i64>) -> Page {
    let limit = match limit {
        Some(l) if l > 0 => l.min(MAX_LIMIT),
        _ => DEFAULT_LIMIT,
    };
    let offset = offset.unwrap_or(0).max(0);

    Page { limit, offset }
}
