//! API key middleware
//!
//! Protected routes require `X-API-Key` to equal the configured key.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::ApiError;
use crate::{AppState, API_KEY_HEADER};

/// Authentication middleware
///
/// Applied to `/api/*` routes only; `/health` does not use it.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        None => {
            warn!(path = %request.uri().path(), "Request without API key");
            Err(ApiError::Unauthorized("missing API key".to_string()))
        }
        Some(key) if !keys_match(key, &state.api_key) => {
            warn!(path = %request.uri().path(), "Request with invalid API key");
            Err(ApiError::Unauthorized("invalid API key".to_string()))
        }
        Some(_) => Ok(next.run(request).await),
    }
}

/// Compare without short-circuiting on the first differing byte
fn keys_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
