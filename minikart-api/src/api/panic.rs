//! Panic recovery
//!
//! A panicking handler becomes a JSON 500 instead of a dropped connection.

use axum::response::{IntoResponse, Response};
use std::any::Any;
use tracing::error;

use crate::error::ApiError;

pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    error!(panic = %detail, "Handler panicked");
    ApiError::Internal(detail).into_response()
}
