//! Order endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::error::{ApiError, ApiResult};
use crate::models::{OrderRequest, OrderResponse};
use crate::services::orders;
use crate::AppState;

/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidJson(e.body_text()))?;

    // Stops outstanding lookups if the client goes away or the server shuts down
    let cancel = state.shutdown.child_token();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let order = orders::create_order(&state.db, &state.validator, &cancel, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders/:id
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderResponse>> {
    orders::get_order(&state.db, &id).await.map(Json)
}
