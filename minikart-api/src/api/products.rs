//! Catalog endpoints

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};

use crate::db::products;
use crate::error::{ApiError, ApiResult};
use crate::models::{ListParams, Product};
use crate::pagination::calculate_page;
use crate::AppState;

/// GET /api/products?limit=&offset=
pub async fn list_products(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Product>>> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let page = calculate_page(params.limit, params.offset);

    let products = products::list_products(&state.db, page.limit, page.offset).await?;
    Ok(Json(products))
}

/// GET /api/products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    products::get_product(&state.db, &id)
        .await?
        .map(Json)
        .ok_or(ApiError::ProductNotFound(id))
}
