//! Order placement and lookup
//!
//! Placement order: request shape, promo code, product existence, then one
//! transaction for the order and its items.

use chrono::Utc;
use minikart_common::coupon::{CouponValidator, Validation};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{orders, products};
use crate::error::{ApiError, ApiResult};
use crate::models::{Order, OrderItem, OrderRequest, OrderResponse};

/// Check item list shape before touching the validator or database
pub fn validate_request(request: &OrderRequest) -> ApiResult<()> {
    if request.items.is_empty() {
        return Err(ApiError::MissingField(
            "order must contain at least one item".to_string(),
        ));
    }

    for item in &request.items {
        if item.product_id.trim().is_empty() {
            return Err(ApiError::MissingField("productId is required".to_string()));
        }
        if item.quantity <= 0 {
            return Err(ApiError::InvalidQuantity(format!(
                "quantity for product {} must be greater than zero",
                item.product_id
            )));
        }
    }

    Ok(())
}

/// Map a validation outcome onto the API error space
pub fn check_promo_outcome(outcome: Validation) -> ApiResult<()> {
    match outcome {
        Validation::Valid => Ok(()),
        Validation::InvalidLength => Err(ApiError::InvalidPromoLength),
        Validation::InvalidCode => Err(ApiError::InvalidPromoCode),
        Validation::TimedOut | Validation::Cancelled => Err(ApiError::PromoUnavailable),
    }
}

pub async fn create_order(
    db: &SqlitePool,
    validator: &CouponValidator,
    cancel: &CancellationToken,
    request: OrderRequest,
) -> ApiResult<OrderResponse> {
    validate_request(&request)?;

    if let Some(code) = request.promo_code() {
        let outcome = validator.validate(cancel, code).await;
        match outcome {
            Validation::Valid => debug!("Promo code accepted"),
            Validation::TimedOut | Validation::Cancelled => {
                warn!(outcome = ?outcome, "Promo code validation did not complete")
            }
            _ => debug!(outcome = ?outcome, "Promo code rejected"),
        }
        check_promo_outcome(outcome)?;
    }

    let product_ids: Vec<String> = request
        .items
        .iter()
        .map(|item| item.product_id.clone())
        .collect();

    let missing = products::missing_product_ids(db, &product_ids).await?;
    if !missing.is_empty() {
        warn!(missing = ?missing, "Order references unknown products");
        return Err(ApiError::UnknownProducts(missing));
    }

    let now = Utc::now();
    let id = Uuid::new_v4();
    let order = Order {
        id: id.to_string(),
        coupon_code: request.promo_code().map(str::to_string),
        created_at: now,
        updated_at: now,
    };
    let items: Vec<OrderItem> = request
        .items
        .into_iter()
        .map(|item| OrderItem {
            product_id: item.product_id,
            quantity: item.quantity,
        })
        .collect();

    // Dropping an uncommitted transaction rolls it back
    let mut tx = db.begin().await?;
    orders::insert_order(&mut tx, &order, &items).await?;
    tx.commit().await?;

    let products = products::get_products(db, &product_ids).await?;

    info!(order_id = %id, item_count = items.len(), "Order created");

    Ok(OrderResponse {
        id,
        coupon_code: order.coupon_code,
        items,
        products,
        created_at: order.created_at,
    })
}

pub async fn get_order(db: &SqlitePool, id: &str) -> ApiResult<OrderResponse> {
    let id = Uuid::parse_str(id)
        .map_err(|_| ApiError::BadRequest("invalid order ID format".to_string()))?;

    let Some((order, items)) = orders::get_order(db, &id.to_string()).await? else {
        debug!(order_id = %id, "Order not found");
        return Err(ApiError::OrderNotFound(id.to_string()));
    };

    let product_ids: Vec<String> = items.iter().map(|item| item.product_id.clone()).collect();
    let products = products::get_products(db, &product_ids).await?;

    Ok(OrderResponse {
        id,
        coupon_code: order.coupon_code,
        items,
        products,
        created_at: order.created_at,
    })
}
