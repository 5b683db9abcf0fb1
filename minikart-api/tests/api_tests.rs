//! Integration tests for minikart-api endpoints
//!
//! Each test builds the router over an in-memory database seeded with the
//! sample catalog and a validator loaded from the sample coupon files.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use minikart_api::{build_router, db, sample, AppState};
use minikart_common::coupon::{FileLoader, LoadOptions, ValidatorConfig};
use minikart_common::CouponValidator;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt; // for `oneshot` method

const API_KEY: &str = "test-api-key";

/// Test helper: Validator over the sample coupon files
async fn sample_validator() -> CouponValidator {
    let dir = TempDir::new().unwrap();
    let paths = sample::write_sample_coupons(dir.path()).unwrap();

    let config = ValidatorConfig {
        sources: paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect(),
        ..ValidatorConfig::default()
    };

    CouponValidator::new(
        &CancellationToken::new(),
        config,
        Arc::new(FileLoader::new(LoadOptions::default())),
    )
    .await
    .expect("Sample coupons should load")
}

/// Test helper: Router, its shutdown token, and the pool behind it
async fn setup_app_with_pool() -> (Router, CancellationToken, SqlitePool) {
    let pool = db::init_memory_database().await.unwrap();
    let shutdown = CancellationToken::new();
    let state = AppState::new(
        pool.clone(),
        Arc::new(sample_validator().await),
        API_KEY,
        shutdown.clone(),
    );
    (build_router(state), shutdown, pool)
}

async fn setup_app() -> (Router, CancellationToken) {
    let (app, shutdown, _) = setup_app_with_pool().await;
    (app, shutdown)
}

async fn order_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("X-API-Key", API_KEY)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("X-API-Key", API_KEY)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn order_body(coupon_code: Option<&str>, items: &[(&str, i64)]) -> String {
    let items: Vec<Value> = items
        .iter()
        .map(|(id, qty)| json!({"productId": id, "quantity": qty}))
        .collect();
    let mut body = json!({ "items": items });
    if let Some(code) = coupon_code {
        body["couponCode"] = json!(code);
    }
    body.to_string()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let (app, _) = setup_app().await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "minikart-api");
    assert!(body["version"].is_string());
    assert_eq!(body["couponSources"], 3);
    assert_eq!(body["couponCodes"], 15);
}

#[tokio::test]
async fn test_missing_api_key_rejected() {
    let (app, _) = setup_app().await;

    let request = Request::builder()
        .uri("/api/products")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_wrong_api_key_rejected() {
    let (app, _) = setup_app().await;

    let request = Request::builder()
        .uri("/api/products")
        .header("X-API-Key", "not-the-key")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_list_products_default_page() {
    let (app, _) = setup_app().await;

    let (status, body) = send(&app, get("/api/products")).await;

    assert_eq!(status, StatusCode::OK);
    let products = body.as_array().unwrap();
    assert_eq!(products.len(), 5);
    assert_eq!(products[0]["id"], "P001");
    assert!(products[0]["createdAt"].is_string());
}

#[tokio::test]
async fn test_list_products_limit_and_offset() {
    let (app, _) = setup_app().await;

    let (_, body) = send(&app, get("/api/products?limit=2&offset=1")).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["P002", "P003"]);

    // Clamped rather than rejected
    let (status, body) = send(&app, get("/api/products?limit=1000&offset=-4")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_list_products_malformed_limit() {
    let (app, _) = setup_app().await;

    let (status, body) = send(&app, get("/api/products?limit=ten")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_get_product() {
    let (app, _) = setup_app().await;

    let (status, body) = send(&app, get("/api/products/P004")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Test Product 4");
    assert_eq!(body["category"], "C");

    let (status, body) = send(&app, get("/api/products/P999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "PRODUCT_NOT_FOUND");
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_create_and_fetch_order_without_coupon() {
    let (app, _) = setup_app().await;

    let (status, created) = send(
        &app,
        post_json("/api/orders", order_body(None, &[("P001", 2), ("P003", 1)])),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["items"].as_array().unwrap().len(), 2);
    assert_eq!(created["products"].as_array().unwrap().len(), 2);
    assert!(created.get("couponCode").is_none());

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(&app, get(&format!("/api/orders/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);
    assert_eq!(fetched["items"], created["items"]);
}

#[tokio::test]
async fn test_create_order_with_valid_coupon() {
    let (app, _) = setup_app().await;

    let (status, body) = send(
        &app,
        post_json("/api/orders", order_body(Some("SUMMER2024"), &[("P002", 1)])),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["couponCode"], "SUMMER2024");
}

#[tokio::test]
async fn test_coupon_in_single_source_rejected() {
    let (app, _) = setup_app().await;

    let (status, body) = send(
        &app,
        post_json("/api/orders", order_body(Some("ONLYONE111"), &[("P002", 1)])),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PROMO_CODE");
}

#[tokio::test]
async fn test_coupon_length_rejected() {
    let (app, _) = setup_app().await;

    for code in ["SHORT", "WAYTOOLONGCODE"] {
        let (status, body) = send(
            &app,
            post_json("/api/orders", order_body(Some(code), &[("P002", 1)])),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_PROMO_LENGTH");
    }
}

#[tokio::test]
async fn test_empty_coupon_is_ignored() {
    let (app, _) = setup_app().await;

    let (status, _) = send(
        &app,
        post_json("/api/orders", order_body(Some(""), &[("P002", 1)])),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_coupon_during_shutdown_is_unavailable() {
    let (app, shutdown) = setup_app().await;
    shutdown.cancel();

    let (status, body) = send(
        &app,
        post_json("/api/orders", order_body(Some("ALLTHREE1"), &[("P002", 1)])),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "PROMO_VALIDATION_UNAVAILABLE");
}

#[tokio::test]
async fn test_unknown_product_rejected() {
    let (app, _) = setup_app().await;

    let (status, body) = send(
        &app,
        post_json("/api/orders", order_body(None, &[("P001", 1), ("P999", 1)])),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "PRODUCT_NOT_FOUND");
}

#[tokio::test]
async fn test_request_validation_errors() {
    let (app, _) = setup_app().await;

    let (status, body) = send(&app, post_json("/api/orders", order_body(None, &[("P001", 0)]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_QUANTITY");

    let (status, body) = send(&app, post_json("/api/orders", order_body(None, &[]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_FIELD");

    let (status, body) = send(&app, post_json("/api/orders", "{not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_JSON");
}

#[tokio::test]
async fn test_rejected_orders_are_not_stored() {
    let (app, _, pool) = setup_app_with_pool().await;

    send(
        &app,
        post_json("/api/orders", order_body(Some("ONLYTWO222"), &[("P001", 1)])),
    )
    .await;
    send(&app, post_json("/api/orders", order_body(None, &[("P999", 1)]))).await;
    assert_eq!(order_count(&pool).await, 0);

    let (status, _) = send(&app, post_json("/api/orders", order_body(None, &[("P001", 1)]))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order_count(&pool).await, 1);
}

#[tokio::test]
async fn test_get_order_errors() {
    let (app, _) = setup_app().await;

    let (status, body) = send(&app, get("/api/orders/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = send(
        &app,
        get("/api/orders/6f1c9a53-8a34-4c1e-9a8e-2d5b7f0e4c11"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "ORDER_NOT_FOUND");
}
