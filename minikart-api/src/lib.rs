//! minikart-api library - order and catalog service
//!
//! Products are read from SQLite; orders may carry a promo code, which is
//! checked against the coupon validator before the order is stored.

use axum::http::{header, HeaderName, Method};
use axum::Router;
use minikart_common::config::TomlConfig;
use minikart_common::coupon::{CouponLoader, FallbackLoader, FileLoader, ObjectStoreLoader};
use minikart_common::{CouponValidator, Error};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod sample;
pub mod services;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Loaded coupon sources and quorum policy
    pub validator: Arc<CouponValidator>,
    /// Expected `X-API-Key` value
    pub api_key: Arc<str>,
    /// Cancelled at shutdown; every in-flight validation derives from it
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: SqlitePool,
        validator: Arc<CouponValidator>,
        api_key: impl Into<Arc<str>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            db,
            validator,
            api_key: api_key.into(),
            shutdown,
        }
    }
}

/// Build application router
///
/// `/health` is public; everything under `/api` requires the API key.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/api/products", get(api::list_products))
        .route("/api/products/:id", get(api::get_product))
        .route("/api/orders", post(api::create_order))
        .route("/api/orders/:id", get(api::get_order))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)]);

    Router::new()
        .merge(protected)
        .merge(api::health_routes())
        .with_state(state)
        .layer(CatchPanicLayer::custom(api::handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Loader chain for the configured coupon sources
///
/// With `[remote] enabled`, the object store is tried first (key =
/// `prefix + source`) and the local file is the fallback.
pub fn coupon_loader(config: &TomlConfig) -> minikart_common::Result<Arc<dyn CouponLoader>> {
    let options = config.coupons.load_options();
    let local: Arc<dyn CouponLoader> = Arc::new(FileLoader::new(options));

    let remote = &config.remote;
    if !remote.enabled {
        return Ok(local);
    }

    let store = match &remote.endpoint {
        Some(endpoint) => ObjectStoreLoader::new(endpoint.as_str(), remote.bucket.as_str(), options),
        None => ObjectStoreLoader::for_s3(remote.bucket.as_str(), &remote.region, options),
    }
    .map_err(|e| Error::Config(format!("failed to create object store client: {}", e)))?;

    Ok(Arc::new(FallbackLoader::new(
        Some(Arc::new(store)),
        local,
        remote.prefix.as_str(),
        true,
    )))
}
