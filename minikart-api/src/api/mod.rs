//! HTTP API handlers for minikart-api

pub mod auth;
pub mod health;
pub mod orders;
pub mod panic;
pub mod products;

pub use auth::auth_middleware;
pub use health::health_routes;
pub use orders::{create_order, get_order};
pub use panic::handle_panic;
pub use products::{get_product, list_products};
