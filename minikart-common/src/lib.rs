//! # Mini-Kart Common Library
//!
//! Shared code for the Mini-Kart services including:
//! - Error types
//! - Configuration loading and validation
//! - Promo code validation (coupon sources, loaders, quorum validator)

pub mod config;
pub mod coupon;
pub mod error;

pub use coupon::{CouponValidator, Validation};
pub use error::{Error, Result};
