//! Multivendor marketplace service
//!
//! REST and WebSocket backend where vendors list products, customers buy
//! them and admins run the store.
//!
//! ## Features
//! - Vendor catalogues with embedded variants, ratings and flash sales
//! - Variant combination generation, SKU/barcode assignment and CSV/JSON
//!   bulk import/export
//! - Shipping templates and zone quotes
//! - Per-vendor order dashboard with live notifications
//! - JWT authentication for customers, vendors and admins

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod notifications;
pub mod repository;
pub mod routes;
pub mod shipping;
pub mod state;
pub mod variants;

pub use config::Config;
pub use error::{ApiError, Result};
pub use state::AppState;
