//! Axum HTTP server for the shorts pipeline.
//!
//! This crate provides:
//! - Manual run trigger with immediate acknowledgment
//! - Server-sent progress events for any number of observers
//! - Status line and automation settings endpoints
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
