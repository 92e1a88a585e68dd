//! Route handlers for the Promptly API.

pub mod health;
pub mod history;
pub mod optimize;
pub mod quota;
pub mod webhook;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // Optimization
        .route("/optimize", post(optimize::optimize))
        .route("/v1/optimize", post(optimize::optimize))
        // Account
        .route("/v1/quota", get(quota::quota))
        .route("/v1/history", get(history::history))
        // Billing
        .route("/webhooks/billing", post(webhook::billing))
}
