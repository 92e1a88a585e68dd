//! Promptly HTTP API.
//!
//! Serves the browser extension: authenticated prompt optimization, quota
//! and history lookups, plus the billing webhook that moves users between
//! tiers.
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /health` | Liveness check |
//! | `POST /optimize`, `POST /v1/optimize` | Rewrite a prompt |
//! | `GET /v1/quota` | Today's allowance |
//! | `GET /v1/history` | Recent optimizations |
//! | `POST /webhooks/billing` | Signed billing events |

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use state::AppState;

/// Build the application with middleware and state attached.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        // The extension calls from arbitrary page origins.
        .layer(CorsLayer::permissive())
        .with_state(state)
}
