//! Prompt optimization endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use optimizer_core::Tier;
use orchestrator::UsageLog;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::{rate_limit_headers, ApiError, QuotaSummary, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OptimizeBody {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub tier: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeResponse {
    pub optimized_prompt: String,
    pub tokens_used: u32,
    pub model: String,
    pub tier: Tier,
    pub quota_info: QuotaSummary,
    pub usage_logged: bool,
}

/// `POST /optimize` and `POST /v1/optimize`.
pub async fn optimize(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: std::result::Result<Json<OptimizeBody>, JsonRejection>,
) -> Result<Response> {
    let Json(body) = body.map_err(|e| ApiError::InvalidInput(e.body_text()))?;

    let declared = body.tier.as_deref().unwrap_or("free");
    let declared_tier = Tier::parse(declared).ok_or_else(|| {
        ApiError::InvalidInput(format!("tier must be \"free\" or \"pro\", got {:?}", declared))
    })?;

    let outcome = state
        .service
        .optimize(&user_id, &body.prompt, declared_tier.as_str())
        .await
        .map_err(|e| ApiError::from_service(e, declared_tier, state.day_reset()))?;

    match &outcome.usage_log {
        UsageLog::Recorded { .. } => {}
        UsageLog::Unlogged { reason, .. } => {
            tracing::warn!(user_id = %user_id, reason = %reason, "Optimization counted without prompt log");
        }
        UsageLog::Failed { reason } => {
            tracing::warn!(user_id = %user_id, reason = %reason, "Optimization served without usage log");
        }
    }

    let rate = outcome.rate;
    let headers = rate_limit_headers(rate.limit, rate.remaining, rate.reset_at, &rate.policy());

    let response = OptimizeResponse {
        tokens_used: outcome.optimization.tokens_used(),
        optimized_prompt: outcome.optimization.text,
        model: outcome.optimization.model,
        tier: outcome.tier,
        quota_info: QuotaSummary::from(&outcome.quota),
        usage_logged: matches!(outcome.usage_log, UsageLog::Recorded { .. }),
    };

    Ok((headers, Json(response)).into_response())
}
