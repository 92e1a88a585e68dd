//! Quota status endpoint.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use optimizer_core::Tier;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::{ApiError, Result};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaResponse {
    pub tier: Tier,
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
    pub resets_at: DateTime<Utc>,
}

/// `GET /v1/quota`.
pub async fn quota(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<QuotaResponse>> {
    let resets_at = state.day_reset();
    let info = state
        .service
        .quota_status(&user_id)
        .await
        .map_err(|e| ApiError::from_service(e, Tier::Free, resets_at))?;

    Ok(Json(QuotaResponse {
        tier: info.tier,
        limit: info.limit,
        used: info.used,
        remaining: info.remaining,
        resets_at,
    }))
}
