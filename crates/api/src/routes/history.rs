//! Recent optimizations for the signed-in user.

use axum::extract::{Query, State};
use axum::Json;
use database::{prompt, PromptRecord};
use optimizer_core::Tier;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub original_text: String,
    pub optimized_text: String,
    pub tokens_used: i64,
    pub model: String,
    pub tier: Tier,
    pub created_at: String,
}

impl From<PromptRecord> for HistoryItem {
    fn from(record: PromptRecord) -> Self {
        Self {
            tokens_used: record.tokens_in + record.tokens_out,
            tier: Tier::from_declared(&record.tier),
            id: record.id,
            original_text: record.original_text,
            optimized_text: record.optimized_text,
            model: record.model,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub items: Vec<HistoryItem>,
}

/// `GET /v1/history?limit=N`.
pub async fn history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let records = prompt::list_recent(state.db.pool(), &user_id, limit).await?;

    Ok(Json(HistoryResponse {
        items: records.into_iter().map(HistoryItem::from).collect(),
    }))
}
