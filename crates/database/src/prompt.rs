//! Prompt log operations.

use sqlx::SqlitePool;

use crate::models::{NewPrompt, PromptRecord};
use crate::Result;

/// Append an optimization to the log.
pub async fn insert_prompt(pool: &SqlitePool, prompt: &NewPrompt) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO prompts (id, user_id, original_text, optimized_text, tokens_in, tokens_out, model, tier)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&prompt.id)
    .bind(&prompt.user_id)
    .bind(&prompt.original_text)
    .bind(&prompt.optimized_text)
    .bind(prompt.tokens_in)
    .bind(prompt.tokens_out)
    .bind(&prompt.model)
    .bind(&prompt.tier)
    .execute(pool)
    .await?;

    tracing::debug!(user_id = %prompt.user_id, model = %prompt.model, "Logged prompt");

    Ok(())
}

/// Most recent optimizations for a user, newest first.
pub async fn list_recent(pool: &SqlitePool, user_id: &str, limit: i64) -> Result<Vec<PromptRecord>> {
    let records = sqlx::query_as::<_, PromptRecord>(
        r#"
        SELECT id, user_id, original_text, optimized_text, tokens_in, tokens_out, model, tier, created_at
        FROM prompts
        WHERE user_id = ?
        ORDER BY created_at DESC, rowid DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Number of optimizations ever logged for a user.
pub async fn count_for_user(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM prompts WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
