//! Per-day usage counters.
//!
//! There is at most one row per (user, day). Counters only ever go up; a new
//! day starts a new row rather than resetting an old one.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::models::QuotaLog;
use crate::Result;

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Atomically create or increment the counter for a user's day.
///
/// Returns the counter value after the increment.
pub async fn increment_usage(pool: &SqlitePool, user_id: &str, day: NaiveDate) -> Result<i64> {
    let used = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO quota_logs (user_id, day, prompts_used)
        VALUES (?, ?, 1)
        ON CONFLICT(user_id, day) DO UPDATE SET
            prompts_used = prompts_used + 1,
            updated_at = datetime('now')
        RETURNING prompts_used
        "#,
    )
    .bind(user_id)
    .bind(day_key(day))
    .fetch_one(pool)
    .await?;

    Ok(used)
}

/// Usage for a user's day, zero when no row exists yet.
pub async fn get_usage(pool: &SqlitePool, user_id: &str, day: NaiveDate) -> Result<i64> {
    let used = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT prompts_used
        FROM quota_logs
        WHERE user_id = ? AND day = ?
        "#,
    )
    .bind(user_id)
    .bind(day_key(day))
    .fetch_optional(pool)
    .await?;

    Ok(used.unwrap_or(0))
}

/// All counters for a user, newest day first.
pub async fn list_for_user(pool: &SqlitePool, user_id: &str, limit: i64) -> Result<Vec<QuotaLog>> {
    let rows = sqlx::query_as::<_, QuotaLog>(
        r#"
        SELECT user_id, day, prompts_used, updated_at
        FROM quota_logs
        WHERE user_id = ?
        ORDER BY day DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
