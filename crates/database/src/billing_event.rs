//! Processed billing webhook events.

use sqlx::SqlitePool;

use crate::Result;

/// Record a billing event.
///
/// Returns `false` if the event was already recorded, so callers can skip
/// replays.
pub async fn record_event(pool: &SqlitePool, event_id: &str, event_type: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO billing_events (event_id, event_type)
        VALUES (?, ?)
        "#,
    )
    .bind(event_id)
    .bind(event_type)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Forget a billing event so it can be applied again.
pub async fn forget_event(pool: &SqlitePool, event_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM billing_events WHERE event_id = ?
        "#,
    )
    .bind(event_id)
    .execute(pool)
    .await?;

    Ok(())
}
