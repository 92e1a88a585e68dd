//! Session lookups for bearer-token authentication.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::Result;

/// Store a session token for a user.
pub async fn create_session(
    pool: &SqlitePool,
    token: &str,
    user_id: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sessions (token, user_id, expires_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(token)
    .bind(user_id)
    .bind(expires_at.map(|t| t.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Resolve a token to its user ID.
///
/// Returns `None` for unknown tokens and for sessions that expired before `now`.
pub async fn user_for_token(
    pool: &SqlitePool,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>> {
    let row = sqlx::query_as::<_, (String, Option<String>)>(
        r#"
        SELECT user_id, expires_at
        FROM sessions
        WHERE token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let Some((user_id, expires_at)) = row else {
        return Ok(None);
    };

    if let Some(expires_at) = expires_at {
        match DateTime::parse_from_rfc3339(&expires_at) {
            Ok(expiry) if expiry.with_timezone(&Utc) > now => {}
            Ok(_) => return Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable session expiry, treating as expired");
                return Ok(None);
            }
        }
    }

    Ok(Some(user_id))
}

/// Delete a session.
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM sessions WHERE token = ?
        "#,
    )
    .bind(token)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
