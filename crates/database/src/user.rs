//! User operations.

use optimizer_core::Tier;
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::User;

/// Create a new user.
pub async fn create_user(
    pool: &SqlitePool,
    id: &str,
    email: Option<&str>,
    tier: Tier,
) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, tier)
        VALUES (?, ?, ?)
        RETURNING id, email, tier, billing_customer_id, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(tier.code())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "User",
                    id: id.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })
}

/// Get a user by ID.
pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, tier, billing_customer_id, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })
}

/// Get a user's current tier.
pub async fn get_tier(pool: &SqlitePool, id: &str) -> Result<Tier> {
    let value = sqlx::query_scalar::<_, String>(
        r#"
        SELECT tier FROM users WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })?;

    Tier::parse(&value).ok_or(DatabaseError::InvalidTier {
        user_id: id.to_string(),
        value,
    })
}

/// Set a user's tier.
pub async fn set_tier(pool: &SqlitePool, id: &str, tier: Tier) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET tier = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(tier.code())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Set the tier of the user linked to a billing customer.
pub async fn set_tier_by_customer(pool: &SqlitePool, customer_id: &str, tier: Tier) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET tier = ?, updated_at = datetime('now')
        WHERE billing_customer_id = ?
        "#,
    )
    .bind(tier.code())
    .bind(customer_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Customer",
            id: customer_id.to_string(),
        });
    }

    Ok(())
}

/// Link a user to a billing customer.
///
/// A customer already linked to another user is `AlreadyExists`.
pub async fn attach_customer(pool: &SqlitePool, id: &str, customer_id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET billing_customer_id = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(customer_id)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Customer",
                    id: customer_id.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;

        let user = create_user(db.pool(), "u1", Some("a@example.com"), Tier::Free)
            .await
            .unwrap();
        assert_eq!(user.tier, "FREE");

        let fetched = get_user(db.pool(), "u1").await.unwrap();
        assert_eq!(fetched.email.as_deref(), Some("a@example.com"));
        assert_eq!(get_tier(db.pool(), "u1").await.unwrap(), Tier::Free);
    }

    #[tokio::test]
    async fn test_duplicate_user() {
        let db = test_db().await;
        create_user(db.pool(), "u1", None, Tier::Free).await.unwrap();

        let result = create_user(db.pool(), "u1", None, Tier::Pro).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_missing_user() {
        let db = test_db().await;

        let result = get_tier(db.pool(), "ghost").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
        let result = set_tier(db.pool(), "ghost", Tier::Pro).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_tier_changes_by_customer() {
        let db = test_db().await;
        create_user(db.pool(), "u1", None, Tier::Free).await.unwrap();
        attach_customer(db.pool(), "u1", "cus_123").await.unwrap();

        set_tier_by_customer(db.pool(), "cus_123", Tier::Pro).await.unwrap();
        assert_eq!(get_tier(db.pool(), "u1").await.unwrap(), Tier::Pro);

        set_tier(db.pool(), "u1", Tier::Free).await.unwrap();
        assert_eq!(get_tier(db.pool(), "u1").await.unwrap(), Tier::Free);

        let result = set_tier_by_customer(db.pool(), "cus_unknown", Tier::Pro).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { entity: "Customer", .. })));
    }

    #[tokio::test]
    async fn test_customer_linked_to_one_user() {
        let db = test_db().await;
        create_user(db.pool(), "u1", None, Tier::Free).await.unwrap();
        create_user(db.pool(), "u2", None, Tier::Free).await.unwrap();
        attach_customer(db.pool(), "u1", "cus_shared").await.unwrap();

        // Re-attaching the same link is fine.
        attach_customer(db.pool(), "u1", "cus_shared").await.unwrap();

        let result = attach_customer(db.pool(), "u2", "cus_shared").await;
        assert!(matches!(
            result,
            Err(DatabaseError::AlreadyExists { entity: "Customer", ref id }) if id == "cus_shared"
        ));
        assert_eq!(get_user(db.pool(), "u2").await.unwrap().billing_customer_id, None);
    }
}
