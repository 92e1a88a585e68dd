//! SQLite persistence layer for Promptly.
//!
//! This crate provides async database operations for users, sessions, daily
//! quota counters, the prompt log and processed billing events using SQLx
//! with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{quota_log, user, Database};
//! use optimizer_core::Tier;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:promptly.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Create a user and count one optimization for today
//!     user::create_user(db.pool(), "c27fb365-0c84-4cf2-8555-814bb065e448", None, Tier::Free).await?;
//!     let today = chrono::Local::now().date_naive();
//!     quota_log::increment_usage(db.pool(), "c27fb365-0c84-4cf2-8555-814bb065e448", today).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod billing_event;
pub mod error;
pub mod models;
pub mod prompt;
pub mod quota_log;
pub mod session;
pub mod user;

pub use error::{DatabaseError, Result};
pub use models::{NewPrompt, PromptRecord, QuotaLog, User};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/promptly.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    ///
    /// In-memory databases are private to a connection, so their pool is
    /// capped at one connection.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_size = if url.contains(":memory:") { 1 } else { pool_size };

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(url, pool_size, "Connected to database");

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use optimizer_core::Tier;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = test_db().await;
        db.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let db = test_db().await;
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        user::create_user(db.pool(), "u1", Some("a@example.com"), Tier::Free)
            .await
            .unwrap();
        session::create_session(db.pool(), "tok", "u1", None).await.unwrap();
        quota_log::increment_usage(db.pool(), "u1", day).await.unwrap();
        prompt::insert_prompt(
            db.pool(),
            &NewPrompt {
                id: "p1".to_string(),
                user_id: "u1".to_string(),
                original_text: "hi".to_string(),
                optimized_text: "Hello".to_string(),
                tokens_in: 1,
                tokens_out: 2,
                model: "m".to_string(),
                tier: "FREE".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(quota_log::get_usage(db.pool(), "u1", day).await.unwrap(), 1);
        assert_eq!(prompt::count_for_user(db.pool(), "u1").await.unwrap(), 1);

        // Dependent rows require an existing user
        let orphan = quota_log::increment_usage(db.pool(), "ghost", day).await;
        assert!(matches!(orphan, Err(DatabaseError::Sqlx(_))));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let result = Database::connect("postgres://nope").await;
        assert!(result.is_err());
    }
}
