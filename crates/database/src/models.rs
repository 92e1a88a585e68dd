//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Account ID.
    pub id: String,
    /// Email address, if known.
    pub email: Option<String>,
    /// Stored tier code (`FREE` or `PRO`).
    pub tier: String,
    /// Customer ID at the billing processor.
    pub billing_customer_id: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Daily usage counter for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct QuotaLog {
    /// Owning user.
    pub user_id: String,
    /// Calendar day, `YYYY-MM-DD`.
    pub day: String,
    /// Optimizations used that day.
    pub prompts_used: i64,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A prompt optimization about to be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrompt {
    /// Record ID.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Text the user submitted.
    pub original_text: String,
    /// Text returned to the user.
    pub optimized_text: String,
    /// Input tokens.
    pub tokens_in: i64,
    /// Output tokens.
    pub tokens_out: i64,
    /// Model that produced the text.
    pub model: String,
    /// Tier code at the time of use.
    pub tier: String,
}

/// A logged prompt optimization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PromptRecord {
    pub id: String,
    pub user_id: String,
    pub original_text: String,
    pub optimized_text: String,
    pub tokens_in: i64,
    pub tokens_out: i64,
    pub model: String,
    pub tier: String,
    pub created_at: String,
}
