//! Error types for admission checks.

use database::DatabaseError;
use thiserror::Error;

/// Errors raised while checking or recording usage.
#[derive(Debug, Error)]
pub enum GateError {
    /// The user has no account on record.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// The usage store failed.
    #[error("usage storage failed: {0}")]
    Storage(String),
}

impl From<DatabaseError> for GateError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { id, .. } => GateError::UnknownUser(id),
            other => GateError::Storage(other.to_string()),
        }
    }
}
