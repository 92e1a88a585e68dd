//! Error types for orchestration.

use optimizer_core::PromptRejection;
use quota_gate::{GateError, QuotaInfo, RateStatus};
use thiserror::Error;

/// Errors raised while assembling the dispatch layer.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Provider configuration is invalid.
    #[error("invalid provider configuration: {0}")]
    Config(String),
}

/// Why an optimization request was not served.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request itself is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The caller has no account on record.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The in-memory rate limiter refused the request.
    #[error("rate limited until {}", .0.reset_at)]
    RateLimited(RateStatus),

    /// The daily allowance is used up.
    #[error("daily quota of {} exceeded", .0.limit)]
    QuotaExceeded(QuotaInfo),

    /// Anything else. The message is for logs, not for callers.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<PromptRejection> for ServiceError {
    fn from(rejection: PromptRejection) -> Self {
        ServiceError::InvalidInput(rejection.to_string())
    }
}

impl From<GateError> for ServiceError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::UnknownUser(_) => ServiceError::Unauthenticated,
            GateError::Storage(message) => ServiceError::Unexpected(message),
        }
    }
}
