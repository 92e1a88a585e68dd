//! Error responses.

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use optimizer_core::Tier;
use orchestrator::ServiceError;
use quota_gate::{QuotaInfo, RateStatus};
use serde::Serialize;
use thiserror::Error;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request.
    #[error("{0}")]
    InvalidInput(String),

    /// Missing, unknown or expired session.
    #[error("authentication required")]
    Unauthenticated,

    /// The in-memory limiter refused the request.
    #[error("rate limited")]
    RateLimited { status: RateStatus, tier: Tier },

    /// The daily allowance is used up.
    #[error("daily quota exceeded")]
    QuotaExceeded {
        info: QuotaInfo,
        reset_at: DateTime<Utc>,
    },

    /// A feature is switched off by configuration.
    #[error("{0}")]
    Unavailable(String),

    /// Anything else. Details are logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Map a pipeline error. `tier` and `day_reset` fill in what the pipeline
    /// does not report.
    pub fn from_service(err: ServiceError, tier: Tier, day_reset: DateTime<Utc>) -> Self {
        match err {
            ServiceError::InvalidInput(message) => ApiError::InvalidInput(message),
            ServiceError::Unauthenticated => ApiError::Unauthenticated,
            ServiceError::RateLimited(status) => ApiError::RateLimited { status, tier },
            ServiceError::QuotaExceeded(info) => ApiError::QuotaExceeded {
                info,
                reset_at: day_reset,
            },
            ServiceError::Unexpected(message) => ApiError::Internal(message),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            ApiError::Unavailable(_) => "UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } | ApiError::QuotaExceeded { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::RateLimited { status, .. } => format!(
                "Too many requests. Try again after {}.",
                status.reset_at.to_rfc3339()
            ),
            ApiError::QuotaExceeded { info, .. } => format!(
                "Daily limit of {} optimizations reached for the {} plan.",
                info.limit, info.tier
            ),
            ApiError::Internal(_) => "An unexpected error occurred.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<database::DatabaseError> for ApiError {
    fn from(err: database::DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Quota summary attached to optimize responses and 429s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSummary {
    pub remaining: u32,
    pub limit: u32,
    pub tier: Tier,
}

impl From<&QuotaInfo> for QuotaSummary {
    fn from(info: &QuotaInfo) -> Self {
        Self {
            remaining: info.remaining,
            limit: info.limit,
            tier: info.tier,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: ErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    quota_info: Option<QuotaSummary>,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Standard rate-limit headers.
pub fn rate_limit_headers(limit: u32, remaining: u32, reset_at: DateTime<Utc>, policy: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(reset_at.timestamp()));
    if let Ok(value) = HeaderValue::from_str(policy) {
        headers.insert("x-ratelimit-policy", value);
    }
    headers
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (quota_info, headers) = match &self {
            ApiError::RateLimited { status, tier } => {
                tracing::info!(reset_at = %status.reset_at, "Rejecting rate-limited request");
                (
                    Some(QuotaSummary {
                        remaining: 0,
                        limit: status.limit,
                        tier: *tier,
                    }),
                    rate_limit_headers(status.limit, 0, status.reset_at, &status.policy()),
                )
            }
            ApiError::QuotaExceeded { info, reset_at } => (
                Some(QuotaSummary {
                    remaining: 0,
                    ..QuotaSummary::from(info)
                }),
                rate_limit_headers(
                    info.limit,
                    0,
                    *reset_at,
                    &format!("{};w=86400", info.limit),
                ),
            ),
            ApiError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (None, HeaderMap::new())
            }
            _ => (None, HeaderMap::new()),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.message(),
            },
            quota_info,
        };

        (status, headers, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
