//! Bearer-token authentication.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use database::session;

use crate::error::ApiError;
use crate::state::AppState;

/// The user behind a valid session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthenticated)?;

        match session::user_for_token(state.db.pool(), token, state.clock.now()).await? {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => {
                tracing::debug!("Rejected unknown or expired session token");
                Err(ApiError::Unauthenticated)
            }
        }
    }
}
