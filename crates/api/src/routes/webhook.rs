//! Billing webhook.
//!
//! Events are signed with HMAC-SHA256 over `"{timestamp}.{body}"` and carried
//! in a `Stripe-Signature: t=<unix secs>,v1=<hex digest>` header. Each event
//! ID is applied at most once.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use database::{billing_event, user, DatabaseError};
use hmac::{Hmac, Mac};
use optimizer_core::Tier;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{ApiError, Result};
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum age of a signed timestamp, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Why a webhook signature was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature header is malformed")]
    Malformed,
    #[error("signature timestamp is outside the tolerance window")]
    Expired,
    #[error("no signature matches")]
    Mismatch,
}

/// Check a signature header against the raw request body.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: DateTime<Utc>,
) -> std::result::Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if (now.timestamp() - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::Mismatch)
}

/// Compute a signature header value. Used by senders and tests.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Deserialize)]
pub struct BillingEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: EventObject,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventObject {
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ignored: bool,
}

impl WebhookAck {
    fn applied() -> Self {
        Self {
            received: true,
            duplicate: false,
            ignored: false,
        }
    }
}

/// `POST /webhooks/billing`.
pub async fn billing(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let secret = state
        .webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::Unavailable("billing webhook is not configured".to_string()))?;

    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::InvalidInput("missing signature".to_string()))?;

    verify_signature(secret, header, &body, state.clock.now()).map_err(|e| {
        warn!(error = %e, "Rejected billing webhook");
        ApiError::InvalidInput(e.to_string())
    })?;

    let event: BillingEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidInput(format!("invalid event payload: {}", e)))?;

    let Some(change) = TierChange::from_event(&event) else {
        info!(event_id = %event.id, event_type = %event.event_type, "Ignoring billing event");
        return Ok(Json(WebhookAck {
            ignored: true,
            ..WebhookAck::applied()
        }));
    };

    if !billing_event::record_event(state.db.pool(), &event.id, &event.event_type).await? {
        info!(event_id = %event.id, "Duplicate billing event");
        return Ok(Json(WebhookAck {
            duplicate: true,
            ..WebhookAck::applied()
        }));
    }

    match change.apply(&state).await {
        Ok(()) => {
            info!(event_id = %event.id, event_type = %event.event_type, "Applied billing event");
            Ok(Json(WebhookAck::applied()))
        }
        Err(DatabaseError::NotFound { entity, id }) => {
            warn!(event_id = %event.id, entity, id = %id, "Billing event refers to unknown account");
            Ok(Json(WebhookAck {
                ignored: true,
                ..WebhookAck::applied()
            }))
        }
        Err(DatabaseError::AlreadyExists { entity, id }) => {
            // Retrying cannot succeed; acknowledge so the sender stops.
            warn!(event_id = %event.id, entity, id = %id, "Billing customer already linked to another account");
            Ok(Json(WebhookAck {
                ignored: true,
                ..WebhookAck::applied()
            }))
        }
        Err(e) => {
            // Let the sender retry.
            billing_event::forget_event(state.db.pool(), &event.id).await?;
            Err(e.into())
        }
    }
}

/// The tier change an event asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TierChange {
    /// Checkout finished: link the customer and upgrade.
    Checkout { user_id: String, customer_id: String },
    /// Subscription state changed for a known customer.
    Customer { customer_id: String, tier: Tier },
}

impl TierChange {
    fn from_event(event: &BillingEvent) -> Option<Self> {
        let object = &event.data.object;
        let customer_id = object.customer.clone()?;

        match event.event_type.as_str() {
            "checkout.session.completed" => Some(TierChange::Checkout {
                user_id: object.client_reference_id.clone()?,
                customer_id,
            }),
            "customer.subscription.updated" => {
                let tier = match object.status.as_deref() {
                    Some("active") | Some("trialing") => Tier::Pro,
                    _ => Tier::Free,
                };
                Some(TierChange::Customer { customer_id, tier })
            }
            "customer.subscription.deleted" => Some(TierChange::Customer {
                customer_id,
                tier: Tier::Free,
            }),
            _ => None,
        }
    }

    async fn apply(&self, state: &AppState) -> std::result::Result<(), DatabaseError> {
        let pool = state.db.pool();
        match self {
            TierChange::Checkout {
                user_id,
                customer_id,
            } => {
                user::attach_customer(pool, user_id, customer_id).await?;
                user::set_tier(pool, user_id, Tier::Pro).await
            }
            TierChange::Customer { customer_id, tier } => {
                user::set_tier_by_customer(pool, customer_id, *tier).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign("whsec_test", now().timestamp(), payload);

        assert_eq!(verify_signature("whsec_test", &header, payload, now()), Ok(()));
    }

    #[test]
    fn test_wrong_secret_or_body() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign("whsec_test", now().timestamp(), payload);

        assert_eq!(
            verify_signature("whsec_other", &header, payload, now()),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature("whsec_test", &header, br#"{"id":"evt_2"}"#, now()),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_tolerance_window() {
        let payload = b"{}";
        let old = sign("s", now().timestamp() - SIGNATURE_TOLERANCE_SECS, payload);
        assert_eq!(verify_signature("s", &old, payload, now()), Ok(()));

        let stale = sign("s", now().timestamp() - SIGNATURE_TOLERANCE_SECS - 1, payload);
        assert_eq!(
            verify_signature("s", &stale, payload, now()),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn test_malformed_header() {
        assert_eq!(
            verify_signature("s", "v1=abcd", b"{}", now()),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_signature("s", "t=123", b"{}", now()),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn test_any_matching_signature_is_accepted() {
        let payload = b"{}";
        let good = sign("s", now().timestamp(), payload);
        let header = format!("t={},v1=deadbeef,{}", now().timestamp(), good.split(',').nth(1).unwrap());

        assert_eq!(verify_signature("s", &header, payload, now()), Ok(()));
    }

    #[test]
    fn test_tier_changes() {
        let event = |event_type: &str, status: Option<&str>| BillingEvent {
            id: "evt".to_string(),
            event_type: event_type.to_string(),
            data: EventData {
                object: EventObject {
                    customer: Some("cus_1".to_string()),
                    client_reference_id: Some("u1".to_string()),
                    status: status.map(str::to_string),
                },
            },
        };

        assert_eq!(
            TierChange::from_event(&event("checkout.session.completed", None)),
            Some(TierChange::Checkout {
                user_id: "u1".to_string(),
                customer_id: "cus_1".to_string()
            })
        );
        assert_eq!(
            TierChange::from_event(&event("customer.subscription.updated", Some("trialing"))),
            Some(TierChange::Customer {
                customer_id: "cus_1".to_string(),
                tier: Tier::Pro
            })
        );
        assert_eq!(
            TierChange::from_event(&event("customer.subscription.updated", Some("past_due"))),
            Some(TierChange::Customer {
                customer_id: "cus_1".to_string(),
                tier: Tier::Free
            })
        );
        assert_eq!(
            TierChange::from_event(&event("customer.subscription.deleted", None)),
            Some(TierChange::Customer {
                customer_id: "cus_1".to_string(),
                tier: Tier::Free
            })
        );
        assert_eq!(TierChange::from_event(&event("invoice.paid", None)), None);
    }
}
