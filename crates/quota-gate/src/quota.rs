//! Daily quota enforcement.

use std::sync::Arc;

use chrono::NaiveDate;
use optimizer_core::Tier;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::GateError;
use crate::limits::TierLimits;
use crate::store::{UsageRecord, UsageStore};

/// Where a user stands against their daily allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaInfo {
    pub tier: Tier,
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
}

impl QuotaInfo {
    fn new(tier: Tier, used: u32) -> Self {
        let limit = TierLimits::for_tier(tier).per_day;
        Self {
            tier,
            limit,
            used,
            remaining: limit.saturating_sub(used),
        }
    }
}

/// Outcome of [`QuotaService::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Admitted(QuotaInfo),
    Exceeded(QuotaInfo),
}

/// What [`QuotaService::record`] wrote.
#[derive(Debug)]
pub struct Recorded {
    /// The day's count after the increment.
    pub used: u32,
    /// Set when the counter advanced but the prompt log append failed.
    pub log_error: Option<GateError>,
}

/// Reads and advances the durable daily counters.
#[derive(Clone)]
pub struct QuotaService {
    store: Arc<dyn UsageStore>,
}

impl QuotaService {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    /// Whether the user has allowance left on `day`, judged by their stored tier.
    ///
    /// Nothing is counted here; see [`record`](Self::record).
    pub async fn check(&self, user_id: &str, day: NaiveDate) -> Result<QuotaDecision, GateError> {
        let info = self.status(user_id, day).await?;

        if info.remaining == 0 {
            info!(user_id, tier = %info.tier, limit = info.limit, "Daily quota exceeded");
            return Ok(QuotaDecision::Exceeded(info));
        }

        Ok(QuotaDecision::Admitted(info))
    }

    /// Count a completed optimization and append it to the prompt log.
    ///
    /// Fails only when the counter could not be advanced. A failed append
    /// after a successful increment is reported in [`Recorded::log_error`],
    /// since the allowance has already been consumed.
    pub async fn record(
        &self,
        user_id: &str,
        day: NaiveDate,
        record: &UsageRecord,
    ) -> Result<Recorded, GateError> {
        let used = self.store.increment_usage(user_id, day).await?;
        let log_error = self.store.append_prompt(record).await.err();

        debug!(user_id, used, %day, logged = log_error.is_none(), "Recorded usage");
        Ok(Recorded { used, log_error })
    }

    /// Current standing without counting anything.
    pub async fn status(&self, user_id: &str, day: NaiveDate) -> Result<QuotaInfo, GateError> {
        let tier = self.store.tier_for(user_id).await?;
        let used = self.store.usage_on(user_id, day).await?;
        Ok(QuotaInfo::new(tier, used))
    }

    /// Tier on record for a user.
    pub async fn tier_for(&self, user_id: &str) -> Result<Tier, GateError> {
        self.store.tier_for(user_id).await
    }
}
