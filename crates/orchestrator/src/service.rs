//! The optimization pipeline: validate, rate-limit, check quota, dispatch, log.

use std::sync::Arc;

use optimizer_core::{validate_prompt, Optimization, OptimizeRequest, Tier};
use quota_gate::{
    Clock, QuotaDecision, QuotaInfo, QuotaService, RateDecision, RateLimiter, RateStatus,
    Recorded, UsageRecord,
};
use tracing::{info, warn};

use crate::dispatch::{Dispatcher, ServedBy};
use crate::error::ServiceError;

/// What happened to the usage log after a successful optimization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageLog {
    /// Counted and logged. `used` is the day's count afterwards.
    Recorded { used: u32 },
    /// Counted, but the prompt log append failed.
    Unlogged { used: u32, reason: String },
    /// The optimization was served but could not be counted.
    Failed { reason: String },
}

/// A served optimization.
#[derive(Debug, Clone)]
pub struct OptimizeOutcome {
    pub optimization: Optimization,
    /// Tier on record, which picked the providers.
    pub tier: Tier,
    pub served_by: ServedBy,
    /// Daily allowance after this request.
    pub quota: QuotaInfo,
    /// Rate-limit window state after this request.
    pub rate: RateStatus,
    pub usage_log: UsageLog,
}

/// Admission control plus dispatch for one request.
pub struct OptimizationService {
    limiter: Arc<RateLimiter>,
    quota: QuotaService,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
}

impl OptimizationService {
    pub fn new(
        limiter: Arc<RateLimiter>,
        quota: QuotaService,
        dispatcher: Dispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            limiter,
            quota,
            dispatcher,
            clock,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Optimize `prompt` for `user_id`.
    ///
    /// `declared_tier` is what the client claims and only sizes the rate
    /// limiter. The stored tier governs the daily quota and provider order.
    pub async fn optimize(
        &self,
        user_id: &str,
        prompt: &str,
        declared_tier: &str,
    ) -> Result<OptimizeOutcome, ServiceError> {
        validate_prompt(prompt)?;

        let rate = match self.limiter.check(user_id, declared_tier).await {
            RateDecision::Allowed(status) => status,
            RateDecision::Limited(status) => {
                info!(user_id, reset_at = %status.reset_at, "Request rate limited");
                return Err(ServiceError::RateLimited(status));
            }
        };

        let day = self.clock.today();
        let admitted = match self.quota.check(user_id, day).await? {
            QuotaDecision::Admitted(info) => info,
            QuotaDecision::Exceeded(info) => return Err(ServiceError::QuotaExceeded(info)),
        };

        let request = OptimizeRequest::new(prompt, admitted.tier);
        let dispatched = self.dispatcher.dispatch(&request).await;
        let optimization = dispatched.optimization;

        let record = UsageRecord {
            user_id: user_id.to_string(),
            original_text: prompt.to_string(),
            optimized_text: optimization.text.clone(),
            tokens_in: optimization.tokens_in,
            tokens_out: optimization.tokens_out,
            model: optimization.model.clone(),
            tier: admitted.tier,
        };

        let (quota, usage_log) = match self.quota.record(user_id, day, &record).await {
            Ok(Recorded { used, log_error }) => {
                let quota = QuotaInfo {
                    used,
                    remaining: admitted.limit.saturating_sub(used),
                    ..admitted
                };
                let usage_log = match log_error {
                    None => UsageLog::Recorded { used },
                    Some(e) => {
                        warn!(user_id, used, error = %e, "Failed to log prompt, usage was counted");
                        UsageLog::Unlogged {
                            used,
                            reason: e.to_string(),
                        }
                    }
                };
                (quota, usage_log)
            }
            Err(e) => {
                warn!(user_id, error = %e, "Failed to count usage, returning result anyway");
                (
                    admitted,
                    UsageLog::Failed {
                        reason: e.to_string(),
                    },
                )
            }
        };

        Ok(OptimizeOutcome {
            optimization,
            tier: admitted.tier,
            served_by: dispatched.served_by,
            quota,
            rate,
            usage_log,
        })
    }

    /// Today's standing for a user.
    pub async fn quota_status(&self, user_id: &str) -> Result<QuotaInfo, ServiceError> {
        Ok(self.quota.status(user_id, self.clock.today()).await?)
    }
}
