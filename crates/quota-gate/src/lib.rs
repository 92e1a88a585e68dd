//! Admission control for prompt optimizations.
//!
//! Two layers guard every request:
//!
//! - [`RateLimiter`] - process-local per-minute and per-month counters keyed
//!   by user and the tier the client declared. Cheap, lost on restart.
//! - [`QuotaService`] - the authoritative daily allowance, read from durable
//!   storage through a [`UsageStore`] using the tier on record.
//!
//! The daily counter only moves when a successful optimization is logged, so
//! two concurrent requests can both pass [`QuotaService::check`] with one
//! unit of allowance left. That overshoot is accepted.

mod clock;
mod error;
mod limits;
mod quota;
mod rate_limiter;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::GateError;
pub use limits::TierLimits;
pub use quota::{QuotaDecision, QuotaInfo, QuotaService, Recorded};
pub use rate_limiter::{RateDecision, RateLimiter, RateStatus, RateWindow, SweeperHandle};
pub use store::{MemoryUsageStore, UsageRecord, UsageStore};
