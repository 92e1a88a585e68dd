//! Application state shared across handlers.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use database::Database;
use orchestrator::OptimizationService;
use quota_gate::Clock;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Optimization pipeline.
    pub service: Arc<OptimizationService>,
    /// Time source for sessions, quotas and webhook tolerance.
    pub clock: Arc<dyn Clock>,
    /// Billing webhook signing secret.
    pub webhook_secret: Option<String>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        db: Database,
        service: Arc<OptimizationService>,
        clock: Arc<dyn Clock>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            db,
            service,
            clock,
            webhook_secret,
        }
    }

    /// When today's quota day ends.
    pub fn day_reset(&self) -> DateTime<Utc> {
        let tomorrow = self.clock.today() + Duration::days(1);
        tomorrow
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
            .map(|midnight| midnight.with_timezone(&Utc))
            .unwrap_or_else(|| self.clock.now() + Duration::days(1))
    }
}
