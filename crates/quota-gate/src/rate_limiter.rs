//! In-memory per-minute and per-month request counters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::limits::TierLimits;

/// Entries untouched for this long are dropped by [`RateLimiter::sweep`].
const IDLE_TTL_HOURS: i64 = 24;

/// The window a [`RateStatus`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateWindow {
    Minute,
    Month,
}

/// Allowance left in one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStatus {
    /// Ceiling of the window.
    pub limit: u32,
    /// Requests still allowed in the window.
    pub remaining: u32,
    /// When the window rolls over.
    pub reset_at: DateTime<Utc>,
    /// Which window this is.
    pub window: RateWindow,
}

impl RateStatus {
    /// Length of the window in seconds.
    pub fn window_secs(&self) -> i64 {
        match self.window {
            RateWindow::Minute => 60,
            RateWindow::Month => {
                let start = month_start(self.reset_at - Duration::seconds(1));
                (self.reset_at - start).num_seconds()
            }
        }
    }

    /// Value for an `X-RateLimit-Policy` header, e.g. `5;w=60`.
    pub fn policy(&self) -> String {
        format!("{};w={}", self.limit, self.window_secs())
    }
}

/// Outcome of [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Counted. The status is the tighter of the two windows.
    Allowed(RateStatus),
    /// Refused. The status is the window that is exhausted.
    Limited(RateStatus),
}

impl RateDecision {
    pub fn status(&self) -> &RateStatus {
        match self {
            RateDecision::Allowed(status) | RateDecision::Limited(status) => status,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed(_))
    }
}

#[derive(Debug, Clone)]
struct RateEntry {
    minute: i64,
    minute_count: u32,
    month: DateTime<Utc>,
    month_count: u32,
    last_seen: DateTime<Utc>,
}

/// Per-user request counters shared by all handlers.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, RateEntry>>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Count a request for `user_id` against the limits of `declared_tier`.
    ///
    /// Refused requests are not counted.
    pub async fn check(&self, user_id: &str, declared_tier: &str) -> RateDecision {
        let limits = TierLimits::for_declared(declared_tier);
        let now = self.clock.now();
        let minute = minute_index(now);
        let month = month_start(now);

        let mut entries = self.entries.lock().await;
        let entry = entries
            .entry(user_id.to_string())
            .or_insert_with(|| RateEntry {
                minute,
                minute_count: 0,
                month,
                month_count: 0,
                last_seen: now,
            });

        if entry.minute != minute {
            entry.minute = minute;
            entry.minute_count = 0;
        }
        if entry.month != month {
            entry.month = month;
            entry.month_count = 0;
        }
        entry.last_seen = now;

        let minute_reset = minute_reset(minute);
        let month_reset = next_month_start(month);

        if entry.month_count >= limits.per_month {
            debug!(user_id, count = entry.month_count, "Monthly rate limit hit");
            return RateDecision::Limited(RateStatus {
                limit: limits.per_month,
                remaining: 0,
                reset_at: month_reset,
                window: RateWindow::Month,
            });
        }
        if entry.minute_count >= limits.per_minute {
            debug!(user_id, count = entry.minute_count, "Per-minute rate limit hit");
            return RateDecision::Limited(RateStatus {
                limit: limits.per_minute,
                remaining: 0,
                reset_at: minute_reset,
                window: RateWindow::Minute,
            });
        }

        entry.minute_count += 1;
        entry.month_count += 1;

        let minute_left = limits.per_minute - entry.minute_count;
        let month_left = limits.per_month - entry.month_count;

        let status = if month_left < minute_left {
            RateStatus {
                limit: limits.per_month,
                remaining: month_left,
                reset_at: month_reset,
                window: RateWindow::Month,
            }
        } else {
            RateStatus {
                limit: limits.per_minute,
                remaining: minute_left,
                reset_at: minute_reset,
                window: RateWindow::Minute,
            }
        };

        RateDecision::Allowed(status)
    }

    /// Drop entries idle for more than a day. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let cutoff = self.clock.now() - Duration::hours(IDLE_TTL_HOURS);
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.last_seen > cutoff);
        before - entries.len()
    }

    /// Number of users currently tracked.
    pub async fn tracked_users(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Run [`sweep`](Self::sweep) every `interval` until the handle is shut down.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: StdDuration) -> SweeperHandle {
        let limiter = Arc::clone(self);
        let (stop_tx, mut stop_rx) = oneshot::channel();

        info!(interval = ?interval, "Starting rate limiter sweeper");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let removed = limiter.sweep().await;
                        if removed > 0 {
                            debug!(removed, "Swept idle rate limit entries");
                        }
                    }
                }
            }
        });

        SweeperHandle {
            stop: Some(stop_tx),
            task,
        }
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "Sweeper task ended abnormally");
        }
        info!("Rate limiter sweeper stopped");
    }
}

fn minute_index(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(60)
}

fn minute_reset(minute: i64) -> DateTime<Utc> {
    Utc.timestamp_opt((minute + 1) * 60, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    first_instant(now.year(), now.month()).unwrap_or(now)
}

fn next_month_start(month: DateTime<Utc>) -> DateTime<Utc> {
    let (year, next) = if month.month() == 12 {
        (month.year() + 1, 1)
    } else {
        (month.year(), month.month() + 1)
    };
    first_instant(year, next).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn first_instant(year: i32, month: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn limiter_at(start: DateTime<Utc>) -> (Arc<ManualClock>, RateLimiter) {
        let clock = Arc::new(ManualClock::new(start));
        let limiter = RateLimiter::new(clock.clone());
        (clock, limiter)
    }

    #[tokio::test]
    async fn test_free_minute_limit() {
        let (_, limiter) = limiter_at(at(2024, 3, 10, 12, 0, 5));

        for expected in (0..5).rev() {
            match limiter.check("u1", "free").await {
                RateDecision::Allowed(status) => assert_eq!(status.remaining, expected),
                other => panic!("expected allowed, got {:?}", other),
            }
        }

        match limiter.check("u1", "free").await {
            RateDecision::Limited(status) => {
                assert_eq!(status.window, RateWindow::Minute);
                assert_eq!(status.limit, 5);
                assert_eq!(status.remaining, 0);
                assert_eq!(status.reset_at, at(2024, 3, 10, 12, 1, 0));
            }
            other => panic!("expected limited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pro_twenty_first_request_limited() {
        let (_, limiter) = limiter_at(at(2024, 3, 10, 12, 0, 0));

        for _ in 0..20 {
            assert!(limiter.check("u1", "pro").await.is_allowed());
        }
        let decision = limiter.check("u1", "pro").await;
        assert!(!decision.is_allowed());
        assert_eq!(decision.status().limit, 20);
    }

    #[tokio::test]
    async fn test_minute_boundary_resets() {
        let (clock, limiter) = limiter_at(at(2024, 3, 10, 12, 0, 59));

        for _ in 0..5 {
            assert!(limiter.check("u1", "free").await.is_allowed());
        }
        assert!(!limiter.check("u1", "free").await.is_allowed());

        // Two seconds later is a different minute.
        clock.set(at(2024, 3, 10, 12, 1, 1));
        match limiter.check("u1", "free").await {
            RateDecision::Allowed(status) => {
                assert_eq!(status.window, RateWindow::Minute);
                assert_eq!(status.remaining, 4);
            }
            other => panic!("expected allowed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_month_limit_and_reset() {
        let (clock, limiter) = limiter_at(at(2024, 12, 1, 0, 0, 0));

        // Spread 50 requests over ten minutes to stay under the minute ceiling.
        for i in 0..50 {
            if i % 5 == 0 {
                clock.advance(Duration::minutes(1));
            }
            assert!(limiter.check("u1", "free").await.is_allowed());
        }

        clock.advance(Duration::minutes(1));
        match limiter.check("u1", "free").await {
            RateDecision::Limited(status) => {
                assert_eq!(status.window, RateWindow::Month);
                assert_eq!(status.limit, 50);
                assert_eq!(status.reset_at, at(2025, 1, 1, 0, 0, 0));
                assert_eq!(status.policy(), format!("50;w={}", 31 * 24 * 3600));
            }
            other => panic!("expected limited, got {:?}", other),
        }

        clock.set(at(2025, 1, 1, 0, 0, 0));
        assert!(limiter.check("u1", "free").await.is_allowed());
    }

    #[tokio::test]
    async fn test_allowed_reports_tighter_window() {
        let (clock, limiter) = limiter_at(at(2024, 2, 1, 0, 0, 0));

        for i in 0..48 {
            if i % 5 == 0 {
                clock.advance(Duration::minutes(1));
            }
            limiter.check("u1", "free").await;
        }

        clock.advance(Duration::minutes(1));
        match limiter.check("u1", "free").await {
            RateDecision::Allowed(status) => {
                assert_eq!(status.window, RateWindow::Month);
                assert_eq!(status.remaining, 1);
                assert_eq!(status.policy(), format!("50;w={}", 29 * 24 * 3600));
            }
            other => panic!("expected allowed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_tier_gets_free_limits() {
        let (_, limiter) = limiter_at(at(2024, 3, 10, 12, 0, 0));

        for _ in 0..5 {
            assert!(limiter.check("u1", "enterprise").await.is_allowed());
        }
        assert!(!limiter.check("u1", "enterprise").await.is_allowed());
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let (_, limiter) = limiter_at(at(2024, 3, 10, 12, 0, 0));

        for _ in 0..5 {
            limiter.check("u1", "free").await;
        }
        assert!(!limiter.check("u1", "free").await.is_allowed());
        assert!(limiter.check("u2", "free").await.is_allowed());
    }

    #[tokio::test]
    async fn test_sweep_removes_idle_entries() {
        let (clock, limiter) = limiter_at(at(2024, 3, 10, 12, 0, 0));

        limiter.check("idle", "free").await;
        clock.advance(Duration::hours(23));
        limiter.check("active", "free").await;
        clock.advance(Duration::hours(2));

        assert_eq!(limiter.sweep().await, 1);
        assert_eq!(limiter.tracked_users().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_lifecycle() {
        let clock = Arc::new(ManualClock::new(at(2024, 3, 10, 12, 0, 0)));
        let limiter = Arc::new(RateLimiter::new(clock.clone()));
        limiter.check("u1", "free").await;
        clock.advance(Duration::hours(25));

        let handle = limiter.spawn_sweeper(StdDuration::from_secs(60));
        tokio::time::sleep(StdDuration::from_secs(61)).await;
        assert_eq!(limiter.tracked_users().await, 0);

        handle.shutdown().await;
    }
}
