//! Durable usage storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use database::{prompt, quota_log, user, Database, NewPrompt};
use optimizer_core::Tier;
use tokio::sync::Mutex;

use crate::error::GateError;

/// A completed optimization, ready to be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub user_id: String,
    pub original_text: String,
    pub optimized_text: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub model: String,
    pub tier: Tier,
}

/// Storage behind the daily quota.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Tier on record for a user.
    async fn tier_for(&self, user_id: &str) -> Result<Tier, GateError>;

    /// Optimizations counted for a user's day.
    async fn usage_on(&self, user_id: &str, day: NaiveDate) -> Result<u32, GateError>;

    /// Atomically add one to a user's day and return the new count.
    async fn increment_usage(&self, user_id: &str, day: NaiveDate) -> Result<u32, GateError>;

    /// Append a record to the prompt log.
    async fn append_prompt(&self, record: &UsageRecord) -> Result<(), GateError>;
}

fn to_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[async_trait]
impl UsageStore for Database {
    async fn tier_for(&self, user_id: &str) -> Result<Tier, GateError> {
        Ok(user::get_tier(self.pool(), user_id).await?)
    }

    async fn usage_on(&self, user_id: &str, day: NaiveDate) -> Result<u32, GateError> {
        let used = quota_log::get_usage(self.pool(), user_id, day).await?;
        Ok(to_count(used))
    }

    async fn increment_usage(&self, user_id: &str, day: NaiveDate) -> Result<u32, GateError> {
        let used = quota_log::increment_usage(self.pool(), user_id, day).await?;
        Ok(to_count(used))
    }

    async fn append_prompt(&self, record: &UsageRecord) -> Result<(), GateError> {
        let entry = NewPrompt {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: record.user_id.clone(),
            original_text: record.original_text.clone(),
            optimized_text: record.optimized_text.clone(),
            tokens_in: i64::from(record.tokens_in),
            tokens_out: i64::from(record.tokens_out),
            model: record.model.clone(),
            tier: record.tier.code().to_string(),
        };
        prompt::insert_prompt(self.pool(), &entry).await?;
        Ok(())
    }
}

/// Usage store held in memory.
///
/// Writes can be switched to fail, which makes it useful for exercising the
/// logging-failure path.
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    tiers: Mutex<HashMap<String, Tier>>,
    usage: Mutex<HashMap<(String, NaiveDate), u32>>,
    prompts: Mutex<Vec<UsageRecord>>,
    fail_writes: AtomicBool,
    fail_prompt_log: AtomicBool,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user_id: &str, tier: Tier) {
        self.tiers.lock().await.insert(user_id.to_string(), tier);
    }

    /// Overwrite the counter for a user's day.
    pub async fn set_usage(&self, user_id: &str, day: NaiveDate, used: u32) {
        self.usage
            .lock()
            .await
            .insert((user_id.to_string(), day), used);
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make only prompt log appends fail; counters still advance.
    pub fn fail_prompt_log(&self, fail: bool) {
        self.fail_prompt_log.store(fail, Ordering::SeqCst);
    }

    /// Logged prompts, oldest first.
    pub async fn prompts(&self) -> Vec<UsageRecord> {
        self.prompts.lock().await.clone()
    }

    fn check_writable(&self) -> Result<(), GateError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GateError::Storage("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn tier_for(&self, user_id: &str) -> Result<Tier, GateError> {
        self.tiers
            .lock()
            .await
            .get(user_id)
            .copied()
            .ok_or_else(|| GateError::UnknownUser(user_id.to_string()))
    }

    async fn usage_on(&self, user_id: &str, day: NaiveDate) -> Result<u32, GateError> {
        let usage = self.usage.lock().await;
        Ok(usage
            .get(&(user_id.to_string(), day))
            .copied()
            .unwrap_or(0))
    }

    async fn increment_usage(&self, user_id: &str, day: NaiveDate) -> Result<u32, GateError> {
        self.check_writable()?;
        let mut usage = self.usage.lock().await;
        let used = usage.entry((user_id.to_string(), day)).or_insert(0);
        *used += 1;
        Ok(*used)
    }

    async fn append_prompt(&self, record: &UsageRecord) -> Result<(), GateError> {
        self.check_writable()?;
        if self.fail_prompt_log.load(Ordering::SeqCst) {
            return Err(GateError::Storage("prompt log unavailable".to_string()));
        }
        self.prompts.lock().await.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn record(user_id: &str) -> UsageRecord {
        UsageRecord {
            user_id: user_id.to_string(),
            original_text: "write a poem".to_string(),
            optimized_text: "Write a four-line poem about rain.".to_string(),
            tokens_in: 3,
            tokens_out: 9,
            model: "deepseek-chat".to_string(),
            tier: Tier::Free,
        }
    }

    #[tokio::test]
    async fn test_database_store() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        user::create_user(db.pool(), "u1", None, Tier::Pro).await.unwrap();

        assert_eq!(db.tier_for("u1").await.unwrap(), Tier::Pro);
        assert!(matches!(
            db.tier_for("ghost").await,
            Err(GateError::UnknownUser(id)) if id == "ghost"
        ));

        assert_eq!(db.usage_on("u1", day(1)).await.unwrap(), 0);
        assert_eq!(db.increment_usage("u1", day(1)).await.unwrap(), 1);
        assert_eq!(db.usage_on("u1", day(1)).await.unwrap(), 1);

        db.append_prompt(&record("u1")).await.unwrap();
        let logged = prompt::list_recent(db.pool(), "u1", 10).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].tier, "FREE");
        assert_eq!(logged[0].tokens_out, 9);
    }

    #[tokio::test]
    async fn test_memory_store_write_failures() {
        let store = MemoryUsageStore::new();
        store.add_user("u1", Tier::Free).await;

        store.fail_writes(true);
        assert!(store.increment_usage("u1", day(1)).await.is_err());
        assert!(store.append_prompt(&record("u1")).await.is_err());
        assert_eq!(store.usage_on("u1", day(1)).await.unwrap(), 0);

        store.fail_writes(false);
        assert_eq!(store.increment_usage("u1", day(1)).await.unwrap(), 1);
        store.append_prompt(&record("u1")).await.unwrap();
        assert_eq!(store.prompts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_prompt_log_failure_only() {
        let store = MemoryUsageStore::new();
        store.add_user("u1", Tier::Free).await;
        store.fail_prompt_log(true);

        assert_eq!(store.increment_usage("u1", day(2)).await.unwrap(), 1);
        assert!(store.append_prompt(&record("u1")).await.is_err());
        assert!(store.prompts().await.is_empty());
    }
}
