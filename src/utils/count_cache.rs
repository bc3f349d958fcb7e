//! Process-wide cache for expensive aggregate counts.
//!
//! Entries are keyed by a stable name. Write paths that change the underlying count
//! call [`CountCache::invalidate`] after their transaction commits; otherwise an
//! entry expires after the TTL and the next reader recounts.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// 有余额记录的奖励用户数
pub const REWARD_USER_COUNT: &str = "reward_user_count";

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct CountCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<&'static str, (i64, Instant)>>>,
}

impl Default for CountCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl CountCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &'static str) -> Option<i64> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(_, stored_at)| stored_at.elapsed() < self.ttl)
            .map(|(value, _)| *value)
    }

    pub async fn set(&self, key: &'static str, value: i64) {
        self.entries
            .write()
            .await
            .insert(key, (value, Instant::now()));
    }

    pub async fn invalidate(&self, key: &'static str) {
        if self.entries.write().await.remove(key).is_some() {
            log::debug!("Count cache invalidated: {key}");
        }
    }

    /// 命中缓存直接返回，否则执行 recount 并写入缓存
    pub async fn get_or_recount<F, Fut, E>(&self, key: &'static str, recount: F) -> Result<i64, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<i64, E>>,
    {
        if let Some(v) = self.get(key).await {
            return Ok(v);
        }
        let value = recount().await?;
        self.set(key, value).await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recount_then_hit() {
        let cache = CountCache::default();
        let v: Result<i64, ()> = cache.get_or_recount(REWARD_USER_COUNT, || async { Ok(3) }).await;
        assert_eq!(v, Ok(3));
        // 命中缓存，不会调用新的 recount
        let v: Result<i64, ()> = cache.get_or_recount(REWARD_USER_COUNT, || async { Ok(99) }).await;
        assert_eq!(v, Ok(3));
    }

    #[tokio::test]
    async fn test_invalidate_forces_recount() {
        let cache = CountCache::default();
        cache.set(REWARD_USER_COUNT, 3).await;
        cache.invalidate(REWARD_USER_COUNT).await;
        assert_eq!(cache.get(REWARD_USER_COUNT).await, None);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache = CountCache::new(Duration::from_millis(0));
        cache.set(REWARD_USER_COUNT, 3).await;
        assert_eq!(cache.get(REWARD_USER_COUNT).await, None);
    }
}
