use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::application::ApplicationStatus;

/// Entry stored in the local DashMap with an expiry timestamp.
#[derive(Clone)]
pub(crate) struct QueryEntry {
    value: String,
    pub(crate) expires_at: Instant,
}

/// Two-tier query cache for list endpoints: in-memory DashMap (tier 1)
/// backed by Redis (tier 2). Postgres remains the source of truth.
///
/// Entries are keyed by query identifier (see [`keys`]) and carry short
/// TTLs; mutations call [`QueryCache::invalidate`] on the keys they touch so
/// readers refetch instead of serving a stale listing. Local entries are
/// checked on read and evicted lazily; `evict_expired()` sweeps the rest.
#[derive(Clone)]
pub struct QueryCache {
    pub(crate) local: Arc<DashMap<String, QueryEntry>>,
    redis: ConnectionManager,
}

impl QueryCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            local: Arc::new(DashMap::new()),
            redis,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        // tier 1: in-memory (with TTL check)
        if let Some(entry) = self.local.get(key) {
            if Instant::now() < entry.expires_at {
                return serde_json::from_str(&entry.value).ok();
            }
            // expired — drop the ref before removing
            drop(entry);
            self.local.remove(key);
        }

        // tier 2: redis
        let mut conn = self.redis.clone();
        if let Ok(Some(v)) = conn.get::<_, Option<String>>(key).await {
            // Re-use the Redis TTL for the local entry, defaulting to 30s
            // if it cannot be queried.
            let ttl_secs: i64 = conn.ttl(key).await.unwrap_or(30);
            let ttl = if ttl_secs > 0 {
                Duration::from_secs(ttl_secs as u64)
            } else {
                Duration::from_secs(30)
            };
            self.local.insert(
                key.to_string(),
                QueryEntry {
                    value: v.clone(),
                    expires_at: Instant::now() + ttl,
                },
            );
            return serde_json::from_str(&v).ok();
        }

        None
    }

    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> anyhow::Result<()> {
        let json = serde_json::to_string(value)?;
        self.local.insert(
            key.to_string(),
            QueryEntry {
                value: json.clone(),
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(key, json, ttl_secs).await?;
        Ok(())
    }

    /// Drop a key from both tiers. Called after every mutation that changes
    /// what the keyed listing would return; a failed Redis DEL is logged and
    /// tolerated (the TTL bounds the staleness window).
    pub async fn invalidate(&self, key: &str) {
        self.local.remove(key);
        let mut conn = self.redis.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!(key, error = %e, "cache invalidation failed in redis tier");
        }
    }

    /// Remove all locally-expired entries. Called periodically from the
    /// background job to bound memory usage.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.local.len();
        self.local.retain(|_, entry| entry.expires_at > now);
        before - self.local.len()
    }

    /// Current number of entries in the local tier (for debugging).
    pub fn local_len(&self) -> usize {
        self.local.len()
    }
}

/// Query identifiers for the cached listings.
pub mod keys {
    use super::ApplicationStatus;

    pub const PROVIDERS_ACTIVE: &str = "providers:active";
    pub const PROVIDERS_ALL: &str = "providers:all";

    pub fn applications(status: Option<ApplicationStatus>) -> String {
        match status {
            Some(status) => format!("applications:{status}"),
            None => "applications:all".to_string(),
        }
    }
}
