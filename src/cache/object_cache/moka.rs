use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use tracing::{debug, error};

use crate::cache::{CacheResult, ObjectCache};
use crate::config::AppConfig;
use crate::declare_object_cache_plugin;
use crate::errors::Result;

declare_object_cache_plugin!("moka", MokaCacheWrapper);

#[derive(Clone)]
struct Entry {
    data: String,
    ttl: Option<Duration>,
}

/// 按条目设置过期时间
struct PerEntryExpiry;

impl Expiry<String, Entry> for PerEntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

pub struct MokaCacheWrapper {
    inner: Cache<String, Entry>,
}

impl MokaCacheWrapper {
    pub fn new() -> std::result::Result<Self, String> {
        let config = AppConfig::get();
        Ok(Self::with_settings(config.cache.memory.max_capacity))
    }

    pub fn with_settings(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryExpiry)
            .support_invalidation_closures()
            .build();

        debug!(
            "MokaCacheWrapper initialized with max capacity: {}",
            max_capacity
        );
        Self { inner }
    }
}

#[async_trait]
impl ObjectCache for MokaCacheWrapper {
    async fn get_raw(&self, key: &str) -> CacheResult<String> {
        if let Some(entry) = self.inner.get(key).await {
            debug!("Successfully retrieved key: {}", key);
            CacheResult::Found(entry.data)
        } else {
            debug!("Key not found in cache: {}", key);
            CacheResult::NotFound
        }
    }

    async fn insert_raw(&self, key: String, value: String, ttl: u64) -> Result<()> {
        let ttl = (ttl > 0).then(|| Duration::from_secs(ttl));
        self.inner.insert(key, Entry { data: value, ttl }).await;
        Ok(())
    }

    async fn remove(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    async fn remove_prefixed(&self, prefix: &str) {
        let prefix = prefix.to_string();
        match self
            .inner
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix))
        {
            Ok(_) => self.inner.run_pending_tasks().await,
            Err(e) => error!("Failed to register prefix invalidation: {}", e),
        }
    }
}
