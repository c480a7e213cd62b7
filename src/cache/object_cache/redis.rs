use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tracing::{debug, error};

use crate::cache::{CacheResult, ObjectCache};
use crate::config::AppConfig;
use crate::declare_object_cache_plugin;
use crate::errors::{Result, ScoDocError};

declare_object_cache_plugin!("redis", RedisObjectCache);

pub struct RedisObjectCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisObjectCache {
    pub fn new() -> std::result::Result<Self, String> {
        let config = AppConfig::get();
        let redis_config = &config.cache.redis;

        debug!(
            "RedisObjectCache created with prefix: '{}'",
            redis_config.key_prefix
        );

        let client = redis::Client::open(redis_config.url.clone())
            .map_err(|e| format!("Invalid Redis URL '{}': {e}", redis_config.url))?;

        // 测试 Redis 连接
        match client.get_connection() {
            Ok(mut conn) => match redis::cmd("PING").query::<String>(&mut conn) {
                Ok(response) => {
                    debug!("Redis connection test successful: {}", response);
                }
                Err(e) => {
                    error!(
                        "Failed to ping Redis server: {}. Check Redis server status and URL: {}",
                        e, redis_config.url
                    );
                    return Err(format!("Redis ping failed: {e}"));
                }
            },
            Err(e) => {
                error!(
                    "Failed to connect Redis server: {}. Check Redis server status and URL: {}",
                    e, redis_config.url
                );
                return Err(format!("Redis connection failed: {e}"));
            }
        }

        Ok(Self {
            client,
            key_prefix: redis_config.key_prefix.clone(),
        })
    }

    async fn get_connection(&self) -> std::result::Result<MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// 用 SCAN 分批列出匹配的键，避免 KEYS 阻塞服务器
    async fn scan_keys(
        conn: &mut MultiplexedConnection,
        pattern: &str,
    ) -> redis::RedisResult<Vec<String>> {
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                return Ok(keys);
            }
            cursor = next;
        }
    }
}

const SCAN_BATCH: usize = 500;

#[async_trait]
impl ObjectCache for RedisObjectCache {
    async fn get_raw(&self, key: &str) -> CacheResult<String> {
        let redis_key = self.make_key(key);

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                return CacheResult::ExistsButNoValue;
            }
        };

        let result: redis::RedisResult<Option<String>> = conn.get(redis_key).await;

        match result {
            Ok(Some(data)) => {
                debug!("Successfully retrieved key: {}", key);
                CacheResult::Found(data)
            }
            Ok(None) => {
                debug!("Key not found in cache: {}", key);
                CacheResult::NotFound
            }
            Err(e) => {
                error!("Failed to get key '{}': {}", key, e);
                CacheResult::ExistsButNoValue
            }
        }
    }

    async fn insert_raw(&self, key: String, value: String, ttl: u64) -> Result<()> {
        let redis_key = self.make_key(&key);

        let mut conn = self
            .get_connection()
            .await
            .map_err(|e| ScoDocError::cache_connection(e.to_string()))?;

        let outcome = if ttl == 0 {
            conn.set::<String, String, ()>(redis_key, value).await
        } else {
            conn.set_ex::<String, String, ()>(redis_key, value, ttl).await
        };

        outcome.map_err(|e| {
            ScoDocError::cache_connection(format!("Failed to insert key '{key}': {e}"))
        })?;
        debug!("Successfully inserted key into cache: {} (TTL: {}s)", key, ttl);
        Ok(())
    }

    async fn remove(&self, key: &str) {
        self.remove_many(&[key.to_string()]).await;
    }

    async fn remove_many(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        let redis_keys: Vec<String> = keys.iter().map(|k| self.make_key(k)).collect();

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                return;
            }
        };

        match conn.del::<Vec<String>, i32>(redis_keys).await {
            Ok(deleted_count) => {
                debug!(
                    "Removed {} of {} keys from cache",
                    deleted_count,
                    keys.len()
                );
            }
            Err(e) => {
                error!("Failed to remove {} keys: {}", keys.len(), e);
            }
        }
    }

    async fn remove_prefixed(&self, prefix: &str) {
        let pattern = format!("{}*", self.make_key(prefix));

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                return;
            }
        };

        let keys = match Self::scan_keys(&mut conn, &pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                error!("Failed to scan keys matching '{}': {}", pattern, e);
                return;
            }
        };
        // SCAN 返回的键已带前缀，直接删除
        for chunk in keys.chunks(SCAN_BATCH) {
            if let Err(e) = conn.del::<Vec<String>, i32>(chunk.to_vec()).await {
                error!("Failed to remove keys matching '{}': {}", pattern, e);
                return;
            }
        }
        debug!("Removed {} keys matching '{}'", keys.len(), pattern);
    }
}
