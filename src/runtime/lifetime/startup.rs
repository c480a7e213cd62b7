use crate::cache::register::{get_object_cache_plugin, register_builtin_object_caches};
use crate::cache::ObjectCache;
use crate::config::AppConfig;
use crate::errors::{Result, ScoDocError};
use crate::notes::{NotesWriter, ResultCache};
use crate::storage::ScoreStore;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct StartupContext {
    pub storage: Arc<dyn ScoreStore>,
    pub cache: Arc<ResultCache>,
    pub writer: Arc<NotesWriter>,
}

async fn build_backend(name: &str) -> Result<Arc<dyn ObjectCache>> {
    let constructor = get_object_cache_plugin(name).ok_or_else(|| {
        ScoDocError::cache_plugin_not_found(format!("cache backend '{name}' is not registered"))
    })?;
    Ok(Arc::from(constructor().await?))
}

/// 创建缓存后端，失败时回退到进程内的 moka
async fn create_cache_backend(cache_type: &str) -> Result<Arc<dyn ObjectCache>> {
    warn!("Attempting to create {} cache backend", cache_type);

    match build_backend(cache_type).await {
        Ok(cache) => {
            warn!("Successfully created {} cache backend", cache_type);
            Ok(cache)
        }
        Err(e) if cache_type != "moka" => {
            warn!("Failed to create {} cache: {}, falling back to moka", cache_type, e);
            build_backend("moka").await
        }
        Err(e) => Err(e),
    }
}

/// 准备服务器启动的上下文：存储、缓存后端、结果缓存与写入器
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let config = AppConfig::get();

    // redis 后端走 rustls
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    register_builtin_object_caches();
    if cfg!(debug_assertions) {
        crate::cache::register::debug_object_cache_registry();
    }

    let storage = crate::storage::create_storage().await?;
    warn!("Storage backend initialized");

    let backend = create_cache_backend(&config.cache.cache_type).await?;
    let cache = Arc::new(ResultCache::from_config(backend, storage.clone(), config)?);
    let writer = Arc::new(NotesWriter::new(cache.clone()));
    warn!(
        "Result cache ready for department {}",
        config.app.department
    );

    Ok(StartupContext {
        storage,
        cache,
        writer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_backend_is_reported() {
        register_builtin_object_caches();
        let err = build_backend("memcached").await.err();
        assert_eq!(err.map(|e| e.code()), Some("E002"));
    }
}
