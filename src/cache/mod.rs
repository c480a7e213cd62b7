//! 缓存层
//!
//! `ObjectCache` 是字符串键值缓存的抽象（Moka 或 Redis），
//! 成绩表缓存（`notes::cache::ResultCache`）建立在它之上。

pub mod object_cache;
pub mod register;

use async_trait::async_trait;

use crate::errors::Result;

/// 缓存查询结果
#[derive(Debug, Clone, PartialEq)]
pub enum CacheResult<T> {
    Found(T),
    NotFound,
    /// 后端出错，无法确定是否存在（调用方按未命中处理）
    ExistsButNoValue,
}

impl<T> CacheResult<T> {
    pub fn found(self) -> Option<T> {
        match self {
            CacheResult::Found(value) => Some(value),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ObjectCache: Send + Sync {
    /// 读取原始字符串值
    async fn get_raw(&self, key: &str) -> CacheResult<String>;
    /// 写入原始字符串值，`ttl` 为秒数，0 表示不过期
    async fn insert_raw(&self, key: String, value: String, ttl: u64) -> Result<()>;
    /// 删除单个键
    async fn remove(&self, key: &str);
    /// 批量删除
    async fn remove_many(&self, keys: &[String]) {
        for key in keys {
            self.remove(key).await;
        }
    }
    /// 删除所有以 `prefix` 开头的键（租户范围的清空）
    async fn remove_prefixed(&self, prefix: &str);
}

/// 声明一个缓存插件，生成 `register_plugin()` 注册函数
#[macro_export]
macro_rules! declare_object_cache_plugin {
    ($name:literal, $ty:ty) => {
        pub(crate) fn register_plugin() {
            $crate::cache::register::register_object_cache_plugin(
                $name,
                std::sync::Arc::new(|| {
                    Box::pin(async {
                        let cache =
                            <$ty>::new().map_err($crate::errors::ScoDocError::cache_connection)?;
                        Ok(Box::new(cache) as Box<dyn $crate::cache::ObjectCache>)
                    })
                }),
            );
        }
    };
}
