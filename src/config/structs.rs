use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub notes: NotesConfig,
}

/// 应用设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub system_name: String,
    pub environment: String,
    pub log_level: String,
    /// 部门（租户）标识，用作缓存键的命名空间
    pub department: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            system_name: "ScoDoc Next".to_string(),
            environment: "development".to_string(),
            log_level: "info".to_string(),
            department: "DEPT".to_string(),
        }
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub unix_socket_path: String,
    pub workers: usize,
    pub max_workers: usize,
    pub timeouts: TimeoutConfig,
    pub limits: LimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            unix_socket_path: String::new(),
            workers: 0,
            max_workers: 8,
            timeouts: TimeoutConfig::default(),
            limits: LimitConfig::default(),
        }
    }
}

/// 超时配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub client_request: u64,
    pub client_disconnect: u64,
    pub keep_alive: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            client_request: 5000,
            client_disconnect: 1000,
            keep_alive: 30,
        }
    }
}

/// 限制配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    pub max_payload_size: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_payload_size: 1024 * 1024,
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,    // 数据库连接 URL（从 scheme 自动推断类型，memory:// 为内存存储）
    pub pool_size: u32, // 连接池大小
    pub timeout: u64,   // 连接超时 (秒)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "scodoc.db".to_string(),
            pool_size: 8,
            timeout: 10,
        }
    }
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(rename = "type")]
    pub cache_type: String,
    /// 默认 TTL（秒），0 表示不过期
    pub default_ttl: u64,
    /// 已渲染成绩单的 TTL（秒）
    pub bulletin_ttl: u64,
    pub redis: RedisConfig,
    pub memory: MemoryConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: "moka".to_string(),
            default_ttl: 3600,
            bulletin_ttl: 12 * 60 * 60,
            redis: RedisConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "scodoc:".to_string(),
        }
    }
}

/// 内存缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_capacity: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
        }
    }
}

/// 学期总平均的 UE 权重方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UeWeighting {
    /// 按 UE 的 ECTS 学分加权
    #[default]
    Ects,
    /// 按 UE 显式系数加权
    UeCoefficients,
    /// 按 UE 内模块系数之和加权
    ModuleCoefficients,
}

/// 成绩计算配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    pub weighting: UeWeighting,
    /// 运动/加分 UE 使用的加分函数名，空字符串表示不加分
    pub bonus_function: String,
    /// 以前取得的 UE 成绩与当前相等时是否也采用（资本化）
    pub capitalize_on_equal: bool,
    /// UE 通过线（用于 ECTS 预计）
    pub ue_validation_threshold: f64,
    /// 判定并列名次时使用的小数位数
    pub rank_precision: u32,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            weighting: UeWeighting::Ects,
            bonus_function: String::new(),
            capitalize_on_equal: false,
            ue_validation_threshold: 10.0,
            rank_precision: 2,
        }
    }
}
