//! 配置管理
//!
//! 静态配置从 `config.toml`、`config.{APP_ENV}.toml` 与环境变量加载。

#[path = "impl.rs"]
mod config_impl;
mod structs;

pub use structs::*;
