//! ScoDoc Next - 成绩汇总与结果缓存服务
//!
//! 由评测成绩计算模块平均、UE 平均和学期总平均，处理资本化、加分与排名，
//! 并按学期缓存计算结果，成绩或结构修改后立即失效。
//!
//! # 架构
//! - `cache`: 缓存后端（Moka/Redis）
//! - `config`: 配置管理
//! - `entity`: SeaORM 数据库实体
//! - `errors`: 统一错误处理
//! - `models`: 领域类型与 API 数据模型
//! - `notes`: 成绩计算核心与结果缓存
//! - `routes`: API 路由层
//! - `runtime`: 运行时生命周期管理
//! - `services`: 业务逻辑层
//! - `storage`: 数据存储层（SeaORM / 内存）
//! - `utils`: 请求参数错误处理

pub mod cache;
pub mod config;
pub mod entity;
pub mod errors;
pub mod models;
pub mod notes;
pub mod routes;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod utils;
