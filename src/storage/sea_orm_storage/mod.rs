//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod capitalization;
mod enrollments;
mod evaluations;
mod formation;

use crate::config::{AppConfig, DatabaseConfig};
use crate::errors::{Result, ScoDocError};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 按全局配置创建存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        Self::connect(&config.database).await
    }

    /// 连接数据库并运行迁移
    pub async fn connect(settings: &DatabaseConfig) -> Result<Self> {
        let db_url = Self::build_database_url(&settings.url)?;

        let db = if db_url.starts_with("sqlite:") {
            Self::connect_sqlite(&db_url, settings).await?
        } else {
            Self::connect_generic(&db_url, settings).await?
        };

        Migrator::up(&db, None)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// SQLite 专用连接（WAL + pragma）
    ///
    /// 内存数据库只能有一个连接，且不能因空闲被回收。
    async fn connect_sqlite(url: &str, settings: &DatabaseConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let in_memory = url.contains(":memory:");
        let mut opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| ScoDocError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .pragma("temp_store", "memory");
        if !in_memory {
            opt = opt
                .journal_mode(SqliteJournalMode::Wal)
                .pragma("cache_size", "-64000");
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(settings.pool_size)
                .min_connections(1)
                .idle_timeout(Duration::from_secs(300))
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(settings.timeout))
            .connect_with(opt)
            .await
            .map_err(|e| ScoDocError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, settings: &DatabaseConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(settings.pool_size)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(settings.timeout))
            .acquire_timeout(Duration::from_secs(settings.timeout))
            .idle_timeout(Duration::from_secs(600))
            .sqlx_logging(false);

        Database::connect(opt)
            .await
            .map_err(|e| ScoDocError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite:") {
            Ok(url.to_string())
        } else if url == ":memory:" {
            Ok("sqlite::memory:".to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") {
            Ok(format!("sqlite://{url}?mode=rwc"))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(ScoDocError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite:, postgres://, mysql://, memory:// 或 .db/.sqlite 文件路径"
            )))
        }
    }

    /// 学期不存在时返回 NotFound
    pub(crate) async fn require_semester(&self, semester_id: i64) -> Result<SemesterInfo> {
        self.get_semester_impl(semester_id)
            .await?
            .ok_or_else(|| ScoDocError::not_found(format!("semester {semester_id} not found")))
    }
}

// ScoreStore trait 实现
use crate::models::{
    AbsenceCounts, CapitalizedUe, Enrollment, EnrollmentState, Evaluation, ModuleImplInfo, Score,
    SemesterInfo, UeInfo,
};
use crate::storage::ScoreStore;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

#[async_trait]
impl ScoreStore for SeaOrmStorage {
    // 学期与培养方案
    async fn get_semester(&self, semester_id: i64) -> Result<Option<SemesterInfo>> {
        self.get_semester_impl(semester_id).await
    }

    async fn list_ues(&self, semester_id: i64) -> Result<Vec<UeInfo>> {
        self.list_ues_impl(semester_id).await
    }

    async fn list_modules(&self, semester_id: i64) -> Result<Vec<ModuleImplInfo>> {
        self.list_modules_impl(semester_id).await
    }

    async fn get_module(&self, moduleimpl_id: i64) -> Result<Option<ModuleImplInfo>> {
        self.get_module_impl(moduleimpl_id).await
    }

    async fn get_ue_formulas(&self, semester_id: i64) -> Result<HashMap<i64, String>> {
        self.get_ue_formulas_impl(semester_id).await
    }

    async fn get_ue_coefficients(&self, semester_id: i64) -> Result<HashMap<i64, f64>> {
        self.get_ue_coefficients_impl(semester_id).await
    }

    // 评测与成绩
    async fn list_evaluations(&self, moduleimpl_id: i64) -> Result<Vec<Evaluation>> {
        self.list_evaluations_impl(moduleimpl_id).await
    }

    async fn get_evaluation(&self, evaluation_id: i64) -> Result<Option<Evaluation>> {
        self.get_evaluation_impl(evaluation_id).await
    }

    async fn get_scores(&self, evaluation_id: i64) -> Result<HashMap<i64, Score>> {
        self.get_scores_impl(evaluation_id).await
    }

    // 注册
    async fn list_enrolled(&self, semester_id: i64) -> Result<Vec<Enrollment>> {
        self.list_enrolled_impl(semester_id).await
    }

    async fn list_module_enrolled(&self, moduleimpl_id: i64) -> Result<HashSet<i64>> {
        self.list_module_enrolled_impl(moduleimpl_id).await
    }

    // 资本化与缺勤
    async fn list_capitalized_ues(&self, semester_id: i64) -> Result<Vec<CapitalizedUe>> {
        self.list_capitalized_ues_impl(semester_id).await
    }

    async fn list_semesters_using_capitalized_ues_from(
        &self,
        semester_id: i64,
    ) -> Result<Vec<i64>> {
        self.list_semesters_using_capitalized_ues_from_impl(semester_id)
            .await
    }

    async fn get_absence_counts(&self, semester_id: i64) -> Result<HashMap<i64, AbsenceCounts>> {
        self.get_absence_counts_impl(semester_id).await
    }

    // 写操作
    async fn save_scores(
        &self,
        evaluation_id: i64,
        scores: &[(i64, Option<Score>)],
    ) -> Result<usize> {
        self.save_scores_impl(evaluation_id, scores).await
    }

    async fn set_evaluation_coefficient(
        &self,
        evaluation_id: i64,
        coefficient: f64,
    ) -> Result<bool> {
        self.set_evaluation_coefficient_impl(evaluation_id, coefficient)
            .await
    }

    async fn set_module_coefficient(&self, moduleimpl_id: i64, coefficient: f64) -> Result<bool> {
        self.set_module_coefficient_impl(moduleimpl_id, coefficient)
            .await
    }

    async fn set_module_formula(
        &self,
        moduleimpl_id: i64,
        formula: Option<String>,
    ) -> Result<bool> {
        self.set_module_formula_impl(moduleimpl_id, formula).await
    }

    async fn set_ue_formula(
        &self,
        semester_id: i64,
        ue_id: i64,
        formula: Option<String>,
    ) -> Result<()> {
        self.set_ue_formula_impl(semester_id, ue_id, formula).await
    }

    async fn set_ue_coefficient(
        &self,
        semester_id: i64,
        ue_id: i64,
        coefficient: Option<f64>,
    ) -> Result<()> {
        self.set_ue_coefficient_impl(semester_id, ue_id, coefficient)
            .await
    }

    async fn set_enrollment_state(
        &self,
        semester_id: i64,
        student_id: i64,
        state: EnrollmentState,
    ) -> Result<bool> {
        self.set_enrollment_state_impl(semester_id, student_id, state)
            .await
    }

    async fn enroll_student(
        &self,
        semester_id: i64,
        enrollment: Enrollment,
        moduleimpl_ids: &[i64],
    ) -> Result<()> {
        self.enroll_student_impl(semester_id, enrollment, moduleimpl_ids)
            .await
    }
}
