//! 成绩数据存储层
//!
//! 计算核心只通过 `ScoreStore` 读写原始数据，不关心具体的表结构。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::{
    AbsenceCounts, CapitalizedUe, Enrollment, EnrollmentState, Evaluation, ModuleImplInfo, Score,
    SemesterInfo, UeInfo,
};

pub mod memory;
pub mod sea_orm_storage;

pub use memory::MemoryStorage;

#[async_trait::async_trait]
pub trait ScoreStore: Send + Sync {
    /// 学期与培养方案
    // 获取学期信息
    async fn get_semester(&self, semester_id: i64) -> Result<Option<SemesterInfo>>;
    // 学期所属培养方案的全部 UE
    async fn list_ues(&self, semester_id: i64) -> Result<Vec<UeInfo>>;
    // 学期开设的模块
    async fn list_modules(&self, semester_id: i64) -> Result<Vec<ModuleImplInfo>>;
    // 通过 ID 获取模块
    async fn get_module(&self, moduleimpl_id: i64) -> Result<Option<ModuleImplInfo>>;
    // 本学期的 UE 公式
    async fn get_ue_formulas(&self, semester_id: i64) -> Result<HashMap<i64, String>>;
    // 本学期为资本化 UE 设定的系数
    async fn get_ue_coefficients(&self, semester_id: i64) -> Result<HashMap<i64, f64>>;

    /// 评测与成绩
    // 模块的评测
    async fn list_evaluations(&self, moduleimpl_id: i64) -> Result<Vec<Evaluation>>;
    // 通过 ID 获取评测
    async fn get_evaluation(&self, evaluation_id: i64) -> Result<Option<Evaluation>>;
    // 评测的全部成绩，按学生 id 索引
    async fn get_scores(&self, evaluation_id: i64) -> Result<HashMap<i64, Score>>;

    /// 注册
    // 学期注册的学生
    async fn list_enrolled(&self, semester_id: i64) -> Result<Vec<Enrollment>>;
    // 模块注册的学生
    async fn list_module_enrolled(&self, moduleimpl_id: i64) -> Result<HashSet<i64>>;

    /// 资本化与缺勤
    // 可以资本化到该学期的 UE 成绩（仅限本学期注册的学生）
    async fn list_capitalized_ues(&self, semester_id: i64) -> Result<Vec<CapitalizedUe>>;
    // 资本化了来自该学期 UE 的其他学期
    async fn list_semesters_using_capitalized_ues_from(&self, semester_id: i64)
    -> Result<Vec<i64>>;
    // 每个学生的缺勤半天数
    async fn get_absence_counts(&self, semester_id: i64) -> Result<HashMap<i64, AbsenceCounts>>;

    /// 写操作
    // 保存成绩，None 表示删除；返回变更的条数
    async fn save_scores(&self, evaluation_id: i64, scores: &[(i64, Option<Score>)])
    -> Result<usize>;
    // 修改评测系数
    async fn set_evaluation_coefficient(&self, evaluation_id: i64, coefficient: f64)
    -> Result<bool>;
    // 修改模块系数
    async fn set_module_coefficient(&self, moduleimpl_id: i64, coefficient: f64) -> Result<bool>;
    // 修改模块公式，None 表示清除
    async fn set_module_formula(&self, moduleimpl_id: i64, formula: Option<String>)
    -> Result<bool>;
    // 修改本学期的 UE 公式
    async fn set_ue_formula(
        &self,
        semester_id: i64,
        ue_id: i64,
        formula: Option<String>,
    ) -> Result<()>;
    // 修改本学期资本化 UE 的系数
    async fn set_ue_coefficient(
        &self,
        semester_id: i64,
        ue_id: i64,
        coefficient: Option<f64>,
    ) -> Result<()>;
    // 修改学生的注册状态
    async fn set_enrollment_state(
        &self,
        semester_id: i64,
        student_id: i64,
        state: EnrollmentState,
    ) -> Result<bool>;
    // 注册学生到学期及指定模块
    async fn enroll_student(
        &self,
        semester_id: i64,
        enrollment: Enrollment,
        moduleimpl_ids: &[i64],
    ) -> Result<()>;
}

/// 按配置创建存储：`memory://` 使用内存存储，其余走 SeaORM
pub async fn create_storage() -> Result<Arc<dyn ScoreStore>> {
    let config = AppConfig::get();
    if config.database.url.starts_with("memory://") {
        return Ok(Arc::new(MemoryStorage::new()));
    }
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
