//! SeaORM 实体定义
//!
//! 这些实体用于数据库操作，与 models 模块中的领域类型分离。
//! Storage 层使用这些实体读写数据，然后转换为 models 中的类型。

pub mod prelude;

pub mod absences;
pub mod evaluations;
pub mod module_enrollments;
pub mod module_impls;
pub mod scores;
pub mod semester_enrollments;
pub mod semesters;
pub mod ue_settings;
pub mod ue_validations;
pub mod ues;

/// 日期列的存储格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";
