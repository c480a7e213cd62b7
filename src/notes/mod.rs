//! 成绩计算与缓存
//!
//! 模块平均 → UE 平均 → 学期总平均，结果汇总为一个 `NotesTable`，
//! 由 `ResultCache` 按学期缓存，写入路径经 `NotesWriter` 在修改后立即失效缓存。

pub mod bonus;
pub mod cache;
pub mod formula;
pub mod loader;
pub mod module_averager;
pub mod mutations;
pub mod ranking;
pub mod semester_averager;
pub mod table;
pub mod ue_averager;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cache::{RequestScope, ResultCache};
pub use loader::SemesterData;
pub use mutations::NotesWriter;
pub use table::NotesTable;

use crate::config::{NotesConfig, UeWeighting};
use crate::errors::Result;
use bonus::BonusFn;

/// 计算参数（由 `[notes]` 配置解析而来）
#[derive(Debug, Clone)]
pub struct NotesSettings {
    pub weighting: UeWeighting,
    pub bonus: Option<BonusFn>,
    pub capitalize_on_equal: bool,
    pub ue_validation_threshold: f64,
    pub rank_precision: u32,
}

impl Default for NotesSettings {
    fn default() -> Self {
        Self {
            weighting: UeWeighting::Ects,
            bonus: None,
            capitalize_on_equal: false,
            ue_validation_threshold: 10.0,
            rank_precision: 2,
        }
    }
}

impl NotesSettings {
    pub fn from_config(config: &NotesConfig) -> Result<Self> {
        Ok(Self {
            weighting: config.weighting,
            bonus: bonus::resolve(&config.bonus_function)?,
            capitalize_on_equal: config.capitalize_on_equal,
            ue_validation_threshold: config.ue_validation_threshold,
            rank_precision: config.rank_precision,
        })
    }
}
