//! 数据模型
//!
//! - `formation`/`scores`/`results`: 计算核心使用的领域类型
//! - `notes`: HTTP 接口的请求与响应
//! - `common`: 统一响应结构与分页

pub mod common;
pub mod formation;
pub mod notes;
pub mod results;
pub mod scores;

pub use common::*;
pub use formation::*;
pub use results::*;
pub use scores::*;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::ScoDocError;

/// API 业务错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/api.ts")]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    // 通用
    BadRequest = 1000,
    NotFound = 1004,
    ValidationFailed = 1022,
    InternalServerError = 1500,

    // 学期结构
    SemesterNotFound = 2000,
    ModuleNotFound = 2001,
    EvaluationNotFound = 2002,
    StudentNotEnrolled = 2003,
    SemesterUnavailable = 2010,

    // 成绩与公式
    FormulaInvalid = 3000,
    ScoreInvalid = 3001,
}

impl From<&ScoDocError> for ErrorCode {
    fn from(err: &ScoDocError) -> Self {
        match err {
            ScoDocError::NotFound(_) => ErrorCode::NotFound,
            ScoDocError::Validation(_) | ScoDocError::DateParse(_) => ErrorCode::ValidationFailed,
            ScoDocError::Formula(_) => ErrorCode::FormulaInvalid,
            ScoDocError::Structure(_) => ErrorCode::SemesterUnavailable,
            _ => ErrorCode::InternalServerError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(
            ErrorCode::from(&ScoDocError::structure("module 3 has no UE")),
            ErrorCode::SemesterUnavailable
        );
        assert_eq!(
            ErrorCode::from(&ScoDocError::formula("unknown name 'os'")),
            ErrorCode::FormulaInvalid
        );
        assert_eq!(
            ErrorCode::from(&ScoDocError::cache_connection("refused")),
            ErrorCode::InternalServerError
        );
        assert_eq!(ErrorCode::Success as i32, 0);
    }
}
