//! 学期结构：学期、UE、模块实例、评测与注册
//!
//! 这些类型由 `ScoreStore` 读出，是成绩计算的只读输入。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// 学期（FormSemestre）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/formation.ts")]
pub struct SemesterInfo {
    pub id: i64,
    pub title: String,
    /// 培养方案代码，同代码的学期之间可以资本化 UE
    pub formation_code: String,
    /// 学期序号（S1、S2 …）
    pub semester_index: i32,
    pub date_debut: NaiveDate,
    pub date_fin: NaiveDate,
    /// 锁定平均分：UE 与总平均不计算
    pub block_moyennes: bool,
    /// 总平均按 UE 显式系数加权
    pub use_ue_coefs: bool,
}

impl SemesterInfo {
    /// `self` 的 UE 结果能否被资本化到 `target`
    ///
    /// 同一培养方案代码、同一学期序号，且 `target` 开始不早于 `self`。
    pub fn capitalizes_into(&self, target: &SemesterInfo) -> bool {
        self.id != target.id
            && self.formation_code == target.formation_code
            && self.semester_index == target.semester_index
            && target.date_debut >= self.date_debut
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/formation.ts")]
pub enum UeType {
    #[default]
    Standard,
    /// 运动/加分 UE，只通过加分函数影响总平均
    Sport,
    /// 实习
    Internship,
    Elective,
    /// 职业 UE，同时算作基础 UE
    Professional,
}

impl UeType {
    /// 基础 UE（ECTS 计入 `ects_pot_fond`）
    pub fn is_fundamental(self) -> bool {
        matches!(self, UeType::Standard | UeType::Internship | UeType::Professional)
    }

    pub fn is_professional(self) -> bool {
        self == UeType::Professional
    }
}

/// 教学单元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/formation.ts")]
pub struct UeInfo {
    pub id: i64,
    /// UE 兼容代码，资本化按此匹配
    pub ue_code: String,
    pub acronym: String,
    pub title: String,
    pub ects: Option<f64>,
    pub coefficient: Option<f64>,
    pub ue_type: UeType,
    /// 仅用于外部 UE（在别处取得的成绩），不参与当前计算
    pub is_external: bool,
    pub numero: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/formation.ts")]
pub enum ModuleKind {
    #[default]
    Standard,
    /// 扣分模块：平均分从 UE 平均中减去
    Malus,
}

/// 模块实例（某学期开设的模块）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/formation.ts")]
pub struct ModuleImplInfo {
    pub id: i64,
    pub semester_id: i64,
    pub ue_id: i64,
    pub code: String,
    pub title: String,
    pub coefficient: f64,
    pub kind: ModuleKind,
    /// 用户自定义计算公式
    pub formula: Option<String>,
    pub numero: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/formation.ts")]
pub enum EvaluationType {
    #[default]
    Normal,
    /// 补考：取模块平均与补考成绩的较大者
    CatchUp,
    /// 第二次考试：直接替换模块平均
    SecondSession,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/formation.ts")]
pub struct Evaluation {
    pub id: i64,
    pub moduleimpl_id: i64,
    pub max_score: f64,
    pub coefficient: f64,
    pub evaluation_type: EvaluationType,
    /// 立即计入：成绩未录完也参与计算
    pub immediate_inclusion: bool,
    pub date: Option<NaiveDate>,
    pub numero: i32,
}

/// 学期注册状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/formation.ts")]
pub enum EnrollmentState {
    /// 在读
    #[default]
    #[serde(rename = "I")]
    Enrolled,
    /// 退学
    #[serde(rename = "D")]
    Withdrawn,
    /// 因缺勤不及格
    #[serde(rename = "DEF")]
    Failing,
}

impl EnrollmentState {
    pub fn code(&self) -> &'static str {
        match self {
            EnrollmentState::Enrolled => "I",
            EnrollmentState::Withdrawn => "D",
            EnrollmentState::Failing => "DEF",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "I" => Some(EnrollmentState::Enrolled),
            "D" => Some(EnrollmentState::Withdrawn),
            "DEF" => Some(EnrollmentState::Failing),
            _ => None,
        }
    }
}

/// 学期注册
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/formation.ts")]
pub struct Enrollment {
    pub student_id: i64,
    pub state: EnrollmentState,
    /// 排序用姓名（姓 + 名）
    pub sort_name: String,
}

/// 以前取得并可资本化的 UE 成绩
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/formation.ts")]
pub struct CapitalizedUe {
    pub student_id: i64,
    pub ue_code: String,
    pub average: Option<f64>,
    /// 来源学期，外部 UE 为 `None`
    pub source_semester_id: Option<i64>,
    /// 来源学期中该 UE 的模块系数之和
    pub coefficient: Option<f64>,
    pub is_external: bool,
    pub event_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn semester(id: i64, code: &str, index: i32, start: (i32, u32, u32)) -> SemesterInfo {
        let date_debut = NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap();
        SemesterInfo {
            id,
            title: format!("S{index}"),
            formation_code: code.to_string(),
            semester_index: index,
            date_debut,
            date_fin: date_debut + chrono::Duration::days(150),
            block_moyennes: false,
            use_ue_coefs: false,
        }
    }

    #[test]
    fn test_capitalizes_into() {
        let source = semester(1, "INFO", 1, (2023, 9, 1));
        let later = semester(2, "INFO", 1, (2024, 9, 1));
        let earlier = semester(3, "INFO", 1, (2022, 9, 1));
        let other_index = semester(4, "INFO", 2, (2024, 1, 15));
        let other_code = semester(5, "GEA", 1, (2024, 9, 1));

        assert!(source.capitalizes_into(&later));
        assert!(!source.capitalizes_into(&earlier));
        assert!(!source.capitalizes_into(&other_index));
        assert!(!source.capitalizes_into(&other_code));
        assert!(!source.capitalizes_into(&source));
    }

    #[test]
    fn test_enrollment_state_codes() {
        for state in [
            EnrollmentState::Enrolled,
            EnrollmentState::Withdrawn,
            EnrollmentState::Failing,
        ] {
            assert_eq!(EnrollmentState::from_code(state.code()), Some(state));
        }
        assert_eq!(
            serde_json::to_string(&EnrollmentState::Failing).unwrap(),
            r#""DEF""#
        );
    }
}
