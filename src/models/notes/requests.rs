use serde::Deserialize;
use ts_rs::TS;

use crate::models::{Enrollment, EnrollmentState, Score};

/// 一个学生的成绩，`value` 为 null 表示删除
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct ScoreEntry {
    pub student_id: i64,
    #[ts(type = "number | \"ABS\" | \"EXC\" | \"ATT\" | null")]
    pub value: Option<Score>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct SaveScoresRequest {
    pub scores: Vec<ScoreEntry>,
}

impl SaveScoresRequest {
    pub fn into_pairs(self) -> Vec<(i64, Option<Score>)> {
        self.scores
            .into_iter()
            .map(|entry| (entry.student_id, entry.value))
            .collect()
    }
}

/// 设置或清除公式（null 或空字符串表示清除）
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct FormulaRequest {
    #[serde(default)]
    pub formula: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct EnrollmentStateRequest {
    pub state: EnrollmentState,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct CoefficientRequest {
    pub coefficient: f64,
}

/// 资本化 UE 的手动系数，null 表示恢复默认
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct UeCoefficientRequest {
    #[serde(default)]
    pub coefficient: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct EnrollEntry {
    pub student_id: i64,
    pub sort_name: String,
    #[serde(default)]
    pub state: EnrollmentState,
    /// 同时注册的模块实现
    #[serde(default)]
    pub modules: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct EnrollStudentsRequest {
    pub students: Vec<EnrollEntry>,
}

impl EnrollStudentsRequest {
    pub fn into_enrollments(self) -> Vec<(Enrollment, Vec<i64>)> {
        self.students
            .into_iter()
            .map(|entry| {
                (
                    Enrollment {
                        student_id: entry.student_id,
                        state: entry.state,
                        sort_name: entry.sort_name,
                    },
                    entry.modules,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_scores_request() {
        let raw = r#"{"scores": [
            {"student_id": 1, "value": 12.5},
            {"student_id": 2, "value": "ABS"},
            {"student_id": 3, "value": null}
        ]}"#;
        let req: SaveScoresRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(
            req.into_pairs(),
            vec![
                (1, Some(Score::Numeric(12.5))),
                (2, Some(Score::Absent)),
                (3, None)
            ]
        );
    }

    #[test]
    fn test_enrollment_state_codes() {
        let req: EnrollmentStateRequest = serde_json::from_str(r#"{"state": "DEF"}"#).unwrap();
        assert_eq!(req.state, EnrollmentState::Failing);
    }

    #[test]
    fn test_enroll_defaults() {
        let raw = r#"{"students": [{"student_id": 7, "sort_name": "GAMMA Gil"}]}"#;
        let req: EnrollStudentsRequest = serde_json::from_str(raw).unwrap();
        let enrollments = req.into_enrollments();
        assert_eq!(enrollments[0].0.state, EnrollmentState::Enrolled);
        assert!(enrollments[0].1.is_empty());
    }
}
