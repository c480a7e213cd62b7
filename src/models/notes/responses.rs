use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

use crate::models::{
    Average, EnrollmentState, ModuleImplInfo, PaginatedResponse, Rank, SemesterInfo, UeInfo,
};
use crate::notes::NotesTable;
use crate::notes::module_averager::EvaluationState;

fn rank_label(rank: Option<Rank>) -> Option<String> {
    rank.map(|r| r.to_string())
}

/// 平均分统计
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct StatsSummary {
    #[ts(type = "number | string")]
    pub moy: Average,
    #[ts(type = "number | string")]
    pub min: Average,
    #[ts(type = "number | string")]
    pub max: Average,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct UeSummary {
    pub ue: UeInfo,
    pub modules: Vec<ModuleImplInfo>,
    pub stats: Option<StatsSummary>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct UeListResponse {
    pub semester_id: i64,
    pub ues: Vec<UeSummary>,
}

impl UeListResponse {
    pub fn from_table(table: &NotesTable) -> Self {
        Self {
            semester_id: table.semester().id,
            ues: table
                .get_ues()
                .iter()
                .map(|ue| UeSummary {
                    ue: ue.clone(),
                    modules: table.get_modimpls(Some(ue.id)).into_iter().cloned().collect(),
                    stats: table.get_ue_stats(ue.id).map(|s| StatsSummary {
                        moy: s.moy,
                        min: s.min,
                        max: s.max,
                    }),
                })
                .collect(),
        }
    }
}

/// 排序表中的一行
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct ResultRow {
    pub student_id: i64,
    pub state: Option<EnrollmentState>,
    pub rank: Option<String>,
    #[ts(type = "number | string")]
    pub general: Average,
    #[ts(type = "Array<number | string>")]
    pub ues: Vec<Average>,
    #[ts(type = "Array<number | string>")]
    pub modules: Vec<Average>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct SemesterStatsSummary {
    #[ts(type = "number | string")]
    pub moy_moy: Average,
    #[ts(type = "number | string")]
    pub moy_min: Average,
    #[ts(type = "number | string")]
    pub moy_max: Average,
    pub nb_enrolled: usize,
    pub nb_withdrawn: usize,
    pub nb_failing: usize,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct DiagnosticSummary {
    pub moduleimpl_id: Option<i64>,
    pub ue_id: Option<i64>,
    pub student_id: Option<i64>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct SemesterResultsResponse {
    pub semester: SemesterInfo,
    /// 列顺序
    pub ue_acronyms: Vec<String>,
    pub module_codes: Vec<String>,
    pub rows: PaginatedResponse<ResultRow>,
    pub stats: SemesterStatsSummary,
    pub diagnostics: Vec<DiagnosticSummary>,
    pub built_at: DateTime<Utc>,
}

impl SemesterResultsResponse {
    /// 全部行（按总平均排序），分页由调用方完成
    pub fn rows(table: &NotesTable) -> Vec<ResultRow> {
        table
            .get_table_moyennes_triees()
            .into_iter()
            .map(|row| ResultRow {
                student_id: row.student_id,
                state: table.get_etud_etat(row.student_id),
                rank: rank_label(table.get_etud_rang(row.student_id)),
                general: row.general,
                ues: row.ues,
                modules: row.modules,
            })
            .collect()
    }

    pub fn from_table(table: &NotesTable, rows: PaginatedResponse<ResultRow>) -> Self {
        let stats = table.semester_stats();
        Self {
            semester: table.semester().clone(),
            ue_acronyms: table.get_ues().iter().map(|ue| ue.acronym.clone()).collect(),
            module_codes: table
                .get_modimpls(None)
                .iter()
                .map(|m| m.code.clone())
                .collect(),
            rows,
            stats: SemesterStatsSummary {
                moy_moy: stats.moy_moy,
                moy_min: stats.moy_min,
                moy_max: stats.moy_max,
                nb_enrolled: stats.nb_enrolled,
                nb_withdrawn: stats.nb_withdrawn,
                nb_failing: stats.nb_failing,
            },
            diagnostics: table
                .diagnostics()
                .iter()
                .map(|d| DiagnosticSummary {
                    moduleimpl_id: d.moduleimpl_id,
                    ue_id: d.ue_id,
                    student_id: d.student_id,
                    message: d.message.clone(),
                })
                .collect(),
            built_at: table.built_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct StudentUeResult {
    pub ue_id: i64,
    pub acronym: String,
    /// 采用的平均（可能来自资本化）
    #[ts(type = "number | string")]
    pub moy: Average,
    #[ts(type = "number | string")]
    pub cur_moy_ue: Average,
    pub coef_ue: f64,
    pub is_capitalized: bool,
    pub capitalized_from: Option<i64>,
    pub ects_pot: f64,
    pub nb_missing: usize,
    pub rank: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct StudentModuleResult {
    pub moduleimpl_id: i64,
    pub ue_id: i64,
    pub code: String,
    #[ts(type = "number | string")]
    pub average: Average,
    pub rank: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct StudentResultsResponse {
    pub semester_id: i64,
    pub student_id: i64,
    pub state: EnrollmentState,
    #[ts(type = "number | string")]
    pub general: Average,
    pub rank: Option<String>,
    pub rank_size: usize,
    pub sum_coefs: f64,
    pub ects_pot: f64,
    pub ects_pot_fond: f64,
    pub ects_pot_pro: f64,
    pub bonus: f64,
    /// 有待定成绩时公布的平均可能还会变
    pub has_pending_scores: bool,
    pub ues: Vec<StudentUeResult>,
    pub modules: Vec<StudentModuleResult>,
}

impl StudentResultsResponse {
    /// 学生不在该学期时返回 `None`
    pub fn from_table(table: &NotesTable, student_id: i64) -> Option<Self> {
        let state = table.get_etud_etat(student_id)?;
        let infos = table.get_etud_moy_infos(student_id)?;
        let ues = table
            .get_ues_filtered(false, Some(student_id))
            .into_iter()
            .filter_map(|ue| {
                table
                    .get_etud_ue_status(student_id, ue.id)
                    .map(|status| StudentUeResult {
                        ue_id: ue.id,
                        acronym: ue.acronym.clone(),
                        moy: status.moy,
                        cur_moy_ue: status.cur_moy_ue,
                        coef_ue: status.coef_ue,
                        is_capitalized: status.is_capitalized,
                        capitalized_from: status.capitalized_from,
                        ects_pot: status.ects_pot,
                        nb_missing: status.nb_missing,
                        rank: rank_label(table.get_etud_ue_rang(ue.id, student_id)),
                    })
            })
            .collect();
        let modules = table
            .get_modimpls(None)
            .into_iter()
            .filter(|m| table.get_etud_mod_moy(m.id, student_id) != Average::NotEnrolled)
            .map(|m| StudentModuleResult {
                moduleimpl_id: m.id,
                ue_id: m.ue_id,
                code: m.code.clone(),
                average: table.get_etud_mod_moy(m.id, student_id),
                rank: rank_label(table.get_etud_mod_rang(m.id, student_id)),
            })
            .collect();
        Some(Self {
            semester_id: table.semester().id,
            student_id,
            state,
            general: infos.average,
            rank: rank_label(table.get_etud_rang(student_id)),
            rank_size: table.rank_size(),
            sum_coefs: infos.sum_coefs,
            ects_pot: infos.ects_pot,
            ects_pot_fond: infos.ects_pot_fond,
            ects_pot_pro: infos.ects_pot_pro,
            bonus: infos.bonus,
            has_pending_scores: table.etud_has_notes_attente(student_id),
            ues,
            modules,
        })
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct EvaluationSummary {
    pub evaluation_id: i64,
    pub nb_notes: usize,
    pub nb_missing: usize,
    pub complete: bool,
    pub waiting: bool,
    pub usable: bool,
}

impl From<&EvaluationState> for EvaluationSummary {
    fn from(state: &EvaluationState) -> Self {
        Self {
            evaluation_id: state.evaluation_id,
            nb_notes: state.nb_notes,
            nb_missing: state.nb_missing,
            complete: state.complete,
            waiting: state.waiting,
            usable: state.usable,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct ModuleStatsResponse {
    pub module: ModuleImplInfo,
    #[ts(type = "number | string")]
    pub moy: Average,
    #[ts(type = "number | string")]
    pub min: Average,
    #[ts(type = "number | string")]
    pub max: Average,
    pub nb_notes: usize,
    pub nb_missing: usize,
    pub nb_valid_evals: usize,
    pub pending: bool,
    pub evaluations: Vec<EvaluationSummary>,
}

impl ModuleStatsResponse {
    pub fn from_table(table: &NotesTable, moduleimpl_id: i64) -> Option<Self> {
        let module = table
            .get_modimpls(None)
            .into_iter()
            .find(|m| m.id == moduleimpl_id)?;
        let stats = table.get_mod_stats(moduleimpl_id)?;
        Some(Self {
            module: module.clone(),
            moy: stats.moy,
            min: stats.min,
            max: stats.max,
            nb_notes: stats.nb_notes,
            nb_missing: stats.nb_missing,
            nb_valid_evals: stats.nb_valid_evals,
            pending: table
                .get_mod_result(moduleimpl_id)
                .is_some_and(|r| r.pending),
            evaluations: table
                .get_evaluations_etats(moduleimpl_id)
                .iter()
                .map(EvaluationSummary::from)
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct SaveScoresResponse {
    pub evaluation_id: i64,
    pub changed: usize,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct EnrollStudentsResponse {
    pub semester_id: i64,
    pub enrolled: usize,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notes.ts")]
pub struct InvalidateResponse {
    /// 被失效的学期（含资本化了它的学期）
    pub semesters: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaginationQuery;
    use crate::notes::NotesSettings;
    use crate::notes::fixtures::{self, MODULE, STUDENT_1};

    fn table() -> NotesTable {
        NotesTable::compute(fixtures::sample_data(), &NotesSettings::default()).unwrap()
    }

    #[test]
    fn test_student_results() {
        let table = table();
        let res = StudentResultsResponse::from_table(&table, STUDENT_1).unwrap();
        assert_eq!(res.rank.as_deref(), Some("1"));
        assert_eq!(res.rank_size, 2);
        assert_eq!(res.ues.len(), 1);
        assert_eq!(res.modules.len(), 1);
        assert_eq!(res.ects_pot, 3.0);
        assert_eq!(res.ects_pot_fond, 3.0);
        assert_eq!(res.ects_pot_pro, 0.0);
        assert!(!res.has_pending_scores);
        assert!(StudentResultsResponse::from_table(&table, 999).is_none());
    }

    #[test]
    fn test_results_rows_and_pagination() {
        let table = table();
        let rows = PaginationQuery { page: 1, size: 1 }.paginate(SemesterResultsResponse::rows(&table));
        let res = SemesterResultsResponse::from_table(&table, rows);
        assert_eq!(res.rows.items.len(), 1);
        assert_eq!(res.rows.items[0].student_id, STUDENT_1);
        assert_eq!(res.rows.pagination.total, 2);
        assert_eq!(res.module_codes, vec!["M1101".to_string()]);

        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["rows"]["items"][0]["rank"], "1");
    }

    #[test]
    fn test_module_stats() {
        let table = table();
        let res = ModuleStatsResponse::from_table(&table, MODULE).unwrap();
        assert_eq!(res.evaluations.len(), 2);
        assert!(!res.pending);
        assert_eq!(res.nb_notes, 2);
        assert!(ModuleStatsResponse::from_table(&table, 4242).is_none());
    }
}
