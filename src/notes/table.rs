//! 学期成绩表
//!
//! `NotesTable` 构建后不可变，只提供只读访问。

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{Result, ScoDocError};
use crate::models::{
    Average, CapitalizedUe, Diagnostic, Enrollment, EnrollmentState, ModuleImplInfo, Rank,
    SemesterInfo, UeInfo, UeType,
};
use crate::notes::NotesSettings;
use crate::notes::loader::SemesterData;
use crate::notes::module_averager::{EvaluationState, ModuleAverager, ModuleResult};
use crate::notes::ranking::{self, RankTable};
use crate::notes::semester_averager::{GeneralAverage, SemesterAverager};
use crate::notes::ue_averager::{UeAverager, UeInput, UeStatus};

/// 一组平均分的统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortStats {
    pub moy: Average,
    pub min: Average,
    pub max: Average,
    /// 数值平均的个数
    pub nb_moy: usize,
}

impl CohortStats {
    fn from_values(values: impl IntoIterator<Item = Average>) -> Self {
        let numeric: Vec<f64> = values.into_iter().filter_map(|a| a.value()).collect();
        if numeric.is_empty() {
            return Self::default();
        }
        let sum: f64 = numeric.iter().sum();
        Self {
            moy: Average::Numeric(sum / numeric.len() as f64),
            min: Average::Numeric(numeric.iter().copied().fold(f64::INFINITY, f64::min)),
            max: Average::Numeric(numeric.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            nb_moy: numeric.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleStats {
    pub moy: Average,
    pub min: Average,
    pub max: Average,
    pub nb_notes: usize,
    pub nb_missing: usize,
    pub nb_valid_evals: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemesterStats {
    /// 在读学生总平均的平均
    pub moy_moy: Average,
    /// 权重和为正的学生中的最低/最高总平均
    pub moy_min: Average,
    pub moy_max: Average,
    pub nb_enrolled: usize,
    pub nb_withdrawn: usize,
    pub nb_failing: usize,
}

/// 排序表中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub student_id: i64,
    pub general: Average,
    /// 与 `get_ues()` 顺序一致
    pub ues: Vec<Average>,
    /// 与 `get_modimpls(None)` 顺序一致
    pub modules: Vec<Average>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesTable {
    semester: SemesterInfo,
    ues: Vec<UeInfo>,
    modimpls: Vec<ModuleImplInfo>,
    enrollments: Vec<Enrollment>,
    modules: BTreeMap<i64, ModuleResult>,
    ue_status: BTreeMap<i64, BTreeMap<i64, UeStatus>>,
    general: BTreeMap<i64, GeneralAverage>,
    ranks: RankTable,
    ue_ranks: BTreeMap<i64, RankTable>,
    mod_ranks: BTreeMap<i64, RankTable>,
    sorted_students: Vec<i64>,
    module_stats: BTreeMap<i64, ModuleStats>,
    ue_stats: BTreeMap<i64, CohortStats>,
    semester_stats: SemesterStats,
    diagnostics: Vec<Diagnostic>,
    built_at: DateTime<Utc>,
}

impl NotesTable {
    /// 由原始数据计算成绩表
    ///
    /// 结构不一致（模块没有所属 UE、模块不属于该学期、资本化系数无法确定）时返回错误，
    /// 其余数据或公式问题只影响单个值，记录在 `diagnostics()` 中。
    pub fn compute(data: SemesterData, settings: &NotesSettings) -> Result<Self> {
        let started = Instant::now();
        let SemesterData {
            semester,
            ues,
            modules: mut modimpls,
            evaluations,
            scores,
            mut enrollments,
            module_enrollments,
            ue_formulas,
            ue_coefficients,
            capitalized,
            absences,
        } = data;

        enrollments.sort_by(|a, b| {
            a.sort_name
                .cmp(&b.sort_name)
                .then(a.student_id.cmp(&b.student_id))
        });
        let students: Vec<i64> = enrollments.iter().map(|e| e.student_id).collect();
        let semester_students: BTreeSet<i64> = students.iter().copied().collect();
        let states: HashMap<i64, EnrollmentState> = enrollments
            .iter()
            .map(|e| (e.student_id, e.state))
            .collect();
        let alpha_order: HashMap<i64, usize> = students
            .iter()
            .enumerate()
            .map(|(position, &id)| (id, position))
            .collect();

        for module in &modimpls {
            if module.semester_id != semester.id {
                return Err(ScoDocError::structure(format!(
                    "module {} belongs to semester {}, not {}",
                    module.id, module.semester_id, semester.id
                )));
            }
            if !ues.iter().any(|ue| ue.id == module.ue_id) {
                return Err(ScoDocError::structure(format!(
                    "module {} references unknown UE {}",
                    module.id, module.ue_id
                )));
            }
        }

        // 只保留有模块的 UE
        let mut ues: Vec<UeInfo> = ues
            .into_iter()
            .filter(|ue| modimpls.iter().any(|m| m.ue_id == ue.id))
            .collect();
        ues.sort_by_key(|ue| (ue.numero, ue.id));
        let ue_position: HashMap<i64, usize> =
            ues.iter().enumerate().map(|(i, ue)| (ue.id, i)).collect();
        modimpls.sort_by_key(|m| (ue_position.get(&m.ue_id).copied(), m.numero, m.id));

        let mut diagnostics = Vec::new();

        // 模块
        let mut modules = BTreeMap::new();
        for module in &modimpls {
            let enrolled: BTreeSet<i64> = module_enrollments
                .get(&module.id)
                .map(|set| {
                    set.iter()
                        .filter(|id| semester_students.contains(id))
                        .copied()
                        .collect()
                })
                .unwrap_or_default();
            let result = ModuleAverager::compute(
                module,
                evaluations.get(&module.id).map(Vec::as_slice).unwrap_or_default(),
                &scores,
                &enrolled,
                &absences,
            );
            diagnostics.extend(result.diagnostics.iter().cloned());
            modules.insert(module.id, result);
        }

        // UE
        let mut caps_by_student: HashMap<i64, Vec<&CapitalizedUe>> = HashMap::new();
        for cap in capitalized
            .iter()
            .filter(|c| semester_students.contains(&c.student_id))
        {
            caps_by_student.entry(cap.student_id).or_default().push(cap);
        }

        let mut ue_status: BTreeMap<i64, BTreeMap<i64, UeStatus>> = BTreeMap::new();
        for ue in &ues {
            let input = UeInput {
                ue,
                modules: modimpls
                    .iter()
                    .filter(|m| m.ue_id == ue.id)
                    .filter_map(|m| modules.get(&m.id).map(|r| (m, r)))
                    .collect(),
                formula: ue_formulas.get(&ue.id).map(String::as_str),
                manual_coefficient: ue_coefficients.get(&ue.id).copied(),
                absences: &absences,
            };
            let computed = UeAverager::compute(
                &input,
                &students,
                &caps_by_student,
                semester.block_moyennes,
                settings,
            )?;
            diagnostics.extend(computed.diagnostics);
            for (student_id, status) in computed.statuses {
                ue_status.entry(student_id).or_default().insert(ue.id, status);
            }
        }

        // 总平均
        let no_status = BTreeMap::new();
        let general: BTreeMap<i64, GeneralAverage> = students
            .iter()
            .map(|&id| {
                let statuses = ue_status.get(&id).unwrap_or(&no_status);
                (id, SemesterAverager::compute(&semester, &ues, statuses, settings))
            })
            .collect();

        // 名次：退学学生不参与
        let rankable: Vec<i64> = students
            .iter()
            .copied()
            .filter(|id| states.get(id) != Some(&EnrollmentState::Withdrawn))
            .collect();
        let precision = settings.rank_precision;
        let ranks = ranking::compute_ranks(
            rankable.iter().map(|&id| (id, general[&id].average)).collect(),
            &alpha_order,
            precision,
        );
        let ue_ranks: BTreeMap<i64, RankTable> = ues
            .iter()
            .filter(|ue| ue.ue_type != UeType::Sport)
            .map(|ue| {
                let entries = rankable
                    .iter()
                    .filter_map(|id| {
                        ue_status
                            .get(id)
                            .and_then(|s| s.get(&ue.id))
                            .map(|s| (*id, s.counted_average()))
                    })
                    .collect();
                (ue.id, ranking::compute_ranks(entries, &alpha_order, precision))
            })
            .collect();
        let mod_ranks: BTreeMap<i64, RankTable> = modules
            .iter()
            .map(|(&modimpl_id, result)| {
                let entries = rankable
                    .iter()
                    .filter_map(|id| result.averages.get(id).map(|avg| (*id, *avg)))
                    .collect();
                (modimpl_id, ranking::compute_ranks(entries, &alpha_order, precision))
            })
            .collect();

        // 排序：总平均降序，退学学生放最后
        let mut sorted: Vec<(i64, Average)> = students
            .iter()
            .map(|&id| (id, general[&id].average))
            .collect();
        ranking::sort_by_average(&mut sorted, &alpha_order);
        sorted.sort_by_key(|(id, _)| states.get(id) == Some(&EnrollmentState::Withdrawn));
        let sorted_students = sorted.into_iter().map(|(id, _)| id).collect();

        // 统计：只统计在读学生
        let enrolled_ids: Vec<i64> = students
            .iter()
            .copied()
            .filter(|id| states.get(id) == Some(&EnrollmentState::Enrolled))
            .collect();
        let module_stats = modules
            .iter()
            .map(|(&modimpl_id, result)| {
                let values: Vec<Average> = enrolled_ids
                    .iter()
                    .filter_map(|id| result.averages.get(id).copied())
                    .collect();
                let nb_missing = values.iter().filter(|a| !a.is_numeric()).count();
                let stats = CohortStats::from_values(values);
                (
                    modimpl_id,
                    ModuleStats {
                        moy: stats.moy,
                        min: stats.min,
                        max: stats.max,
                        nb_notes: stats.nb_moy,
                        nb_missing,
                        nb_valid_evals: result.usable_evaluation_ids().len(),
                    },
                )
            })
            .collect();
        let ue_stats = ues
            .iter()
            .map(|ue| {
                let values = enrolled_ids.iter().filter_map(|id| {
                    ue_status
                        .get(id)
                        .and_then(|s| s.get(&ue.id))
                        .map(UeStatus::counted_average)
                });
                (ue.id, CohortStats::from_values(values))
            })
            .collect();
        let overall = CohortStats::from_values(enrolled_ids.iter().map(|id| general[id].average));
        let weighted = CohortStats::from_values(
            enrolled_ids
                .iter()
                .map(|id| &general[id])
                .filter(|g| g.sum_coefs > 0.0)
                .map(|g| g.average),
        );
        let semester_stats = SemesterStats {
            moy_moy: overall.moy,
            moy_min: weighted.min,
            moy_max: weighted.max,
            nb_enrolled: enrolled_ids.len(),
            nb_withdrawn: count_state(&states, EnrollmentState::Withdrawn),
            nb_failing: count_state(&states, EnrollmentState::Failing),
        };

        info!(
            "NotesTable for semester {} built in {} ms ({} students, {} modules, {} diagnostics)",
            semester.id,
            started.elapsed().as_millis(),
            students.len(),
            modimpls.len(),
            diagnostics.len()
        );

        Ok(Self {
            semester,
            ues,
            modimpls,
            enrollments,
            modules,
            ue_status,
            general,
            ranks,
            ue_ranks,
            mod_ranks,
            sorted_students,
            module_stats,
            ue_stats,
            semester_stats,
            diagnostics,
            built_at: Utc::now(),
        })
    }

    pub fn semester(&self) -> &SemesterInfo {
        &self.semester
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// 有模块的 UE，按编号排序
    pub fn get_ues(&self) -> &[UeInfo] {
        &self.ues
    }

    /// 过滤后的 UE
    ///
    /// `filter_sport` 时去掉运动 UE。给出学生时，只保留该学生有模块平均或已资本化的 UE。
    pub fn get_ues_filtered(&self, filter_sport: bool, student_id: Option<i64>) -> Vec<&UeInfo> {
        self.ues
            .iter()
            .filter(|ue| !(filter_sport && ue.ue_type == UeType::Sport))
            .filter(|ue| {
                let Some(student_id) = student_id else {
                    return true;
                };
                self.get_etud_ue_status(student_id, ue.id)
                    .is_some_and(|s| s.is_capitalized)
                    || self
                        .get_modimpls(Some(ue.id))
                        .iter()
                        .any(|m| self.get_etud_mod_moy(m.id, student_id).value().is_some())
            })
            .collect()
    }

    /// 全部模块，或某个 UE 的模块
    pub fn get_modimpls(&self, ue_id: Option<i64>) -> Vec<&ModuleImplInfo> {
        self.modimpls
            .iter()
            .filter(|m| ue_id.is_none_or(|id| m.ue_id == id))
            .collect()
    }

    /// 学生 id；`sorted` 时按总平均排序，否则按姓名
    pub fn get_etudids(&self, sorted: bool) -> Vec<i64> {
        if sorted {
            self.sorted_students.clone()
        } else {
            self.enrollments.iter().map(|e| e.student_id).collect()
        }
    }

    pub fn get_etud_etat(&self, student_id: i64) -> Option<EnrollmentState> {
        self.enrollments
            .iter()
            .find(|e| e.student_id == student_id)
            .map(|e| e.state)
    }

    pub fn get_etud_moy_gen(&self, student_id: i64) -> Average {
        self.general
            .get(&student_id)
            .map(|g| g.average)
            .unwrap_or(Average::NotEnrolled)
    }

    /// 总平均及其明细（系数和、ECTS、加分）
    pub fn get_etud_moy_infos(&self, student_id: i64) -> Option<&GeneralAverage> {
        self.general.get(&student_id)
    }

    pub fn get_etud_ue_status(&self, student_id: i64, ue_id: i64) -> Option<&UeStatus> {
        self.ue_status.get(&student_id).and_then(|s| s.get(&ue_id))
    }

    pub fn get_etud_mod_moy(&self, moduleimpl_id: i64, student_id: i64) -> Average {
        self.modules
            .get(&moduleimpl_id)
            .map(|r| r.average(student_id))
            .unwrap_or(Average::NotEnrolled)
    }

    pub fn get_etud_rang(&self, student_id: i64) -> Option<Rank> {
        self.ranks.get(student_id)
    }

    /// 参与排名的学生数
    pub fn rank_size(&self) -> usize {
        self.ranks.size
    }

    pub fn get_etud_ue_rang(&self, ue_id: i64, student_id: i64) -> Option<Rank> {
        self.ue_ranks.get(&ue_id).and_then(|t| t.get(student_id))
    }

    pub fn get_etud_mod_rang(&self, moduleimpl_id: i64, student_id: i64) -> Option<Rank> {
        self.mod_ranks
            .get(&moduleimpl_id)
            .and_then(|t| t.get(student_id))
    }

    pub fn get_mod_stats(&self, moduleimpl_id: i64) -> Option<&ModuleStats> {
        self.module_stats.get(&moduleimpl_id)
    }

    pub fn get_ue_stats(&self, ue_id: i64) -> Option<&CohortStats> {
        self.ue_stats.get(&ue_id)
    }

    pub fn semester_stats(&self) -> &SemesterStats {
        &self.semester_stats
    }

    pub fn get_mod_result(&self, moduleimpl_id: i64) -> Option<&ModuleResult> {
        self.modules.get(&moduleimpl_id)
    }

    pub fn get_evaluations_etats(&self, moduleimpl_id: i64) -> &[EvaluationState] {
        self.modules
            .get(&moduleimpl_id)
            .map(|r| r.evaluations.as_slice())
            .unwrap_or_default()
    }

    /// 学生在系数非零的评测中是否有待定成绩
    pub fn etud_has_notes_attente(&self, student_id: i64) -> bool {
        self.modules
            .values()
            .any(|r| r.pending_students.contains(&student_id))
    }

    /// 存在等待中评测的模块
    pub fn get_moduleimpls_attente(&self) -> Vec<&ModuleImplInfo> {
        self.modimpls
            .iter()
            .filter(|m| self.modules.get(&m.id).is_some_and(|r| r.pending))
            .collect()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// 按总平均排序的整张表
    pub fn get_table_moyennes_triees(&self) -> Vec<TableRow> {
        self.sorted_students
            .iter()
            .map(|&student_id| TableRow {
                student_id,
                general: self.get_etud_moy_gen(student_id),
                ues: self
                    .ues
                    .iter()
                    .map(|ue| {
                        self.get_etud_ue_status(student_id, ue.id)
                            .map(|s| s.moy)
                            .unwrap_or(Average::NotAvailable)
                    })
                    .collect(),
                modules: self
                    .modimpls
                    .iter()
                    .map(|m| self.get_etud_mod_moy(m.id, student_id))
                    .collect(),
            })
            .collect()
    }
}

fn count_state(states: &HashMap<i64, EnrollmentState>, state: EnrollmentState) -> usize {
    states.values().filter(|s| **s == state).count()
}
