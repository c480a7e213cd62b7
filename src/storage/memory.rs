//! 内存存储
//!
//! 用于 `memory://` 部署和测试，数据放在 `DashMap` 中，进程退出即丢失。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use dashmap::DashMap;

use super::ScoreStore;
use crate::errors::{Result, ScoDocError};
use crate::models::{
    AbsenceCounts, CapitalizedUe, Enrollment, EnrollmentState, Evaluation, ModuleImplInfo, Score,
    SemesterInfo, UeInfo,
};

#[derive(Debug, Clone, Default)]
struct UeSettings {
    formula: Option<String>,
    coefficient: Option<f64>,
}

#[derive(Default)]
pub struct MemoryStorage {
    semesters: DashMap<i64, SemesterInfo>,
    /// UE 及其所属培养方案代码
    ues: DashMap<i64, (String, UeInfo)>,
    modules: DashMap<i64, ModuleImplInfo>,
    evaluations: DashMap<i64, Evaluation>,
    scores: DashMap<i64, HashMap<i64, Score>>,
    enrollments: DashMap<i64, Vec<Enrollment>>,
    module_enrollments: DashMap<i64, HashSet<i64>>,
    ue_settings: DashMap<(i64, i64), UeSettings>,
    /// 按学生索引
    capitalized: DashMap<i64, Vec<CapitalizedUe>>,
    absences: DashMap<(i64, i64), AbsenceCounts>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_semester(&self, semester: SemesterInfo) {
        self.semesters.insert(semester.id, semester);
    }

    pub fn insert_ue(&self, formation_code: &str, ue: UeInfo) {
        self.ues.insert(ue.id, (formation_code.to_string(), ue));
    }

    pub fn insert_module(&self, module: ModuleImplInfo) {
        self.modules.insert(module.id, module);
    }

    pub fn insert_evaluation(&self, evaluation: Evaluation) {
        self.evaluations.insert(evaluation.id, evaluation);
    }

    pub fn insert_score(&self, evaluation_id: i64, student_id: i64, score: Score) {
        self.scores
            .entry(evaluation_id)
            .or_default()
            .insert(student_id, score);
    }

    pub fn insert_capitalized_ue(&self, cap: CapitalizedUe) {
        self.capitalized.entry(cap.student_id).or_default().push(cap);
    }

    /// 注册学生到学期及模块，已注册时更新其状态
    pub fn enroll(&self, semester_id: i64, enrollment: Enrollment, moduleimpl_ids: &[i64]) {
        let student_id = enrollment.student_id;
        {
            let mut list = self.enrollments.entry(semester_id).or_default();
            match list.iter_mut().find(|e| e.student_id == student_id) {
                Some(existing) => *existing = enrollment,
                None => list.push(enrollment),
            }
        }
        for moduleimpl_id in moduleimpl_ids {
            self.module_enrollments
                .entry(*moduleimpl_id)
                .or_default()
                .insert(student_id);
        }
    }

    pub fn set_absences(&self, semester_id: i64, student_id: i64, counts: AbsenceCounts) {
        self.absences.insert((semester_id, student_id), counts);
    }

    fn enrolled_ids(&self, semester_id: i64) -> HashSet<i64> {
        self.enrollments
            .get(&semester_id)
            .map(|list| list.iter().map(|e| e.student_id).collect())
            .unwrap_or_default()
    }

    fn capitalizes(&self, source_id: i64, target: &SemesterInfo) -> bool {
        self.semesters
            .get(&source_id)
            .is_some_and(|source| source.capitalizes_into(target))
    }

    fn require_semester(&self, semester_id: i64) -> Result<SemesterInfo> {
        self.semesters
            .get(&semester_id)
            .map(|s| s.clone())
            .ok_or_else(|| ScoDocError::not_found(format!("semester {semester_id} not found")))
    }
}

#[async_trait]
impl ScoreStore for MemoryStorage {
    async fn get_semester(&self, semester_id: i64) -> Result<Option<SemesterInfo>> {
        Ok(self.semesters.get(&semester_id).map(|s| s.clone()))
    }

    async fn list_ues(&self, semester_id: i64) -> Result<Vec<UeInfo>> {
        let semester = self.require_semester(semester_id)?;
        let mut ues: Vec<UeInfo> = self
            .ues
            .iter()
            .filter(|entry| entry.value().0 == semester.formation_code)
            .map(|entry| entry.value().1.clone())
            .collect();
        ues.sort_by_key(|ue| (ue.numero, ue.id));
        Ok(ues)
    }

    async fn list_modules(&self, semester_id: i64) -> Result<Vec<ModuleImplInfo>> {
        let mut modules: Vec<ModuleImplInfo> = self
            .modules
            .iter()
            .filter(|m| m.semester_id == semester_id)
            .map(|m| m.clone())
            .collect();
        modules.sort_by_key(|m| (m.numero, m.id));
        Ok(modules)
    }

    async fn get_module(&self, moduleimpl_id: i64) -> Result<Option<ModuleImplInfo>> {
        Ok(self.modules.get(&moduleimpl_id).map(|m| m.clone()))
    }

    async fn get_ue_formulas(&self, semester_id: i64) -> Result<HashMap<i64, String>> {
        Ok(self
            .ue_settings
            .iter()
            .filter(|entry| entry.key().0 == semester_id)
            .filter_map(|entry| entry.formula.clone().map(|f| (entry.key().1, f)))
            .collect())
    }

    async fn get_ue_coefficients(&self, semester_id: i64) -> Result<HashMap<i64, f64>> {
        Ok(self
            .ue_settings
            .iter()
            .filter(|entry| entry.key().0 == semester_id)
            .filter_map(|entry| entry.coefficient.map(|c| (entry.key().1, c)))
            .collect())
    }

    async fn list_evaluations(&self, moduleimpl_id: i64) -> Result<Vec<Evaluation>> {
        let mut evaluations: Vec<Evaluation> = self
            .evaluations
            .iter()
            .filter(|e| e.moduleimpl_id == moduleimpl_id)
            .map(|e| e.clone())
            .collect();
        evaluations.sort_by_key(|e| (e.numero, e.id));
        Ok(evaluations)
    }

    async fn get_evaluation(&self, evaluation_id: i64) -> Result<Option<Evaluation>> {
        Ok(self.evaluations.get(&evaluation_id).map(|e| e.clone()))
    }

    async fn get_scores(&self, evaluation_id: i64) -> Result<HashMap<i64, Score>> {
        Ok(self
            .scores
            .get(&evaluation_id)
            .map(|s| s.clone())
            .unwrap_or_default())
    }

    async fn list_enrolled(&self, semester_id: i64) -> Result<Vec<Enrollment>> {
        Ok(self
            .enrollments
            .get(&semester_id)
            .map(|list| list.clone())
            .unwrap_or_default())
    }

    async fn list_module_enrolled(&self, moduleimpl_id: i64) -> Result<HashSet<i64>> {
        Ok(self
            .module_enrollments
            .get(&moduleimpl_id)
            .map(|s| s.clone())
            .unwrap_or_default())
    }

    async fn list_capitalized_ues(&self, semester_id: i64) -> Result<Vec<CapitalizedUe>> {
        let target = self.require_semester(semester_id)?;
        let mut caps = Vec::new();
        for student_id in self.enrolled_ids(semester_id) {
            let Some(list) = self.capitalized.get(&student_id) else {
                continue;
            };
            caps.extend(
                list.iter()
                    .filter(|cap| match cap.source_semester_id {
                        Some(source_id) => self.capitalizes(source_id, &target),
                        None => cap.is_external,
                    })
                    .cloned(),
            );
        }
        caps.sort_by_key(|cap| (cap.student_id, cap.event_date));
        Ok(caps)
    }

    async fn list_semesters_using_capitalized_ues_from(
        &self,
        semester_id: i64,
    ) -> Result<Vec<i64>> {
        let Some(source) = self.get_semester(semester_id).await? else {
            return Ok(Vec::new());
        };
        let targets: Vec<SemesterInfo> = self
            .semesters
            .iter()
            .filter(|t| source.capitalizes_into(t.value()))
            .map(|t| t.clone())
            .collect();

        let mut ids = Vec::new();
        for target in targets {
            let uses_source = self.enrolled_ids(target.id).into_iter().any(|student_id| {
                self.capitalized.get(&student_id).is_some_and(|list| {
                    list.iter()
                        .any(|cap| cap.source_semester_id == Some(semester_id))
                })
            });
            if uses_source {
                ids.push(target.id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    async fn get_absence_counts(&self, semester_id: i64) -> Result<HashMap<i64, AbsenceCounts>> {
        Ok(self
            .absences
            .iter()
            .filter(|entry| entry.key().0 == semester_id)
            .map(|entry| (entry.key().1, *entry.value()))
            .collect())
    }

    async fn save_scores(
        &self,
        evaluation_id: i64,
        scores: &[(i64, Option<Score>)],
    ) -> Result<usize> {
        if !self.evaluations.contains_key(&evaluation_id) {
            return Err(ScoDocError::not_found(format!(
                "evaluation {evaluation_id} not found"
            )));
        }
        let mut stored = self.scores.entry(evaluation_id).or_default();
        let mut changed = 0;
        for (student_id, score) in scores {
            let previous = match score {
                Some(score) => stored.insert(*student_id, *score),
                None => stored.remove(student_id),
            };
            if previous != *score {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn set_evaluation_coefficient(
        &self,
        evaluation_id: i64,
        coefficient: f64,
    ) -> Result<bool> {
        Ok(self
            .evaluations
            .get_mut(&evaluation_id)
            .map(|mut e| e.coefficient = coefficient)
            .is_some())
    }

    async fn set_module_coefficient(&self, moduleimpl_id: i64, coefficient: f64) -> Result<bool> {
        Ok(self
            .modules
            .get_mut(&moduleimpl_id)
            .map(|mut m| m.coefficient = coefficient)
            .is_some())
    }

    async fn set_module_formula(
        &self,
        moduleimpl_id: i64,
        formula: Option<String>,
    ) -> Result<bool> {
        Ok(self
            .modules
            .get_mut(&moduleimpl_id)
            .map(|mut m| m.formula = formula)
            .is_some())
    }

    async fn set_ue_formula(
        &self,
        semester_id: i64,
        ue_id: i64,
        formula: Option<String>,
    ) -> Result<()> {
        self.ue_settings
            .entry((semester_id, ue_id))
            .or_default()
            .formula = formula;
        Ok(())
    }

    async fn set_ue_coefficient(
        &self,
        semester_id: i64,
        ue_id: i64,
        coefficient: Option<f64>,
    ) -> Result<()> {
        self.ue_settings
            .entry((semester_id, ue_id))
            .or_default()
            .coefficient = coefficient;
        Ok(())
    }

    async fn set_enrollment_state(
        &self,
        semester_id: i64,
        student_id: i64,
        state: EnrollmentState,
    ) -> Result<bool> {
        let Some(mut list) = self.enrollments.get_mut(&semester_id) else {
            return Ok(false);
        };
        Ok(list
            .iter_mut()
            .find(|e| e.student_id == student_id)
            .map(|e| e.state = state)
            .is_some())
    }

    async fn enroll_student(
        &self,
        semester_id: i64,
        enrollment: Enrollment,
        moduleimpl_ids: &[i64],
    ) -> Result<()> {
        self.require_semester(semester_id)?;
        self.enroll(semester_id, enrollment, moduleimpl_ids);
        Ok(())
    }
}
