//! 写路径
//!
//! 每个修改都经过 `mutate_and_invalidate`：先确定所属学期，执行修改，
//! 然后使该学期（及资本化了它的学期）的缓存失效。

use std::future::Future;
use std::sync::Arc;

use tracing::info;

use crate::errors::{Result, ScoDocError};
use crate::models::{Enrollment, EnrollmentState, Evaluation, ModuleImplInfo, Score};
use crate::notes::cache::{RequestScope, ResultCache};
use crate::notes::formula::{Formula, MAX_FORMULA_LENGTH};
use crate::storage::ScoreStore;

pub struct NotesWriter {
    cache: Arc<ResultCache>,
}

impl NotesWriter {
    pub fn new(cache: Arc<ResultCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    fn store(&self) -> &Arc<dyn ScoreStore> {
        self.cache.store()
    }

    /// 执行修改并使学期缓存失效；修改失败时同样失效，避免部分写入后缓存不一致
    pub async fn mutate_and_invalidate<T, F, Fut>(
        &self,
        scope: &RequestScope,
        semester_id: i64,
        mutation: F,
    ) -> Result<T>
    where
        F: FnOnce(Arc<dyn ScoreStore>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let outcome = mutation(self.store().clone()).await;
        self.cache.invalidate(scope, Some(semester_id)).await?;
        outcome
    }

    async fn evaluation(&self, evaluation_id: i64) -> Result<Evaluation> {
        self.store()
            .get_evaluation(evaluation_id)
            .await?
            .ok_or_else(|| ScoDocError::not_found(format!("evaluation {evaluation_id} not found")))
    }

    async fn module(&self, moduleimpl_id: i64) -> Result<ModuleImplInfo> {
        self.store()
            .get_module(moduleimpl_id)
            .await?
            .ok_or_else(|| ScoDocError::not_found(format!("module {moduleimpl_id} not found")))
    }

    async fn require_semester(&self, semester_id: i64) -> Result<()> {
        match self.store().get_semester(semester_id).await? {
            Some(_) => Ok(()),
            None => Err(ScoDocError::not_found(format!(
                "semester {semester_id} not found"
            ))),
        }
    }

    fn check_coefficient(coefficient: f64) -> Result<()> {
        if coefficient.is_finite() && coefficient >= 0.0 {
            Ok(())
        } else {
            Err(ScoDocError::validation(format!(
                "invalid coefficient {coefficient}"
            )))
        }
    }

    /// 空字符串视为清除；其余在存储前校验
    fn normalize_formula(formula: Option<String>) -> Result<Option<String>> {
        match formula {
            Some(source) if !source.trim().is_empty() => {
                if source.len() > MAX_FORMULA_LENGTH {
                    return Err(ScoDocError::validation(format!(
                        "formula longer than {MAX_FORMULA_LENGTH} bytes"
                    )));
                }
                Formula::validate(&source)?;
                Ok(Some(source.trim().to_string()))
            }
            _ => Ok(None),
        }
    }

    /// 保存一个评测的成绩，`None` 表示删除；返回变更的条数
    pub async fn save_scores(
        &self,
        scope: &RequestScope,
        evaluation_id: i64,
        scores: Vec<(i64, Option<Score>)>,
    ) -> Result<usize> {
        let evaluation = self.evaluation(evaluation_id).await?;
        for (student_id, score) in &scores {
            if let Some(Score::Numeric(v)) = score {
                if !v.is_finite() || *v < 0.0 || *v > evaluation.max_score {
                    return Err(ScoDocError::validation(format!(
                        "score {v} of student {student_id} is outside [0, {}]",
                        evaluation.max_score
                    )));
                }
            }
        }
        let module = self.module(evaluation.moduleimpl_id).await?;
        let changed = self
            .mutate_and_invalidate(scope, module.semester_id, |store| async move {
                store.save_scores(evaluation_id, &scores).await
            })
            .await?;
        info!(
            "Saved scores of evaluation {}: {} changed",
            evaluation_id, changed
        );
        Ok(changed)
    }

    pub async fn set_evaluation_coefficient(
        &self,
        scope: &RequestScope,
        evaluation_id: i64,
        coefficient: f64,
    ) -> Result<()> {
        Self::check_coefficient(coefficient)?;
        let evaluation = self.evaluation(evaluation_id).await?;
        let module = self.module(evaluation.moduleimpl_id).await?;
        self.mutate_and_invalidate(scope, module.semester_id, |store| async move {
            store
                .set_evaluation_coefficient(evaluation_id, coefficient)
                .await
                .map(|_| ())
        })
        .await
    }

    pub async fn set_module_coefficient(
        &self,
        scope: &RequestScope,
        moduleimpl_id: i64,
        coefficient: f64,
    ) -> Result<()> {
        Self::check_coefficient(coefficient)?;
        let module = self.module(moduleimpl_id).await?;
        self.mutate_and_invalidate(scope, module.semester_id, |store| async move {
            store
                .set_module_coefficient(moduleimpl_id, coefficient)
                .await
                .map(|_| ())
        })
        .await
    }

    pub async fn set_module_formula(
        &self,
        scope: &RequestScope,
        moduleimpl_id: i64,
        formula: Option<String>,
    ) -> Result<()> {
        let formula = Self::normalize_formula(formula)?;
        let module = self.module(moduleimpl_id).await?;
        self.mutate_and_invalidate(scope, module.semester_id, |store| async move {
            store
                .set_module_formula(moduleimpl_id, formula)
                .await
                .map(|_| ())
        })
        .await
    }

    pub async fn set_ue_formula(
        &self,
        scope: &RequestScope,
        semester_id: i64,
        ue_id: i64,
        formula: Option<String>,
    ) -> Result<()> {
        let formula = Self::normalize_formula(formula)?;
        self.require_semester(semester_id).await?;
        if !self
            .store()
            .list_ues(semester_id)
            .await?
            .iter()
            .any(|ue| ue.id == ue_id)
        {
            return Err(ScoDocError::not_found(format!(
                "UE {ue_id} not found in semester {semester_id}"
            )));
        }
        self.mutate_and_invalidate(scope, semester_id, |store| async move {
            store.set_ue_formula(semester_id, ue_id, formula).await
        })
        .await
    }

    /// 本学期为资本化 UE 手动设定系数，`None` 表示恢复默认
    pub async fn set_ue_capitalization_coefficient(
        &self,
        scope: &RequestScope,
        semester_id: i64,
        ue_id: i64,
        coefficient: Option<f64>,
    ) -> Result<()> {
        if let Some(c) = coefficient {
            Self::check_coefficient(c)?;
        }
        self.require_semester(semester_id).await?;
        self.mutate_and_invalidate(scope, semester_id, |store| async move {
            store.set_ue_coefficient(semester_id, ue_id, coefficient).await
        })
        .await
    }

    pub async fn set_enrollment_state(
        &self,
        scope: &RequestScope,
        semester_id: i64,
        student_id: i64,
        state: EnrollmentState,
    ) -> Result<()> {
        let updated = self
            .mutate_and_invalidate(scope, semester_id, |store| async move {
                store
                    .set_enrollment_state(semester_id, student_id, state)
                    .await
            })
            .await?;
        if !updated {
            return Err(ScoDocError::not_found(format!(
                "student {student_id} is not enrolled in semester {semester_id}"
            )));
        }
        Ok(())
    }

    /// 批量注册，失效请求在结束时统一执行一次
    pub async fn enroll_students(
        &self,
        scope: &RequestScope,
        semester_id: i64,
        enrollments: Vec<(Enrollment, Vec<i64>)>,
    ) -> Result<usize> {
        self.require_semester(semester_id).await?;
        let owns_batch = scope.begin_deferred();
        let mut count = 0;
        let mut failure = None;
        for (enrollment, moduleimpl_ids) in enrollments {
            let result = self
                .mutate_and_invalidate(scope, semester_id, |store| async move {
                    store
                        .enroll_student(semester_id, enrollment, &moduleimpl_ids)
                        .await
                })
                .await;
            if let Err(e) = result {
                failure = Some(e);
                break;
            }
            count += 1;
        }
        if owns_batch {
            self.cache.run_deferred(scope).await?;
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::object_cache::moka::MokaCacheWrapper;
    use crate::models::Average;
    use crate::notes::NotesSettings;
    use crate::notes::fixtures::{self, EVAL_1, EVAL_2, MODULE, SEMESTER, STUDENT_1, STUDENT_2, UE};

    fn writer() -> NotesWriter {
        let storage = Arc::new(fixtures::sample_storage());
        let backend = Arc::new(MokaCacheWrapper::with_settings(1000));
        NotesWriter::new(Arc::new(ResultCache::new(
            backend,
            storage,
            "DEPT",
            NotesSettings::default(),
        )))
    }

    fn close(a: Average, b: f64) {
        let v = a.value().unwrap_or(f64::NAN);
        assert!((v - b).abs() < 1e-3, "{a:?} != {b}");
    }

    #[tokio::test]
    async fn test_save_scores_invalidates() {
        let writer = writer();
        let scope = RequestScope::new();
        let before = writer.cache().get(&scope, SEMESTER).await.unwrap();
        close(before.get_etud_mod_moy(MODULE, STUDENT_1), 12.667);

        writer
            .save_scores(&scope, EVAL_1, vec![(STUDENT_1, Some(Score::Absent))])
            .await
            .unwrap();
        let after = writer.cache().get(&scope, SEMESTER).await.unwrap();
        close(after.get_etud_mod_moy(MODULE, STUDENT_1), 8.667);
        close(after.get_etud_moy_gen(STUDENT_1), 8.667);
    }

    #[tokio::test]
    async fn test_excused_and_removed_scores() {
        let writer = writer();
        let scope = RequestScope::new();
        writer
            .save_scores(&scope, EVAL_1, vec![(STUDENT_1, Some(Score::Excused))])
            .await
            .unwrap();
        let table = writer.cache().get(&scope, SEMESTER).await.unwrap();
        close(table.get_etud_mod_moy(MODULE, STUDENT_1), 13.0);

        writer
            .save_scores(&scope, EVAL_2, vec![(STUDENT_2, None)])
            .await
            .unwrap();
        // 评测 2 不再完整，只用评测 1
        let table = writer.cache().get(&scope, SEMESTER).await.unwrap();
        close(table.get_etud_mod_moy(MODULE, STUDENT_2), 6.0);
        assert_eq!(table.get_etud_mod_moy(MODULE, STUDENT_1), Average::NotAvailable);
    }

    #[tokio::test]
    async fn test_score_validation() {
        let writer = writer();
        let scope = RequestScope::new();
        let err = writer
            .save_scores(&scope, EVAL_1, vec![(STUDENT_1, Some(Score::Numeric(21.0)))])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E007");
        let err = writer
            .save_scores(&scope, 999, vec![(STUDENT_1, Some(Score::Absent))])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E008");
    }

    #[tokio::test]
    async fn test_coefficient_changes() {
        let writer = writer();
        let scope = RequestScope::new();
        writer.cache().get(&scope, SEMESTER).await.unwrap();
        writer
            .set_evaluation_coefficient(&scope, EVAL_2, 0.0)
            .await
            .unwrap();
        let table = writer.cache().get(&scope, SEMESTER).await.unwrap();
        close(table.get_etud_mod_moy(MODULE, STUDENT_1), 12.0);

        let err = writer
            .set_module_coefficient(&scope, MODULE, -1.0)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E007");
    }

    #[tokio::test]
    async fn test_formula_validated_before_storage() {
        let writer = writer();
        let scope = RequestScope::new();
        let err = writer
            .set_module_formula(&scope, MODULE, Some("__import__('os')".into()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E012");

        let nested = format!("{}moy{}", "(".repeat(1500), ")".repeat(1500));
        let err = writer
            .set_module_formula(&scope, MODULE, Some(nested))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E007");

        let nested = format!("{}moy{}", "(".repeat(100), ")".repeat(100));
        let err = writer
            .set_ue_formula(&scope, SEMESTER, UE, Some(nested))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "expression too deeply nested");

        writer
            .set_module_formula(&scope, MODULE, Some("max(notes)".into()))
            .await
            .unwrap();
        let table = writer.cache().get(&scope, SEMESTER).await.unwrap();
        close(table.get_etud_mod_moy(MODULE, STUDENT_1), 13.0);

        writer
            .set_ue_formula(&scope, SEMESTER, UE, Some("moy - 1".into()))
            .await
            .unwrap();
        let table = writer.cache().get(&scope, SEMESTER).await.unwrap();
        close(table.get_etud_ue_status(STUDENT_1, UE).unwrap().moy, 12.0);

        // 清除公式
        writer.set_module_formula(&scope, MODULE, Some("  ".into())).await.unwrap();
        writer.set_ue_formula(&scope, SEMESTER, UE, None).await.unwrap();
        let table = writer.cache().get(&scope, SEMESTER).await.unwrap();
        close(table.get_etud_mod_moy(MODULE, STUDENT_1), 12.667);
    }

    #[tokio::test]
    async fn test_enrollment_changes() {
        let writer = writer();
        let scope = RequestScope::new();
        writer
            .set_enrollment_state(&scope, SEMESTER, STUDENT_1, EnrollmentState::Withdrawn)
            .await
            .unwrap();
        let table = writer.cache().get(&scope, SEMESTER).await.unwrap();
        assert!(table.get_etud_rang(STUDENT_1).is_none());

        let err = writer
            .set_enrollment_state(&scope, SEMESTER, 999, EnrollmentState::Withdrawn)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E008");

        let count = writer
            .enroll_students(
                &scope,
                SEMESTER,
                (3..6)
                    .map(|id| {
                        (
                            Enrollment {
                                student_id: id,
                                state: EnrollmentState::Enrolled,
                                sort_name: format!("GAMMA {id}"),
                            },
                            vec![MODULE],
                        )
                    })
                    .collect(),
            )
            .await
            .unwrap();
        assert_eq!(count, 3);
        assert!(!scope.is_deferring());
        let table = writer.cache().get(&scope, SEMESTER).await.unwrap();
        assert_eq!(table.get_etudids(false).len(), 5);
        // 新学生还没有成绩
        assert_eq!(table.get_etud_mod_moy(MODULE, 4), Average::NotAvailable);
    }
}
