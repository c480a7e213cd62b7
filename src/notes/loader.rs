//! 从存储层读取一个学期计算所需的全部原始数据

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::debug;

use crate::errors::{Result, ScoDocError};
use crate::models::{
    AbsenceCounts, CapitalizedUe, Enrollment, Evaluation, ModuleImplInfo, Score, SemesterInfo,
    UeInfo,
};
use crate::notes::formula;
use crate::storage::ScoreStore;

/// 按评测读取成绩；`ResultCache` 在此之上加一层缓存
#[async_trait]
pub trait EvaluationScores: Send + Sync {
    async fn scores_for(&self, evaluation_id: i64) -> Result<Arc<HashMap<i64, Score>>>;
}

/// 直接读存储，不经缓存
pub struct DirectScores<'a>(pub &'a dyn ScoreStore);

#[async_trait]
impl EvaluationScores for DirectScores<'_> {
    async fn scores_for(&self, evaluation_id: i64) -> Result<Arc<HashMap<i64, Score>>> {
        Ok(Arc::new(self.0.get_scores(evaluation_id).await?))
    }
}

/// 一个学期的原始数据快照
#[derive(Debug, Clone)]
pub struct SemesterData {
    pub semester: SemesterInfo,
    /// 学期所属培养方案的全部 UE
    pub ues: Vec<UeInfo>,
    pub modules: Vec<ModuleImplInfo>,
    /// 按模块 id 索引
    pub evaluations: HashMap<i64, Vec<Evaluation>>,
    /// 按评测 id 索引
    pub scores: HashMap<i64, HashMap<i64, Score>>,
    pub enrollments: Vec<Enrollment>,
    pub module_enrollments: HashMap<i64, HashSet<i64>>,
    pub ue_formulas: HashMap<i64, String>,
    /// 本学期为资本化 UE 手动设定的系数
    pub ue_coefficients: HashMap<i64, f64>,
    pub capitalized: Vec<CapitalizedUe>,
    pub absences: HashMap<i64, AbsenceCounts>,
}

impl SemesterData {
    /// 是否有生效的公式引用了缺勤变量
    pub fn needs_absences(modules: &[ModuleImplInfo], ue_formulas: &HashMap<i64, String>) -> bool {
        modules
            .iter()
            .filter_map(|m| m.formula.as_deref())
            .chain(ue_formulas.values().map(String::as_str))
            .any(|source| formula::is_active(source) && formula::uses_absences(source))
    }

    pub async fn load(
        store: &dyn ScoreStore,
        scores: &dyn EvaluationScores,
        semester_id: i64,
    ) -> Result<Self> {
        let semester = store
            .get_semester(semester_id)
            .await?
            .ok_or_else(|| ScoDocError::not_found(format!("semester {semester_id} not found")))?;

        let ues = store.list_ues(semester_id).await?;
        let modules = store.list_modules(semester_id).await?;
        let enrollments = store.list_enrolled(semester_id).await?;

        let mut evaluations = HashMap::with_capacity(modules.len());
        let mut module_enrollments = HashMap::with_capacity(modules.len());
        for module in &modules {
            evaluations.insert(module.id, store.list_evaluations(module.id).await?);
            module_enrollments.insert(module.id, store.list_module_enrolled(module.id).await?);
        }

        let evaluation_ids: Vec<i64> = evaluations.values().flatten().map(|e| e.id).collect();
        let loaded = try_join_all(evaluation_ids.iter().map(|&id| scores.scores_for(id))).await?;
        let scores = evaluation_ids
            .into_iter()
            .zip(loaded)
            .map(|(id, map)| (id, map.as_ref().clone()))
            .collect();

        let ue_formulas = store.get_ue_formulas(semester_id).await?;
        let ue_coefficients = store.get_ue_coefficients(semester_id).await?;
        let capitalized = store.list_capitalized_ues(semester_id).await?;

        let absences = if Self::needs_absences(&modules, &ue_formulas) {
            store.get_absence_counts(semester_id).await?
        } else {
            HashMap::new()
        };

        debug!(
            "Loaded semester {}: {} UEs, {} modules, {} students",
            semester_id,
            ues.len(),
            modules.len(),
            enrollments.len()
        );

        Ok(Self {
            semester,
            ues,
            modules,
            evaluations,
            scores,
            enrollments,
            module_enrollments,
            ue_formulas,
            ue_coefficients,
            capitalized,
            absences,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::fixtures;

    #[tokio::test]
    async fn test_load_sample_semester() {
        let storage = fixtures::sample_storage();
        let data = SemesterData::load(&storage, &DirectScores(&storage), fixtures::SEMESTER)
            .await
            .unwrap();
        assert_eq!(data.modules.len(), 1);
        assert_eq!(data.enrollments.len(), 2);
        assert_eq!(data.scores.len(), 2);
        assert_eq!(data.scores[&fixtures::EVAL_1][&fixtures::STUDENT_1], Score::Numeric(12.0));
        // 没有公式引用缺勤，不读取
        assert!(data.absences.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_semester() {
        let storage = fixtures::sample_storage();
        let err = SemesterData::load(&storage, &DirectScores(&storage), 999)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E008");
    }

    #[test]
    fn test_needs_absences() {
        let data = fixtures::sample_data();
        assert!(!SemesterData::needs_absences(&data.modules, &data.ue_formulas));
        let mut modules = data.modules.clone();
        modules[0].formula = Some("moy - nb_abs_nojust / 4".into());
        assert!(SemesterData::needs_absences(&modules, &data.ue_formulas));
        modules[0].formula = Some("# moy - nb_abs / 4".into());
        assert!(!SemesterData::needs_absences(&modules, &data.ue_formulas));
    }
}
