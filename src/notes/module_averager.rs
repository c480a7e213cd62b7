//! 模块平均分
//!
//! 只有 `Normal` 类型的评测进入加权平均；补考和第二次考试在之后调整结果。
//! 一个评测在"已录完"或"等待中"且满分大于 0 时才可用。

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{
    AbsenceCounts, Average, Diagnostic, Evaluation, EvaluationType, ModuleImplInfo, ModuleKind,
    Score,
};
use crate::notes::formula::{self, Formula, FormulaInputs};

/// 评测的录入状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationState {
    pub evaluation_id: i64,
    pub nb_enrolled: usize,
    /// 已录入任一值（含标记）的学生数
    pub nb_notes: usize,
    pub nb_absent: usize,
    pub nb_excused: usize,
    pub nb_pending: usize,
    /// 未录入或待定的学生数
    pub nb_missing: usize,
    pub complete: bool,
    pub waiting: bool,
    /// 可参与平均计算
    pub usable: bool,
}

impl EvaluationState {
    fn compute(
        evaluation: &Evaluation,
        scores: Option<&HashMap<i64, Score>>,
        enrolled: &BTreeSet<i64>,
        is_malus: bool,
    ) -> Self {
        let mut state = EvaluationState {
            evaluation_id: evaluation.id,
            nb_enrolled: enrolled.len(),
            nb_notes: 0,
            nb_absent: 0,
            nb_excused: 0,
            nb_pending: 0,
            nb_missing: 0,
            complete: false,
            waiting: false,
            usable: false,
        };

        for student_id in enrolled {
            match scores.and_then(|s| s.get(student_id)) {
                Some(score) => {
                    state.nb_notes += 1;
                    match score {
                        Score::Absent => state.nb_absent += 1,
                        Score::Excused => state.nb_excused += 1,
                        Score::Pending => {
                            state.nb_pending += 1;
                            state.nb_missing += 1;
                        }
                        Score::Numeric(_) => {}
                    }
                }
                None => state.nb_missing += 1,
            }
        }

        state.complete = state.nb_missing == 0
            || evaluation.evaluation_type != EvaluationType::Normal
            || is_malus;
        state.waiting = state.nb_missing > 0
            && (state.nb_missing == state.nb_pending || evaluation.immediate_inclusion)
            && !is_malus;
        // 立即计入但一个成绩都没有的评测不算等待中
        if evaluation.immediate_inclusion && state.nb_notes == 0 {
            state.waiting = false;
        }
        state.usable = (state.complete || state.waiting) && evaluation.max_score > 0.0;
        state
    }
}

/// 一个模块的计算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleResult {
    pub moduleimpl_id: i64,
    /// 仅包含注册了该模块的学生
    pub averages: BTreeMap<i64, Average>,
    /// 存在等待中的评测
    pub pending: bool,
    /// 在系数非零的评测中有待定成绩（ATT）的学生
    #[serde(default)]
    pub pending_students: BTreeSet<i64>,
    pub evaluations: Vec<EvaluationState>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ModuleResult {
    pub fn average(&self, student_id: i64) -> Average {
        self.averages
            .get(&student_id)
            .copied()
            .unwrap_or(Average::NotEnrolled)
    }

    pub fn usable_evaluation_ids(&self) -> Vec<i64> {
        self.evaluations
            .iter()
            .filter(|e| e.usable)
            .map(|e| e.evaluation_id)
            .collect()
    }
}

pub struct ModuleAverager;

impl ModuleAverager {
    /// 计算模块内每个学生的平均分
    ///
    /// `enrolled` 为同时注册了学期和该模块的学生；`scores` 按评测 id 索引。
    pub fn compute(
        module: &ModuleImplInfo,
        evaluations: &[Evaluation],
        scores: &HashMap<i64, HashMap<i64, Score>>,
        enrolled: &BTreeSet<i64>,
        absences: &HashMap<i64, AbsenceCounts>,
    ) -> ModuleResult {
        let is_malus = module.kind == ModuleKind::Malus;
        let mut diagnostics = Vec::new();

        let mut ordered: Vec<&Evaluation> = evaluations.iter().collect();
        ordered.sort_by_key(|e| (e.numero, e.date, e.id));

        let states: Vec<EvaluationState> = ordered
            .iter()
            .map(|e| EvaluationState::compute(e, scores.get(&e.id), enrolled, is_malus))
            .collect();
        let pending = !is_malus && states.iter().any(|s| s.waiting);

        // 补考/第二次考试，多于一个时取最后一个
        let adjustments: Vec<&Evaluation> = ordered
            .iter()
            .copied()
            .filter(|e| e.evaluation_type != EvaluationType::Normal)
            .collect();
        if adjustments.len() > 1 {
            diagnostics.push(Diagnostic::for_module(
                module.id,
                None,
                "several catch-up evaluations, only the last one is used",
            ));
        }
        let adjustment = adjustments.last().copied();

        let (formula, formula_uses_absences) = match module.formula.as_deref() {
            Some(source) if formula::is_active(source) => match Formula::compile(source) {
                Ok(compiled) => (compiled.map(Ok), formula::uses_absences(source)),
                Err(e) => (Some(Err(e.message().to_string())), false),
            },
            _ => (None, false),
        };

        let mut averages = BTreeMap::new();
        let mut pending_students = BTreeSet::new();
        for &student_id in enrolled {
            let score_of = |evaluation_id: i64| -> Option<Score> {
                scores
                    .get(&evaluation_id)
                    .and_then(|s| s.get(&student_id))
                    .copied()
            };
            if ordered
                .iter()
                .any(|e| e.coefficient != 0.0 && score_of(e.id) == Some(Score::Pending))
            {
                pending_students.insert(student_id);
            }

            let mut sum_notes = 0.0;
            let mut sum_coefs = 0.0;
            let mut nb_missing = 0;
            for (evaluation, state) in ordered.iter().zip(&states) {
                if !state.usable || evaluation.evaluation_type != EvaluationType::Normal {
                    continue;
                }
                match score_of(evaluation.id) {
                    Some(score) => {
                        if let Some(on_twenty) = score.on_twenty(evaluation.max_score) {
                            sum_notes += on_twenty * evaluation.coefficient;
                            sum_coefs += evaluation.coefficient;
                        }
                    }
                    None => {
                        if evaluation.coefficient > 0.0 && !evaluation.immediate_inclusion {
                            nb_missing += 1;
                        }
                    }
                }
            }

            let mut average = if nb_missing == 0 && sum_coefs > 0.0 {
                Average::Numeric(sum_notes / sum_coefs)
            } else {
                Average::NotAvailable
            };

            match &formula {
                Some(Ok(compiled)) => {
                    let mut inputs = FormulaInputs {
                        moy: average,
                        absences: if formula_uses_absences {
                            absences.get(&student_id).copied().unwrap_or_default()
                        } else {
                            AbsenceCounts::default()
                        },
                        ..FormulaInputs::default()
                    };
                    let mut nb_notes = 0;
                    for (evaluation, state) in ordered.iter().zip(&states) {
                        let value = score_of(evaluation.id)
                            .filter(|_| state.usable)
                            .and_then(|s| s.on_twenty(evaluation.max_score));
                        match value {
                            Some(v) => {
                                inputs.notes.push(v);
                                inputs.coefs.push(evaluation.coefficient);
                                inputs.cmask.push(1.0);
                                nb_notes += 1;
                            }
                            None => {
                                inputs.notes.push(0.0);
                                inputs.coefs.push(0.0);
                                inputs.cmask.push(0.0);
                            }
                        }
                    }
                    if nb_notes > 0 || formula_uses_absences {
                        average = match compiled.average(&inputs) {
                            Ok(value) => value,
                            Err(e) => {
                                warn!(
                                    "Formula error in module {} for student {}: {}",
                                    module.id,
                                    student_id,
                                    e.message()
                                );
                                diagnostics.push(Diagnostic::for_module(
                                    module.id,
                                    Some(student_id),
                                    e.message(),
                                ));
                                Average::Error
                            }
                        };
                    }
                }
                Some(Err(message)) => {
                    diagnostics.push(Diagnostic::for_module(
                        module.id,
                        Some(student_id),
                        message.clone(),
                    ));
                    average = Average::Error;
                }
                None => {}
            }

            if let Some(adjustment) = adjustment {
                average = apply_adjustment(average, adjustment, score_of(adjustment.id));
            }

            averages.insert(student_id, average);
        }

        ModuleResult {
            moduleimpl_id: module.id,
            averages,
            pending,
            pending_students,
            evaluations: states,
            diagnostics,
        }
    }
}

/// 补考取较大者，第二次考试直接替换；仅在学生有实际分数时生效
fn apply_adjustment(current: Average, evaluation: &Evaluation, score: Option<Score>) -> Average {
    let Some(Score::Numeric(value)) = score else {
        return current;
    };
    if evaluation.max_score <= 0.0 {
        return current;
    }
    let on_twenty = value * 20.0 / evaluation.max_score;
    match (current, evaluation.evaluation_type) {
        (_, EvaluationType::Normal) => current,
        (Average::Numeric(avg), EvaluationType::CatchUp) => Average::Numeric(avg.max(on_twenty)),
        _ => Average::Numeric(on_twenty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(formula: Option<&str>) -> ModuleImplInfo {
        ModuleImplInfo {
            id: 10,
            semester_id: 1,
            ue_id: 100,
            code: "M1".into(),
            title: "Module".into(),
            coefficient: 1.5,
            kind: ModuleKind::Standard,
            formula: formula.map(str::to_string),
            numero: 1,
        }
    }

    fn evaluation(id: i64, coefficient: f64, kind: EvaluationType) -> Evaluation {
        Evaluation {
            id,
            moduleimpl_id: 10,
            max_score: 20.0,
            coefficient,
            evaluation_type: kind,
            immediate_inclusion: false,
            date: None,
            numero: id as i32,
        }
    }

    fn scores(entries: &[(i64, i64, Score)]) -> HashMap<i64, HashMap<i64, Score>> {
        let mut map: HashMap<i64, HashMap<i64, Score>> = HashMap::new();
        for (evaluation_id, student_id, score) in entries {
            map.entry(*evaluation_id)
                .or_default()
                .insert(*student_id, *score);
        }
        map
    }

    fn students(ids: &[i64]) -> BTreeSet<i64> {
        ids.iter().copied().collect()
    }

    fn run(
        module: &ModuleImplInfo,
        evaluations: &[Evaluation],
        scores: &HashMap<i64, HashMap<i64, Score>>,
        enrolled: &BTreeSet<i64>,
    ) -> ModuleResult {
        ModuleAverager::compute(module, evaluations, scores, enrolled, &HashMap::new())
    }

    fn approx(avg: Average, expected: f64) {
        match avg {
            Average::Numeric(v) => assert!((v - expected).abs() < 1e-3, "{v} != {expected}"),
            other => panic!("expected {expected}, got {other:?}"),
        }
    }

    #[test]
    fn test_weighted_average() {
        let evals = vec![
            evaluation(1, 1.0, EvaluationType::Normal),
            evaluation(2, 2.0, EvaluationType::Normal),
        ];
        let s = scores(&[
            (1, 1, Score::Numeric(12.0)),
            (2, 1, Score::Numeric(13.0)),
            (1, 2, Score::Numeric(6.0)),
            (2, 2, Score::Numeric(4.33)),
        ]);
        let result = run(&module(None), &evals, &s, &students(&[1, 2]));
        approx(result.average(1), 12.667);
        approx(result.average(2), 4.887);
        assert!(!result.pending);
        assert_eq!(result.usable_evaluation_ids(), vec![1, 2]);
        // 不取整
        assert_eq!(result.average(1), Average::Numeric(38.0 / 3.0));
    }

    #[test]
    fn test_absent_counts_as_zero() {
        let evals = vec![
            evaluation(1, 1.0, EvaluationType::Normal),
            evaluation(2, 2.0, EvaluationType::Normal),
        ];
        let s = scores(&[(1, 1, Score::Absent), (2, 1, Score::Numeric(13.0))]);
        let result = run(&module(None), &evals, &s, &students(&[1]));
        approx(result.average(1), 8.667);
    }

    #[test]
    fn test_single_evaluation_sentinels() {
        let evals = vec![evaluation(1, 1.0, EvaluationType::Normal)];
        let enrolled = students(&[1]);

        let absent = run(&module(None), &evals, &scores(&[(1, 1, Score::Absent)]), &enrolled);
        assert_eq!(absent.average(1), Average::Numeric(0.0));

        let excused = run(&module(None), &evals, &scores(&[(1, 1, Score::Excused)]), &enrolled);
        assert_eq!(excused.average(1), Average::NotAvailable);
        assert!(!excused.pending);

        let pending = run(&module(None), &evals, &scores(&[(1, 1, Score::Pending)]), &enrolled);
        assert_eq!(pending.average(1), Average::NotAvailable);
        assert!(pending.pending);
        assert!(pending.evaluations[0].waiting);
    }

    #[test]
    fn test_excused_drops_coefficient() {
        let evals = vec![
            evaluation(1, 1.0, EvaluationType::Normal),
            evaluation(2, 2.0, EvaluationType::Normal),
        ];
        let s = scores(&[(1, 1, Score::Excused), (2, 1, Score::Numeric(13.0))]);
        let result = run(&module(None), &evals, &s, &students(&[1]));
        assert_eq!(result.average(1), Average::Numeric(13.0));
    }

    #[test]
    fn test_incomplete_evaluation_is_ignored() {
        let evals = vec![
            evaluation(1, 1.0, EvaluationType::Normal),
            evaluation(2, 2.0, EvaluationType::Normal),
        ];
        // 评测 2 缺少学生 2 的成绩
        let s = scores(&[
            (1, 1, Score::Numeric(10.0)),
            (1, 2, Score::Numeric(14.0)),
            (2, 1, Score::Numeric(20.0)),
        ]);
        let result = run(&module(None), &evals, &s, &students(&[1, 2]));
        assert!(!result.evaluations[1].usable);
        assert_eq!(result.average(1), Average::Numeric(10.0));
        assert_eq!(result.average(2), Average::Numeric(14.0));
    }

    #[test]
    fn test_immediate_inclusion_missing_score() {
        let mut immediate = evaluation(2, 2.0, EvaluationType::Normal);
        immediate.immediate_inclusion = true;
        let evals = vec![evaluation(1, 1.0, EvaluationType::Normal), immediate];
        let s = scores(&[
            (1, 1, Score::Numeric(10.0)),
            (1, 2, Score::Numeric(14.0)),
            (2, 1, Score::Numeric(16.0)),
        ]);
        let result = run(&module(None), &evals, &s, &students(&[1, 2]));
        assert!(result.evaluations[1].usable);
        assert!(result.pending);
        approx(result.average(1), 14.0);
        assert_eq!(result.average(2), Average::Numeric(14.0));
    }

    #[test]
    fn test_immediate_inclusion_without_scores_not_waiting() {
        let mut immediate = evaluation(1, 1.0, EvaluationType::Normal);
        immediate.immediate_inclusion = true;
        let result = run(&module(None), &[immediate], &HashMap::new(), &students(&[1]));
        assert!(!result.evaluations[0].waiting);
        assert!(!result.pending);
        assert_eq!(result.average(1), Average::NotAvailable);
    }

    #[test]
    fn test_not_enrolled() {
        let evals = vec![evaluation(1, 1.0, EvaluationType::Normal)];
        let s = scores(&[(1, 1, Score::Numeric(10.0)), (1, 9, Score::Numeric(3.0))]);
        let result = run(&module(None), &evals, &s, &students(&[1]));
        assert_eq!(result.average(9), Average::NotEnrolled);
        assert!(!result.averages.contains_key(&9));
    }

    #[test]
    fn test_catch_up_keeps_best() {
        let evals = vec![
            evaluation(1, 1.0, EvaluationType::Normal),
            evaluation(2, 1.0, EvaluationType::CatchUp),
        ];
        let s = scores(&[
            (1, 1, Score::Numeric(8.0)),
            (1, 2, Score::Numeric(15.0)),
            (2, 1, Score::Numeric(11.0)),
            (2, 2, Score::Numeric(9.0)),
        ]);
        let result = run(&module(None), &evals, &s, &students(&[1, 2]));
        assert_eq!(result.average(1), Average::Numeric(11.0));
        assert_eq!(result.average(2), Average::Numeric(15.0));
    }

    #[test]
    fn test_second_session_replaces() {
        let mut session2 = evaluation(2, 1.0, EvaluationType::SecondSession);
        session2.max_score = 10.0;
        let evals = vec![evaluation(1, 1.0, EvaluationType::Normal), session2];
        let s = scores(&[(1, 1, Score::Numeric(15.0)), (2, 1, Score::Numeric(4.0))]);
        let result = run(&module(None), &evals, &s, &students(&[1]));
        assert_eq!(result.average(1), Average::Numeric(8.0));
    }

    #[test]
    fn test_catch_up_on_not_available_average() {
        let evals = vec![
            evaluation(1, 1.0, EvaluationType::Normal),
            evaluation(2, 1.0, EvaluationType::CatchUp),
        ];
        let s = scores(&[(1, 1, Score::Excused), (2, 1, Score::Numeric(12.0))]);
        let result = run(&module(None), &evals, &s, &students(&[1]));
        assert_eq!(result.average(1), Average::Numeric(12.0));
    }

    #[test]
    fn test_adjustment_ignores_normal_evaluation() {
        let normal = evaluation(1, 1.0, EvaluationType::Normal);
        let current = Average::Numeric(9.0);
        assert_eq!(
            apply_adjustment(current, &normal, Some(Score::Numeric(18.0))),
            current
        );
        assert_eq!(
            apply_adjustment(Average::NotAvailable, &normal, Some(Score::Numeric(18.0))),
            Average::NotAvailable
        );
        let second = evaluation(2, 1.0, EvaluationType::SecondSession);
        assert_eq!(
            apply_adjustment(Average::NotAvailable, &second, Some(Score::Numeric(7.0))),
            Average::Numeric(7.0)
        );
    }

    #[test]
    fn test_pending_students() {
        let evals = vec![
            evaluation(1, 1.0, EvaluationType::Normal),
            evaluation(2, 0.0, EvaluationType::Normal),
        ];
        let s = scores(&[
            (1, 1, Score::Pending),
            (1, 2, Score::Numeric(10.0)),
            (2, 2, Score::Pending),
            (1, 3, Score::Numeric(12.0)),
        ]);
        let result = run(&module(None), &evals, &s, &students(&[1, 2, 3]));
        // 系数为 0 的评测中的待定成绩不计
        assert_eq!(result.pending_students, students(&[1]));
    }

    #[test]
    fn test_several_catch_up_evaluations_diagnostic() {
        let evals = vec![
            evaluation(1, 1.0, EvaluationType::Normal),
            evaluation(2, 1.0, EvaluationType::CatchUp),
            evaluation(3, 1.0, EvaluationType::CatchUp),
        ];
        let s = scores(&[
            (1, 1, Score::Numeric(8.0)),
            (2, 1, Score::Numeric(18.0)),
            (3, 1, Score::Numeric(10.0)),
        ]);
        let result = run(&module(None), &evals, &s, &students(&[1]));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.average(1), Average::Numeric(10.0));
    }

    #[test]
    fn test_formula_replaces_average() {
        let evals = vec![
            evaluation(1, 1.0, EvaluationType::Normal),
            evaluation(2, 2.0, EvaluationType::Normal),
        ];
        let s = scores(&[(1, 1, Score::Numeric(12.0)), (2, 1, Score::Numeric(13.0))]);
        let result = run(&module(Some("max(notes)")), &evals, &s, &students(&[1]));
        assert_eq!(result.average(1), Average::Numeric(13.0));
    }

    #[test]
    fn test_comment_formula_is_inactive() {
        let evals = vec![evaluation(1, 1.0, EvaluationType::Normal)];
        let s = scores(&[(1, 1, Score::Numeric(12.0))]);
        let result = run(&module(Some("# max(notes)")), &evals, &s, &students(&[1]));
        assert_eq!(result.average(1), Average::Numeric(12.0));
    }

    #[test]
    fn test_formula_errors_are_per_student() {
        let evals = vec![evaluation(1, 1.0, EvaluationType::Normal)];
        let s = scores(&[(1, 1, Score::Numeric(15.0)), (1, 2, Score::Numeric(5.0))]);
        // 只有学生 1 超出范围
        let result = run(&module(Some("moy * 2")), &evals, &s, &students(&[1, 2]));
        assert_eq!(result.average(1), Average::Error);
        assert_eq!(result.average(2), Average::Numeric(10.0));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].student_id, Some(1));
    }

    #[test]
    fn test_invalid_formula_marks_error() {
        let evals = vec![evaluation(1, 1.0, EvaluationType::Normal)];
        let s = scores(&[(1, 1, Score::Numeric(15.0))]);
        let result = run(&module(Some("os.system(1)")), &evals, &s, &students(&[1]));
        assert_eq!(result.average(1), Average::Error);
        assert!(!result.diagnostics.is_empty());
    }

    #[test]
    fn test_formula_with_absences() {
        let evals = vec![evaluation(1, 1.0, EvaluationType::Normal)];
        let s = scores(&[(1, 1, Score::Numeric(15.0))]);
        let mut absences = HashMap::new();
        absences.insert(
            1,
            AbsenceCounts {
                total: 6,
                justified: 2,
            },
        );
        let result = ModuleAverager::compute(
            &module(Some("moy - nb_abs_nojust")),
            &evals,
            &s,
            &students(&[1]),
            &absences,
        );
        assert_eq!(result.average(1), Average::Numeric(11.0));
    }

    #[test]
    fn test_malus_module_never_pending() {
        let mut malus = module(None);
        malus.kind = ModuleKind::Malus;
        let evals = vec![evaluation(1, 1.0, EvaluationType::Normal)];
        let s = scores(&[(1, 1, Score::Pending)]);
        let result = run(&malus, &evals, &s, &students(&[1, 2]));
        assert!(!result.pending);
        assert!(result.evaluations[0].complete);
    }
}
