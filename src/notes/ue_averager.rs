//! UE 平均分与资本化

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{Result, ScoDocError};
use crate::models::{
    AbsenceCounts, Average, CapitalizedUe, Diagnostic, ModuleImplInfo, ModuleKind, UeInfo, UeType,
};
use crate::notes::NotesSettings;
use crate::notes::formula::{self, Formula, FormulaInputs};
use crate::notes::module_averager::ModuleResult;

/// 学生在一个 UE 中的状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UeStatus {
    pub ue_id: i64,
    /// 采用的平均分（可能是资本化的），当前不可计算时为 0
    pub moy: Average,
    /// 本学期计算出的平均分（不考虑资本化）
    pub cur_moy_ue: Average,
    /// 采用的系数：模块系数之和，或资本化 UE 的系数
    pub coef_ue: f64,
    pub cur_coef_ue: f64,
    pub sum_coefs: f64,
    pub nb_notes: usize,
    pub nb_missing: usize,
    pub malus: f64,
    /// 至少注册了该 UE 的一个模块
    pub is_enrolled: bool,
    pub is_capitalized: bool,
    pub was_capitalized: bool,
    pub is_external: bool,
    pub capitalized_from: Option<i64>,
    pub event_date: Option<NaiveDate>,
    /// 预计取得的 ECTS，及其中基础 UE 和职业 UE 的部分
    pub ects_pot: f64,
    #[serde(default)]
    pub ects_pot_fond: f64,
    #[serde(default)]
    pub ects_pot_pro: f64,
    /// 运动 UE 中的模块平均分及系数
    pub bonus_notes: Vec<f64>,
    pub bonus_coefs: Vec<f64>,
}

impl UeStatus {
    fn blocked(ue_id: i64) -> Self {
        Self {
            ue_id,
            moy: Average::NotAvailable,
            cur_moy_ue: Average::NotAvailable,
            coef_ue: 0.0,
            cur_coef_ue: 0.0,
            sum_coefs: 0.0,
            nb_notes: 0,
            nb_missing: 0,
            malus: 0.0,
            is_enrolled: false,
            is_capitalized: false,
            was_capitalized: false,
            is_external: false,
            capitalized_from: None,
            event_date: None,
            ects_pot: 0.0,
            ects_pot_fond: 0.0,
            ects_pot_pro: 0.0,
            bonus_notes: Vec::new(),
            bonus_coefs: Vec::new(),
        }
    }

    /// 该 UE 是否计入总平均：已资本化，或已注册且当前平均为数值
    pub fn counts(&self) -> bool {
        self.is_capitalized || (self.is_enrolled && self.cur_moy_ue.is_numeric())
    }

    /// 计入时的平均分，否则为 NA
    pub fn counted_average(&self) -> Average {
        if self.counts() {
            self.moy
        } else {
            Average::NotAvailable
        }
    }
}

/// 计算一个 UE 所需的输入
pub struct UeInput<'a> {
    pub ue: &'a UeInfo,
    /// 属于该 UE 的模块及其结果，按显示顺序
    pub modules: Vec<(&'a ModuleImplInfo, &'a ModuleResult)>,
    pub formula: Option<&'a str>,
    /// 本学期为资本化 UE 手动设定的系数
    pub manual_coefficient: Option<f64>,
    pub absences: &'a HashMap<i64, AbsenceCounts>,
}

#[derive(Debug, Default)]
pub struct UeComputation {
    pub statuses: BTreeMap<i64, UeStatus>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct UeAverager;

impl UeAverager {
    /// 计算所有学生在该 UE 中的状态
    ///
    /// `capitalized` 按学生索引；资本化 UE 的系数无法确定时返回结构错误。
    pub fn compute(
        input: &UeInput<'_>,
        students: &[i64],
        capitalized: &HashMap<i64, Vec<&CapitalizedUe>>,
        blocked: bool,
        settings: &NotesSettings,
    ) -> Result<UeComputation> {
        let mut out = UeComputation::default();
        if blocked {
            for &student_id in students {
                out.statuses
                    .insert(student_id, UeStatus::blocked(input.ue.id));
            }
            return Ok(out);
        }

        let compiled = match input.formula {
            Some(source) if formula::is_active(source) => Some(
                Formula::compile(source)
                    .map(|f| f.map(|f| (f, formula::uses_absences(source))))
                    .map_err(|e| e.message().to_string()),
            ),
            _ => None,
        };

        for &student_id in students {
            let mut status = Self::current(input, student_id, &compiled, &mut out.diagnostics);
            let caps = capitalized
                .get(&student_id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            Self::apply_capitalization(input, student_id, caps, settings, &mut status)?;

            status.ects_pot = match status.moy.value() {
                Some(v) if v >= settings.ue_validation_threshold => input.ue.ects.unwrap_or(0.0),
                _ => 0.0,
            };
            let ue_type = input.ue.ue_type;
            status.ects_pot_fond = if ue_type.is_fundamental() { status.ects_pot } else { 0.0 };
            status.ects_pot_pro = if ue_type.is_professional() { status.ects_pot } else { 0.0 };
            out.statuses.insert(student_id, status);
        }
        Ok(out)
    }

    /// 本学期的 UE 平均
    fn current(
        input: &UeInput<'_>,
        student_id: i64,
        compiled: &Option<std::result::Result<Option<(Formula, bool)>, String>>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> UeStatus {
        let ue = input.ue;
        let mut status = UeStatus::blocked(ue.id);
        let mut sum_notes = 0.0;
        let mut inputs = FormulaInputs::default();

        for (module, result) in &input.modules {
            let value = result.average(student_id);
            let enrolled_here = value != Average::NotEnrolled;
            status.is_enrolled |= enrolled_here;

            match module.kind {
                ModuleKind::Standard if ue.ue_type == UeType::Sport => {
                    if let Some(v) = value.value() {
                        status.bonus_notes.push(v);
                        status.bonus_coefs.push(module.coefficient);
                    }
                }
                ModuleKind::Standard => match value.value() {
                    Some(v) => {
                        sum_notes += v * module.coefficient;
                        status.sum_coefs += module.coefficient;
                        status.nb_notes += 1;
                        inputs.notes.push(v);
                        inputs.coefs.push(module.coefficient);
                        inputs.cmask.push(1.0);
                    }
                    None => {
                        if enrolled_here && module.coefficient != 0.0 {
                            status.nb_missing += 1;
                        }
                        inputs.notes.push(0.0);
                        inputs.coefs.push(0.0);
                        inputs.cmask.push(0.0);
                    }
                },
                ModuleKind::Malus => {
                    if let Some(v) = value.value() {
                        status.malus += v;
                    }
                }
            }
        }

        let mut average = if status.sum_coefs > 0.0 {
            let mut moy = sum_notes / status.sum_coefs;
            if status.malus != 0.0 {
                moy = (moy - status.malus).clamp(0.0, 20.0);
            }
            Average::Numeric(moy)
        } else {
            Average::NotAvailable
        };

        if status.nb_notes > 0 {
            match compiled {
                Some(Ok(Some((formula, uses_absences)))) => {
                    inputs.moy = average;
                    if *uses_absences {
                        inputs.absences = input.absences.get(&student_id).copied().unwrap_or_default();
                    }
                    average = match formula.average(&inputs) {
                        Ok(value) => value,
                        Err(e) => {
                            warn!(
                                "Formula error in UE {} for student {}: {}",
                                ue.id,
                                student_id,
                                e.message()
                            );
                            diagnostics.push(Diagnostic::for_ue(ue.id, Some(student_id), e.message()));
                            Average::Error
                        }
                    };
                }
                Some(Err(message)) => {
                    diagnostics.push(Diagnostic::for_ue(ue.id, Some(student_id), message.clone()));
                    average = Average::Error;
                }
                _ => {}
            }
        }

        status.cur_moy_ue = average;
        status.cur_coef_ue = if status.is_enrolled { status.sum_coefs } else { 0.0 };
        status.coef_ue = status.cur_coef_ue;
        status.moy = if status.is_enrolled && average != Average::NotAvailable {
            average
        } else {
            Average::Numeric(0.0)
        };
        status
    }

    /// 若以前取得的同代码 UE 成绩更好（或按配置相等），则采用之
    fn apply_capitalization(
        input: &UeInput<'_>,
        student_id: i64,
        capitalized: &[&CapitalizedUe],
        settings: &NotesSettings,
        status: &mut UeStatus,
    ) -> Result<()> {
        for cap in capitalized
            .iter()
            .filter(|cap| cap.ue_code == input.ue.ue_code)
        {
            status.was_capitalized = true;
            status.event_date = status.event_date.or(Some(cap.event_date));

            let Some(cap_average) = cap.average else {
                continue;
            };
            let best = status.moy.value_or_zero();
            let better = if settings.capitalize_on_equal {
                cap_average >= best
            } else {
                cap_average > best
            };
            if better {
                status.moy = Average::Numeric(cap_average);
                status.is_capitalized = true;
                status.is_external = cap.is_external;
                status.capitalized_from = cap.source_semester_id;
                status.event_date = Some(cap.event_date);
                status.coef_ue = Self::capitalized_coefficient(input, student_id, cap)?;
            }
        }
        Ok(())
    }

    /// 资本化 UE 的系数：手动设定 > 来源学期的模块系数和 > 当前注册模块的系数和
    fn capitalized_coefficient(
        input: &UeInput<'_>,
        student_id: i64,
        cap: &CapitalizedUe,
    ) -> Result<f64> {
        if let Some(coefficient) = input.manual_coefficient {
            return Ok(coefficient);
        }
        if cap.source_semester_id.is_some() {
            if let Some(coefficient) = cap.coefficient {
                return Ok(coefficient);
            }
        }
        let enrolled: Vec<f64> = input
            .modules
            .iter()
            .filter(|(_, result)| result.averages.contains_key(&student_id))
            .map(|(module, _)| module.coefficient)
            .collect();
        if !enrolled.is_empty() {
            return Ok(enrolled.iter().sum());
        }
        Err(ScoDocError::structure(format!(
            "cannot determine the coefficient of capitalized UE {} for student {}",
            input.ue.acronym, student_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Evaluation, EvaluationType, Score};
    use crate::notes::module_averager::ModuleAverager;
    use std::collections::BTreeSet;

    fn ue(ue_type: UeType) -> UeInfo {
        UeInfo {
            id: 100,
            ue_code: "UE11".into(),
            acronym: "UE1".into(),
            title: "UE 1".into(),
            ects: Some(3.0),
            coefficient: Some(1.0),
            ue_type,
            is_external: false,
            numero: 1,
        }
    }

    fn module(id: i64, coefficient: f64, kind: ModuleKind) -> ModuleImplInfo {
        ModuleImplInfo {
            id,
            semester_id: 1,
            ue_id: 100,
            code: format!("M{id}"),
            title: format!("Module {id}"),
            coefficient,
            kind,
            formula: None,
            numero: id as i32,
        }
    }

    /// 直接构造模块结果
    fn result(moduleimpl_id: i64, averages: &[(i64, Average)]) -> ModuleResult {
        ModuleResult {
            moduleimpl_id,
            averages: averages.iter().copied().collect(),
            pending: false,
            pending_students: BTreeSet::new(),
            evaluations: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn cap(student_id: i64, average: Option<f64>, coefficient: Option<f64>) -> CapitalizedUe {
        CapitalizedUe {
            student_id,
            ue_code: "UE11".into(),
            average,
            source_semester_id: Some(7),
            coefficient,
            is_external: false,
            event_date: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
        }
    }

    fn run(
        input: &UeInput<'_>,
        students: &[i64],
        caps: &[CapitalizedUe],
        settings: &NotesSettings,
    ) -> Result<UeComputation> {
        let mut by_student: HashMap<i64, Vec<&CapitalizedUe>> = HashMap::new();
        for c in caps {
            by_student.entry(c.student_id).or_default().push(c);
        }
        UeAverager::compute(input, students, &by_student, false, settings)
    }

    #[test]
    fn test_single_module_ue_equals_module_average() {
        let m = module(10, 1.5, ModuleKind::Standard);
        let evals = vec![
            Evaluation {
                id: 1,
                moduleimpl_id: 10,
                max_score: 20.0,
                coefficient: 1.0,
                evaluation_type: EvaluationType::Normal,
                immediate_inclusion: false,
                date: None,
                numero: 1,
            },
            Evaluation {
                id: 2,
                moduleimpl_id: 10,
                max_score: 20.0,
                coefficient: 2.0,
                evaluation_type: EvaluationType::Normal,
                immediate_inclusion: false,
                date: None,
                numero: 2,
            },
        ];
        let mut scores: HashMap<i64, HashMap<i64, Score>> = HashMap::new();
        scores.entry(1).or_default().insert(1, Score::Numeric(12.0));
        scores.entry(2).or_default().insert(1, Score::Numeric(13.0));
        let enrolled: BTreeSet<i64> = [1].into_iter().collect();
        let r = ModuleAverager::compute(&m, &evals, &scores, &enrolled, &HashMap::new());

        let u = ue(UeType::Standard);
        let absences = HashMap::new();
        let input = UeInput {
            ue: &u,
            modules: vec![(&m, &r)],
            formula: None,
            manual_coefficient: None,
            absences: &absences,
        };
        let out = run(&input, &[1], &[], &NotesSettings::default()).unwrap();
        let status = &out.statuses[&1];
        assert_eq!(status.moy, r.average(1));
        assert_eq!(status.sum_coefs, 1.5);
        assert!(status.counts());
        assert_eq!(status.ects_pot, 3.0);
        assert_eq!(status.ects_pot_fond, 3.0);
        assert_eq!(status.ects_pot_pro, 0.0);
    }

    #[test]
    fn test_ects_split_by_ue_type() {
        let m1 = module(1, 1.0, ModuleKind::Standard);
        let r1 = result(1, &[(1, Average::Numeric(12.0)), (2, Average::Numeric(8.0))]);
        let absences = HashMap::new();
        let cases = [
            (UeType::Professional, 3.0, 3.0),
            (UeType::Elective, 0.0, 0.0),
            (UeType::Internship, 3.0, 0.0),
        ];
        for (ue_type, fond, pro) in cases {
            let u = ue(ue_type);
            let input = UeInput {
                ue: &u,
                modules: vec![(&m1, &r1)],
                formula: None,
                manual_coefficient: None,
                absences: &absences,
            };
            let out = run(&input, &[1, 2], &[], &NotesSettings::default()).unwrap();
            let s1 = &out.statuses[&1];
            assert_eq!(s1.ects_pot, 3.0);
            assert_eq!((s1.ects_pot_fond, s1.ects_pot_pro), (fond, pro), "{ue_type:?}");
            // 未达到有效分数线
            let s2 = &out.statuses[&2];
            assert_eq!((s2.ects_pot, s2.ects_pot_fond, s2.ects_pot_pro), (0.0, 0.0, 0.0));
        }
    }

    #[test]
    fn test_weighted_mean_and_missing() {
        let m1 = module(1, 1.0, ModuleKind::Standard);
        let m2 = module(2, 3.0, ModuleKind::Standard);
        let m3 = module(3, 2.0, ModuleKind::Standard);
        let r1 = result(1, &[(1, Average::Numeric(8.0)), (2, Average::Numeric(10.0))]);
        let r2 = result(2, &[(1, Average::Numeric(12.0)), (2, Average::NotAvailable)]);
        // 学生 2 没有注册 m3
        let r3 = result(3, &[(1, Average::NotAvailable)]);
        let u = ue(UeType::Standard);
        let absences = HashMap::new();
        let input = UeInput {
            ue: &u,
            modules: vec![(&m1, &r1), (&m2, &r2), (&m3, &r3)],
            formula: None,
            manual_coefficient: None,
            absences: &absences,
        };
        let out = run(&input, &[1, 2], &[], &NotesSettings::default()).unwrap();
        let s1 = &out.statuses[&1];
        assert_eq!(s1.cur_moy_ue, Average::Numeric(11.0));
        assert_eq!(s1.nb_missing, 1);
        assert_eq!(s1.nb_notes, 2);
        let s2 = &out.statuses[&2];
        assert_eq!(s2.cur_moy_ue, Average::Numeric(10.0));
        assert_eq!(s2.nb_missing, 1);
    }

    #[test]
    fn test_no_numeric_module_yields_zero_for_completion() {
        let m1 = module(1, 1.0, ModuleKind::Standard);
        let r1 = result(1, &[(1, Average::NotAvailable)]);
        let u = ue(UeType::Standard);
        let absences = HashMap::new();
        let input = UeInput {
            ue: &u,
            modules: vec![(&m1, &r1)],
            formula: None,
            manual_coefficient: None,
            absences: &absences,
        };
        let out = run(&input, &[1, 2], &[], &NotesSettings::default()).unwrap();
        let s1 = &out.statuses[&1];
        assert_eq!(s1.cur_moy_ue, Average::NotAvailable);
        assert_eq!(s1.moy, Average::Numeric(0.0));
        assert!(!s1.counts());
        let s2 = &out.statuses[&2];
        assert!(!s2.is_enrolled);
        assert_eq!(s2.nb_missing, 0);
    }

    #[test]
    fn test_malus_subtracts_and_clips() {
        let m1 = module(1, 1.0, ModuleKind::Standard);
        let malus = module(2, 0.0, ModuleKind::Malus);
        let r1 = result(1, &[(1, Average::Numeric(12.0)), (2, Average::Numeric(1.0))]);
        let r2 = result(2, &[(1, Average::Numeric(1.5)), (2, Average::Numeric(3.0))]);
        let u = ue(UeType::Standard);
        let absences = HashMap::new();
        let input = UeInput {
            ue: &u,
            modules: vec![(&m1, &r1), (&malus, &r2)],
            formula: None,
            manual_coefficient: None,
            absences: &absences,
        };
        let out = run(&input, &[1, 2], &[], &NotesSettings::default()).unwrap();
        assert_eq!(out.statuses[&1].cur_moy_ue, Average::Numeric(10.5));
        assert_eq!(out.statuses[&2].cur_moy_ue, Average::Numeric(0.0));
    }

    #[test]
    fn test_sport_ue_collects_bonus_notes() {
        let m1 = module(1, 2.0, ModuleKind::Standard);
        let r1 = result(1, &[(1, Average::Numeric(15.0))]);
        let u = ue(UeType::Sport);
        let absences = HashMap::new();
        let input = UeInput {
            ue: &u,
            modules: vec![(&m1, &r1)],
            formula: None,
            manual_coefficient: None,
            absences: &absences,
        };
        let out = run(&input, &[1], &[], &NotesSettings::default()).unwrap();
        let s = &out.statuses[&1];
        assert_eq!(s.bonus_notes, vec![15.0]);
        assert_eq!(s.bonus_coefs, vec![2.0]);
        assert_eq!(s.cur_moy_ue, Average::NotAvailable);
    }

    #[test]
    fn test_ue_formula() {
        let m1 = module(1, 1.0, ModuleKind::Standard);
        let m2 = module(2, 1.0, ModuleKind::Standard);
        let r1 = result(1, &[(1, Average::Numeric(8.0)), (2, Average::NotAvailable)]);
        let r2 = result(2, &[(1, Average::Numeric(14.0)), (2, Average::NotAvailable)]);
        let u = ue(UeType::Standard);
        let absences = HashMap::new();
        let input = UeInput {
            ue: &u,
            modules: vec![(&m1, &r1), (&m2, &r2)],
            formula: Some("max(notes)"),
            manual_coefficient: None,
            absences: &absences,
        };
        let out = run(&input, &[1, 2], &[], &NotesSettings::default()).unwrap();
        assert_eq!(out.statuses[&1].cur_moy_ue, Average::Numeric(14.0));
        // 没有任何数值模块平均时不求值
        assert_eq!(out.statuses[&2].cur_moy_ue, Average::NotAvailable);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_invalid_ue_formula_degrades_to_error() {
        let m1 = module(1, 1.0, ModuleKind::Standard);
        let r1 = result(1, &[(1, Average::Numeric(8.0))]);
        let u = ue(UeType::Standard);
        let absences = HashMap::new();
        let input = UeInput {
            ue: &u,
            modules: vec![(&m1, &r1)],
            formula: Some("open(moy)"),
            manual_coefficient: None,
            absences: &absences,
        };
        let out = run(&input, &[1], &[], &NotesSettings::default()).unwrap();
        assert_eq!(out.statuses[&1].cur_moy_ue, Average::Error);
        assert_eq!(out.diagnostics.len(), 1);

        // 注释公式不生效
        let input = UeInput {
            formula: Some("# max(notes)"),
            ..input
        };
        let out = run(&input, &[1], &[], &NotesSettings::default()).unwrap();
        assert_eq!(out.statuses[&1].cur_moy_ue, Average::Numeric(8.0));
    }

    #[test]
    fn test_capitalization_keeps_best() {
        let m1 = module(1, 2.0, ModuleKind::Standard);
        let r1 = result(1, &[(1, Average::Numeric(9.0)), (2, Average::Numeric(14.0))]);
        let u = ue(UeType::Standard);
        let absences = HashMap::new();
        let input = UeInput {
            ue: &u,
            modules: vec![(&m1, &r1)],
            formula: None,
            manual_coefficient: None,
            absences: &absences,
        };
        let caps = vec![cap(1, Some(12.0), Some(4.0)), cap(2, Some(11.0), Some(4.0))];
        let out = run(&input, &[1, 2], &caps, &NotesSettings::default()).unwrap();

        let s1 = &out.statuses[&1];
        assert!(s1.is_capitalized);
        assert_eq!(s1.moy, Average::Numeric(12.0));
        assert_eq!(s1.cur_moy_ue, Average::Numeric(9.0));
        assert_eq!(s1.coef_ue, 4.0);
        assert_eq!(s1.capitalized_from, Some(7));

        let s2 = &out.statuses[&2];
        assert!(!s2.is_capitalized);
        assert!(s2.was_capitalized);
        assert_eq!(s2.moy, Average::Numeric(14.0));

        // 采用值不低于当前值，也不低于资本化值
        for (s, cap_average) in [(s1, 12.0), (s2, 11.0)] {
            assert!(s.moy.value_or_zero() >= s.cur_moy_ue.value_or_zero());
            assert!(s.moy.value_or_zero() >= cap_average);
        }
    }

    #[test]
    fn test_capitalize_on_equal() {
        let m1 = module(1, 2.0, ModuleKind::Standard);
        let r1 = result(1, &[(1, Average::Numeric(12.0))]);
        let u = ue(UeType::Standard);
        let absences = HashMap::new();
        let input = UeInput {
            ue: &u,
            modules: vec![(&m1, &r1)],
            formula: None,
            manual_coefficient: None,
            absences: &absences,
        };
        let caps = vec![cap(1, Some(12.0), Some(4.0))];
        let strict = run(&input, &[1], &caps, &NotesSettings::default()).unwrap();
        assert!(!strict.statuses[&1].is_capitalized);

        let settings = NotesSettings {
            capitalize_on_equal: true,
            ..NotesSettings::default()
        };
        let equal = run(&input, &[1], &caps, &settings).unwrap();
        assert!(equal.statuses[&1].is_capitalized);
    }

    #[test]
    fn test_capitalized_coefficient_resolution() {
        let m1 = module(1, 2.0, ModuleKind::Standard);
        let r1 = result(1, &[(1, Average::Numeric(5.0))]);
        let u = ue(UeType::Standard);
        let absences = HashMap::new();
        let mut input = UeInput {
            ue: &u,
            modules: vec![(&m1, &r1)],
            formula: None,
            manual_coefficient: Some(6.0),
            absences: &absences,
        };
        let caps = vec![cap(1, Some(15.0), Some(4.0))];
        let out = run(&input, &[1], &caps, &NotesSettings::default()).unwrap();
        assert_eq!(out.statuses[&1].coef_ue, 6.0);

        input.manual_coefficient = None;
        let out = run(&input, &[1], &[cap(1, Some(15.0), None)], &NotesSettings::default()).unwrap();
        assert_eq!(out.statuses[&1].coef_ue, 2.0);

        // 未注册任何模块、也没有来源系数：结构错误
        let err = run(&input, &[3], &[cap(3, Some(15.0), None)], &NotesSettings::default())
            .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_blocked_semester() {
        let m1 = module(1, 1.0, ModuleKind::Standard);
        let r1 = result(1, &[(1, Average::Numeric(15.0))]);
        let u = ue(UeType::Standard);
        let absences = HashMap::new();
        let input = UeInput {
            ue: &u,
            modules: vec![(&m1, &r1)],
            formula: None,
            manual_coefficient: None,
            absences: &absences,
        };
        let out =
            UeAverager::compute(&input, &[1], &HashMap::new(), true, &NotesSettings::default())
                .unwrap();
        assert_eq!(out.statuses[&1].moy, Average::NotAvailable);
        assert!(!out.statuses[&1].counts());
    }
}
