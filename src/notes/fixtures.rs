//! 测试用的学期数据
//!
//! 一个学期、一个 UE（ECTS 3）、一个模块（系数 1.5）、两个评测（系数 1 和 2，满分 20）、两个学生。

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::models::{
    Enrollment, EnrollmentState, Evaluation, EvaluationType, ModuleImplInfo, ModuleKind, Score,
    SemesterInfo, UeInfo, UeType,
};
use crate::notes::loader::SemesterData;
use crate::storage::MemoryStorage;

pub const FORMATION: &str = "INFO-BUT";
pub const SEMESTER: i64 = 1;
pub const UE: i64 = 10;
pub const MODULE: i64 = 100;
pub const EVAL_1: i64 = 1000;
pub const EVAL_2: i64 = 1001;
pub const STUDENT_1: i64 = 1;
pub const STUDENT_2: i64 = 2;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn semester() -> SemesterInfo {
    SemesterInfo {
        id: SEMESTER,
        title: "Semestre 1".into(),
        formation_code: FORMATION.into(),
        semester_index: 1,
        date_debut: date(2024, 9, 1),
        date_fin: date(2025, 1, 31),
        block_moyennes: false,
        use_ue_coefs: false,
    }
}

/// 同一培养方案、同一序号的后续学期（重修）
pub fn later_semester(id: i64) -> SemesterInfo {
    SemesterInfo {
        id,
        title: "Semestre 1 (redoublants)".into(),
        date_debut: date(2025, 9, 1),
        date_fin: date(2026, 1, 31),
        ..semester()
    }
}

pub fn ue() -> UeInfo {
    UeInfo {
        id: UE,
        ue_code: "UE11".into(),
        acronym: "UE1".into(),
        title: "Informatique".into(),
        ects: Some(3.0),
        coefficient: Some(1.0),
        ue_type: UeType::Standard,
        is_external: false,
        numero: 1,
    }
}

pub fn module(semester_id: i64, id: i64) -> ModuleImplInfo {
    ModuleImplInfo {
        id,
        semester_id,
        ue_id: UE,
        code: "M1101".into(),
        title: "Algorithmique".into(),
        coefficient: 1.5,
        kind: ModuleKind::Standard,
        formula: None,
        numero: 1,
    }
}

pub fn evaluation(moduleimpl_id: i64, id: i64, coefficient: f64, numero: i32) -> Evaluation {
    Evaluation {
        id,
        moduleimpl_id,
        max_score: 20.0,
        coefficient,
        evaluation_type: EvaluationType::Normal,
        immediate_inclusion: false,
        date: None,
        numero,
    }
}

pub fn enrollments() -> Vec<Enrollment> {
    vec![
        Enrollment {
            student_id: STUDENT_1,
            state: EnrollmentState::Enrolled,
            sort_name: "ALPHA Ada".into(),
        },
        Enrollment {
            student_id: STUDENT_2,
            state: EnrollmentState::Enrolled,
            sort_name: "BETA Bob".into(),
        },
    ]
}

fn scores() -> Vec<(i64, i64, Score)> {
    vec![
        (EVAL_1, STUDENT_1, Score::Numeric(12.0)),
        (EVAL_2, STUDENT_1, Score::Numeric(13.0)),
        (EVAL_1, STUDENT_2, Score::Numeric(6.0)),
        (EVAL_2, STUDENT_2, Score::Numeric(4.33)),
    ]
}

pub fn sample_data() -> SemesterData {
    let mut score_map: HashMap<i64, HashMap<i64, Score>> = HashMap::new();
    for (eval, student, score) in scores() {
        score_map.entry(eval).or_default().insert(student, score);
    }
    SemesterData {
        semester: semester(),
        ues: vec![ue()],
        modules: vec![module(SEMESTER, MODULE)],
        evaluations: HashMap::from([(
            MODULE,
            vec![evaluation(MODULE, EVAL_1, 1.0, 1), evaluation(MODULE, EVAL_2, 2.0, 2)],
        )]),
        scores: score_map,
        enrollments: enrollments(),
        module_enrollments: HashMap::from([(MODULE, HashSet::from([STUDENT_1, STUDENT_2]))]),
        ue_formulas: HashMap::new(),
        ue_coefficients: HashMap::new(),
        capitalized: Vec::new(),
        absences: HashMap::new(),
    }
}

/// 与 `sample_data()` 内容相同的内存存储
pub fn sample_storage() -> MemoryStorage {
    let storage = MemoryStorage::new();
    storage.insert_semester(semester());
    storage.insert_ue(FORMATION, ue());
    storage.insert_module(module(SEMESTER, MODULE));
    storage.insert_evaluation(evaluation(MODULE, EVAL_1, 1.0, 1));
    storage.insert_evaluation(evaluation(MODULE, EVAL_2, 2.0, 2));
    for (eval, student, score) in scores() {
        storage.insert_score(eval, student, score);
    }
    for enrollment in enrollments() {
        storage.enroll(SEMESTER, enrollment, &[MODULE]);
    }
    storage
}
