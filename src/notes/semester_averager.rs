//! 学期总平均

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::UeWeighting;
use crate::models::{Average, SemesterInfo, UeInfo, UeType};
use crate::notes::NotesSettings;
use crate::notes::bonus::{self, BonusContext};
use crate::notes::ue_averager::UeStatus;

/// 学生的学期总平均
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralAverage {
    pub average: Average,
    pub sum_coefs: f64,
    /// 计入平均的 UE 数
    pub nb_notes: usize,
    /// 已注册但没有可用平均的 UE 数
    pub nb_missing: usize,
    pub ects_pot: f64,
    #[serde(default)]
    pub ects_pot_fond: f64,
    #[serde(default)]
    pub ects_pot_pro: f64,
    /// 已加到平均上的加分
    pub bonus: f64,
}

impl GeneralAverage {
    fn not_available() -> Self {
        Self {
            average: Average::NotAvailable,
            sum_coefs: 0.0,
            nb_notes: 0,
            nb_missing: 0,
            ects_pot: 0.0,
            ects_pot_fond: 0.0,
            ects_pot_pro: 0.0,
            bonus: 0.0,
        }
    }
}

pub struct SemesterAverager;

impl SemesterAverager {
    /// UE 在总平均中的权重
    fn weight(ue: &UeInfo, status: &UeStatus, semester: &SemesterInfo, settings: &NotesSettings) -> f64 {
        if semester.use_ue_coefs {
            return ue.coefficient.unwrap_or(0.0);
        }
        match settings.weighting {
            UeWeighting::Ects => ue.ects.unwrap_or(0.0),
            UeWeighting::UeCoefficients => ue.coefficient.unwrap_or(0.0),
            UeWeighting::ModuleCoefficients => status.coef_ue,
        }
    }

    /// 由各 UE 状态计算一个学生的总平均
    ///
    /// `ues` 与 `statuses` 按 UE id 对应，缺少状态的 UE 视为未注册。
    pub fn compute(
        semester: &SemesterInfo,
        ues: &[UeInfo],
        statuses: &BTreeMap<i64, UeStatus>,
        settings: &NotesSettings,
    ) -> GeneralAverage {
        let mut general = GeneralAverage::not_available();
        let mut sum = 0.0;
        let mut bonus_notes = Vec::new();
        let mut bonus_coefs = Vec::new();

        for ue in ues {
            if ue.is_external {
                continue;
            }
            let Some(status) = statuses.get(&ue.id) else {
                continue;
            };
            if ue.ue_type == UeType::Sport {
                if !status.is_capitalized {
                    bonus_notes.extend_from_slice(&status.bonus_notes);
                    bonus_coefs.extend_from_slice(&status.bonus_coefs);
                }
                continue;
            }
            general.ects_pot += status.ects_pot;
            general.ects_pot_fond += status.ects_pot_fond;
            general.ects_pot_pro += status.ects_pot_pro;
            if !status.counts() {
                if status.is_enrolled {
                    general.nb_missing += 1;
                }
                continue;
            }
            let weight = Self::weight(ue, status, semester, settings);
            sum += status.moy.value_or_zero() * weight;
            general.sum_coefs += weight;
            general.nb_notes += 1;
        }

        if semester.block_moyennes || general.sum_coefs <= 0.0 {
            return general;
        }

        let mut average = sum / general.sum_coefs;
        general.bonus = bonus::compute(
            settings.bonus,
            &bonus_notes,
            &bonus_coefs,
            &BonusContext { average },
        );
        average = (average + general.bonus).min(20.0);
        general.average = Average::Numeric(average);
        general
    }
}
