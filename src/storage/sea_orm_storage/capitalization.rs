//! 资本化的 UE 成绩与缺勤统计

use super::SeaOrmStorage;
use crate::entity::absences::{Column as AbsenceColumn, Entity as Absences};
use crate::entity::ue_validations::{Column as ValidationColumn, Entity as UeValidations};
use crate::errors::{Result, ScoDocError};
use crate::models::{AbsenceCounts, CapitalizedUe, SemesterInfo};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;

impl SeaOrmStorage {
    /// 可资本化到该学期的 UE 成绩，仅限本学期注册的学生
    pub async fn list_capitalized_ues_impl(&self, semester_id: i64) -> Result<Vec<CapitalizedUe>> {
        let target = self.require_semester(semester_id).await?;
        let students = self.list_enrolled_ids(semester_id).await?;
        if students.is_empty() {
            return Ok(Vec::new());
        }

        let sources: HashMap<i64, SemesterInfo> = self
            .list_sibling_semesters(&target)
            .await?
            .into_iter()
            .filter(|s| s.capitalizes_into(&target))
            .map(|s| (s.id, s))
            .collect();

        let models = UeValidations::find()
            .filter(ValidationColumn::StudentId.is_in(students))
            .order_by_asc(ValidationColumn::StudentId)
            .order_by_asc(ValidationColumn::EventDate)
            .all(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询已取得 UE 失败: {e}")))?;

        let mut caps = Vec::new();
        for model in models {
            let eligible = match model.source_semester_id {
                Some(source_id) => sources.contains_key(&source_id),
                None => model.is_external,
            };
            if eligible {
                caps.push(model.into_capitalized()?);
            }
        }
        Ok(caps)
    }

    /// 有学生资本化了来自该学期 UE 的其他学期
    pub async fn list_semesters_using_capitalized_ues_from_impl(
        &self,
        semester_id: i64,
    ) -> Result<Vec<i64>> {
        let Some(source) = self.get_semester_impl(semester_id).await? else {
            return Ok(Vec::new());
        };

        let mut ids = Vec::new();
        for target in self.list_sibling_semesters(&source).await? {
            if !source.capitalizes_into(&target) {
                continue;
            }
            let students = self.list_enrolled_ids(target.id).await?;
            if students.is_empty() {
                continue;
            }
            let used = UeValidations::find()
                .filter(ValidationColumn::SourceSemesterId.eq(semester_id))
                .filter(ValidationColumn::StudentId.is_in(students))
                .count(&self.db)
                .await
                .map_err(|e| {
                    ScoDocError::database_operation(format!("查询已取得 UE 失败: {e}"))
                })?;
            if used > 0 {
                ids.push(target.id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    pub async fn get_absence_counts_impl(
        &self,
        semester_id: i64,
    ) -> Result<HashMap<i64, AbsenceCounts>> {
        let models = Absences::find()
            .filter(AbsenceColumn::SemesterId.eq(semester_id))
            .all(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询缺勤失败: {e}")))?;

        Ok(models
            .into_iter()
            .map(|m| (m.student_id, m.counts()))
            .collect())
    }
}
