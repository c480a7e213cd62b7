//! 学期、UE、模块实例与学期内 UE 设置

use super::SeaOrmStorage;
use crate::entity::module_impls::{Column as ModuleColumn, Entity as ModuleImpls};
use crate::entity::semesters::{Column as SemesterColumn, Entity as Semesters};
use crate::entity::ue_settings::{ActiveModel as UeSettingActiveModel, Column as UeSettingColumn, Entity as UeSettings};
use crate::entity::ues::{Column as UeColumn, Entity as Ues};
use crate::errors::{Result, ScoDocError};
use crate::models::{ModuleImplInfo, SemesterInfo, UeInfo};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::collections::HashMap;

impl SeaOrmStorage {
    /// 通过 ID 获取学期
    pub async fn get_semester_impl(&self, semester_id: i64) -> Result<Option<SemesterInfo>> {
        let result = Semesters::find_by_id(semester_id)
            .one(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询学期失败: {e}")))?;

        result.map(|m| m.into_semester()).transpose()
    }

    /// 同一培养方案、同一序号的学期（资本化候选）
    pub(crate) async fn list_sibling_semesters(&self, semester: &SemesterInfo) -> Result<Vec<SemesterInfo>> {
        let models = Semesters::find()
            .filter(SemesterColumn::FormationCode.eq(semester.formation_code.as_str()))
            .filter(SemesterColumn::SemesterIndex.eq(semester.semester_index))
            .all(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询学期失败: {e}")))?;

        models.into_iter().map(|m| m.into_semester()).collect()
    }

    /// 学期所属培养方案的全部 UE
    pub async fn list_ues_impl(&self, semester_id: i64) -> Result<Vec<UeInfo>> {
        let semester = self.require_semester(semester_id).await?;
        let models = Ues::find()
            .filter(UeColumn::FormationCode.eq(semester.formation_code))
            .order_by_asc(UeColumn::Numero)
            .order_by_asc(UeColumn::Id)
            .all(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询 UE 失败: {e}")))?;

        Ok(models.into_iter().map(|m| m.into_ue()).collect())
    }

    pub async fn list_modules_impl(&self, semester_id: i64) -> Result<Vec<ModuleImplInfo>> {
        let models = ModuleImpls::find()
            .filter(ModuleColumn::SemesterId.eq(semester_id))
            .order_by_asc(ModuleColumn::Numero)
            .order_by_asc(ModuleColumn::Id)
            .all(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询模块失败: {e}")))?;

        Ok(models.into_iter().map(|m| m.into_module()).collect())
    }

    pub async fn get_module_impl(&self, moduleimpl_id: i64) -> Result<Option<ModuleImplInfo>> {
        let result = ModuleImpls::find_by_id(moduleimpl_id)
            .one(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询模块失败: {e}")))?;

        Ok(result.map(|m| m.into_module()))
    }

    pub async fn set_module_coefficient_impl(
        &self,
        moduleimpl_id: i64,
        coefficient: f64,
    ) -> Result<bool> {
        let result = ModuleImpls::update_many()
            .col_expr(ModuleColumn::Coefficient, Expr::value(coefficient))
            .filter(ModuleColumn::Id.eq(moduleimpl_id))
            .exec(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("更新模块系数失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    pub async fn set_module_formula_impl(
        &self,
        moduleimpl_id: i64,
        formula: Option<String>,
    ) -> Result<bool> {
        let result = ModuleImpls::update_many()
            .col_expr(ModuleColumn::Formula, Expr::value(formula))
            .filter(ModuleColumn::Id.eq(moduleimpl_id))
            .exec(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("更新模块公式失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    async fn list_ue_settings(&self, semester_id: i64) -> Result<Vec<crate::entity::ue_settings::Model>> {
        UeSettings::find()
            .filter(UeSettingColumn::SemesterId.eq(semester_id))
            .all(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询 UE 设置失败: {e}")))
    }

    pub async fn get_ue_formulas_impl(&self, semester_id: i64) -> Result<HashMap<i64, String>> {
        Ok(self
            .list_ue_settings(semester_id)
            .await?
            .into_iter()
            .filter_map(|s| s.formula.map(|f| (s.ue_id, f)))
            .collect())
    }

    pub async fn get_ue_coefficients_impl(&self, semester_id: i64) -> Result<HashMap<i64, f64>> {
        Ok(self
            .list_ue_settings(semester_id)
            .await?
            .into_iter()
            .filter_map(|s| s.coefficient.map(|c| (s.ue_id, c)))
            .collect())
    }

    /// 写入 (学期, UE) 设置的某一列，其余列保持不变
    async fn upsert_ue_setting(
        &self,
        model: UeSettingActiveModel,
        column: UeSettingColumn,
    ) -> Result<()> {
        UeSettings::insert(model)
            .on_conflict(
                OnConflict::columns([UeSettingColumn::SemesterId, UeSettingColumn::UeId])
                    .update_column(column)
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("更新 UE 设置失败: {e}")))?;
        Ok(())
    }

    pub async fn set_ue_formula_impl(
        &self,
        semester_id: i64,
        ue_id: i64,
        formula: Option<String>,
    ) -> Result<()> {
        let model = UeSettingActiveModel {
            semester_id: Set(semester_id),
            ue_id: Set(ue_id),
            formula: Set(formula),
            coefficient: Set(None),
        };
        self.upsert_ue_setting(model, UeSettingColumn::Formula).await
    }

    pub async fn set_ue_coefficient_impl(
        &self,
        semester_id: i64,
        ue_id: i64,
        coefficient: Option<f64>,
    ) -> Result<()> {
        let model = UeSettingActiveModel {
            semester_id: Set(semester_id),
            ue_id: Set(ue_id),
            formula: Set(None),
            coefficient: Set(coefficient),
        };
        self.upsert_ue_setting(model, UeSettingColumn::Coefficient)
            .await
    }
}
