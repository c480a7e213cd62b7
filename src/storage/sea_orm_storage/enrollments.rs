//! 学期与模块注册

use super::SeaOrmStorage;
use crate::entity::module_enrollments::{
    ActiveModel as ModuleEnrollmentActiveModel, Column as ModuleEnrollmentColumn,
    Entity as ModuleEnrollments,
};
use crate::entity::semester_enrollments::{
    ActiveModel as EnrollmentActiveModel, Column as EnrollmentColumn, Entity as SemesterEnrollments,
};
use crate::errors::{Result, ScoDocError};
use crate::models::{Enrollment, EnrollmentState};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait};
use std::collections::HashSet;

impl SeaOrmStorage {
    pub async fn list_enrolled_impl(&self, semester_id: i64) -> Result<Vec<Enrollment>> {
        let models = SemesterEnrollments::find()
            .filter(EnrollmentColumn::SemesterId.eq(semester_id))
            .order_by_asc(EnrollmentColumn::SortName)
            .order_by_asc(EnrollmentColumn::StudentId)
            .all(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询注册失败: {e}")))?;

        Ok(models.into_iter().map(|m| m.into_enrollment()).collect())
    }

    pub(crate) async fn list_enrolled_ids(&self, semester_id: i64) -> Result<Vec<i64>> {
        SemesterEnrollments::find()
            .select_only()
            .column(EnrollmentColumn::StudentId)
            .filter(EnrollmentColumn::SemesterId.eq(semester_id))
            .into_tuple::<i64>()
            .all(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询注册失败: {e}")))
    }

    pub async fn list_module_enrolled_impl(&self, moduleimpl_id: i64) -> Result<HashSet<i64>> {
        let ids = ModuleEnrollments::find()
            .select_only()
            .column(ModuleEnrollmentColumn::StudentId)
            .filter(ModuleEnrollmentColumn::ModuleimplId.eq(moduleimpl_id))
            .into_tuple::<i64>()
            .all(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询模块注册失败: {e}")))?;

        Ok(ids.into_iter().collect())
    }

    pub async fn set_enrollment_state_impl(
        &self,
        semester_id: i64,
        student_id: i64,
        state: EnrollmentState,
    ) -> Result<bool> {
        let result = SemesterEnrollments::update_many()
            .col_expr(EnrollmentColumn::State, Expr::value(state.code()))
            .filter(EnrollmentColumn::SemesterId.eq(semester_id))
            .filter(EnrollmentColumn::StudentId.eq(student_id))
            .exec(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("更新注册状态失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 注册学生到学期及模块；已注册时更新状态和姓名
    pub async fn enroll_student_impl(
        &self,
        semester_id: i64,
        enrollment: Enrollment,
        moduleimpl_ids: &[i64],
    ) -> Result<()> {
        self.require_semester(semester_id).await?;
        let student_id = enrollment.student_id;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ScoDocError::database_operation(format!("开启事务失败: {e}")))?;

        let model = EnrollmentActiveModel {
            semester_id: Set(semester_id),
            student_id: Set(student_id),
            state: Set(enrollment.state.code().to_string()),
            sort_name: Set(enrollment.sort_name),
        };
        SemesterEnrollments::insert(model)
            .on_conflict(
                OnConflict::columns([EnrollmentColumn::SemesterId, EnrollmentColumn::StudentId])
                    .update_columns([EnrollmentColumn::State, EnrollmentColumn::SortName])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("注册学生失败: {e}")))?;

        let already: HashSet<i64> = ModuleEnrollments::find()
            .select_only()
            .column(ModuleEnrollmentColumn::ModuleimplId)
            .filter(ModuleEnrollmentColumn::StudentId.eq(student_id))
            .into_tuple::<i64>()
            .all(&txn)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询模块注册失败: {e}")))?
            .into_iter()
            .collect();

        let missing: HashSet<i64> = moduleimpl_ids
            .iter()
            .copied()
            .filter(|id| !already.contains(id))
            .collect();
        for moduleimpl_id in missing {
            let model = ModuleEnrollmentActiveModel {
                moduleimpl_id: Set(moduleimpl_id),
                student_id: Set(student_id),
            };
            ModuleEnrollments::insert(model)
                .exec_without_returning(&txn)
                .await
                .map_err(|e| ScoDocError::database_operation(format!("注册模块失败: {e}")))?;
        }

        txn.commit()
            .await
            .map_err(|e| ScoDocError::database_operation(format!("提交事务失败: {e}")))?;
        Ok(())
    }
}
