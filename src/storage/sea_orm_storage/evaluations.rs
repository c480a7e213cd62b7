//! 评测与成绩存储操作

use super::SeaOrmStorage;
use crate::entity::evaluations::{Column as EvaluationColumn, Entity as Evaluations};
use crate::entity::scores::{ActiveModel as ScoreActiveModel, Column as ScoreColumn, Entity as Scores};
use crate::errors::{Result, ScoDocError};
use crate::models::{Evaluation, Score};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait};
use std::collections::HashMap;
use tracing::warn;

impl SeaOrmStorage {
    pub async fn list_evaluations_impl(&self, moduleimpl_id: i64) -> Result<Vec<Evaluation>> {
        let models = Evaluations::find()
            .filter(EvaluationColumn::ModuleimplId.eq(moduleimpl_id))
            .order_by_asc(EvaluationColumn::Numero)
            .order_by_asc(EvaluationColumn::Id)
            .all(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询评测失败: {e}")))?;

        models.into_iter().map(|m| m.into_evaluation()).collect()
    }

    pub async fn get_evaluation_impl(&self, evaluation_id: i64) -> Result<Option<Evaluation>> {
        let result = Evaluations::find_by_id(evaluation_id)
            .one(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询评测失败: {e}")))?;

        result.map(|m| m.into_evaluation()).transpose()
    }

    pub async fn set_evaluation_coefficient_impl(
        &self,
        evaluation_id: i64,
        coefficient: f64,
    ) -> Result<bool> {
        let result = Evaluations::update_many()
            .col_expr(EvaluationColumn::Coefficient, Expr::value(coefficient))
            .filter(EvaluationColumn::Id.eq(evaluation_id))
            .exec(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("更新评测系数失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 评测的全部成绩，无法识别的行被跳过
    pub async fn get_scores_impl(&self, evaluation_id: i64) -> Result<HashMap<i64, Score>> {
        let models = Scores::find()
            .filter(ScoreColumn::EvaluationId.eq(evaluation_id))
            .all(&self.db)
            .await
            .map_err(|e| ScoDocError::database_operation(format!("查询成绩失败: {e}")))?;

        let mut scores = HashMap::with_capacity(models.len());
        for model in models {
            match model.score() {
                Some(score) => {
                    scores.insert(model.student_id, score);
                }
                None => warn!(
                    "Ignoring malformed score of student {} in evaluation {} (kind {})",
                    model.student_id, evaluation_id, model.kind
                ),
            }
        }
        Ok(scores)
    }

    /// 在一个事务中保存成绩，返回实际变更的条数
    pub async fn save_scores_impl(
        &self,
        evaluation_id: i64,
        scores: &[(i64, Option<Score>)],
    ) -> Result<usize> {
        if self.get_evaluation_impl(evaluation_id).await?.is_none() {
            return Err(ScoDocError::not_found(format!(
                "evaluation {evaluation_id} not found"
            )));
        }
        let existing = self.get_scores_impl(evaluation_id).await?;
        let now = chrono::Utc::now().timestamp();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ScoDocError::database_operation(format!("开启事务失败: {e}")))?;

        let mut changed = 0;
        for (student_id, score) in scores {
            if existing.get(student_id) == score.as_ref() {
                continue;
            }
            match score {
                Some(score) => {
                    let model = ScoreActiveModel {
                        evaluation_id: Set(evaluation_id),
                        student_id: Set(*student_id),
                        kind: Set(score.kind_code().to_string()),
                        value: Set(score.numeric_value()),
                        updated_at: Set(now),
                    };
                    Scores::insert(model)
                        .on_conflict(
                            OnConflict::columns([ScoreColumn::EvaluationId, ScoreColumn::StudentId])
                                .update_columns([
                                    ScoreColumn::Kind,
                                    ScoreColumn::Value,
                                    ScoreColumn::UpdatedAt,
                                ])
                                .to_owned(),
                        )
                        .exec_without_returning(&txn)
                        .await
                        .map_err(|e| {
                            ScoDocError::database_operation(format!("保存成绩失败: {e}"))
                        })?;
                }
                None => {
                    Scores::delete_many()
                        .filter(ScoreColumn::EvaluationId.eq(evaluation_id))
                        .filter(ScoreColumn::StudentId.eq(*student_id))
                        .exec(&txn)
                        .await
                        .map_err(|e| {
                            ScoDocError::database_operation(format!("删除成绩失败: {e}"))
                        })?;
                }
            }
            changed += 1;
        }

        txn.commit()
            .await
            .map_err(|e| ScoDocError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(changed)
    }
}
