//! 评测实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "evaluations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub moduleimpl_id: i64,
    pub max_score: f64,
    pub coefficient: f64,
    /// `normal`、`catch_up` 或 `second_session`
    pub evaluation_type: String,
    pub immediate_inclusion: bool,
    #[sea_orm(nullable)]
    pub date: Option<String>,
    pub numero: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::module_impls::Entity",
        from = "Column::ModuleimplId",
        to = "super::module_impls::Column::Id"
    )]
    ModuleImpl,
    #[sea_orm(has_many = "super::scores::Entity")]
    Scores,
}

impl Related<super::module_impls::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ModuleImpl.def()
    }
}

impl Related<super::scores::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Scores.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_evaluation(self) -> crate::errors::Result<crate::models::Evaluation> {
        use crate::models::{Evaluation, EvaluationType};
        use chrono::NaiveDate;

        let date = match self.date.as_deref() {
            Some(raw) => Some(NaiveDate::parse_from_str(raw, super::DATE_FORMAT)?),
            None => None,
        };
        Ok(Evaluation {
            id: self.id,
            moduleimpl_id: self.moduleimpl_id,
            max_score: self.max_score,
            coefficient: self.coefficient,
            evaluation_type: match self.evaluation_type.as_str() {
                "catch_up" => EvaluationType::CatchUp,
                "second_session" => EvaluationType::SecondSession,
                _ => EvaluationType::Normal,
            },
            immediate_inclusion: self.immediate_inclusion,
            date,
            numero: self.numero,
        })
    }
}
