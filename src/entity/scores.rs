//! 成绩实体，每个 (评测, 学生) 一行

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "scores")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub evaluation_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,
    /// `NUM`、`ABS`、`EXC` 或 `ATT`
    pub kind: String,
    #[sea_orm(nullable)]
    pub value: Option<f64>,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::evaluations::Entity",
        from = "Column::EvaluationId",
        to = "super::evaluations::Column::Id"
    )]
    Evaluation,
}

impl Related<super::evaluations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Evaluation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn score(&self) -> Option<crate::models::Score> {
        crate::models::Score::from_parts(&self.kind, self.value)
    }
}
