//! 学期内的 UE 设置：公式与资本化系数

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ue_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub semester_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub ue_id: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub formula: Option<String>,
    #[sea_orm(nullable)]
    pub coefficient: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
