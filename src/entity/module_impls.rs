//! 模块实例实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "module_impls")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub semester_id: i64,
    pub ue_id: i64,
    pub code: String,
    pub title: String,
    pub coefficient: f64,
    /// `standard` 或 `malus`
    pub kind: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub formula: Option<String>,
    pub numero: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::semesters::Entity",
        from = "Column::SemesterId",
        to = "super::semesters::Column::Id"
    )]
    Semester,
    #[sea_orm(
        belongs_to = "super::ues::Entity",
        from = "Column::UeId",
        to = "super::ues::Column::Id"
    )]
    Ue,
    #[sea_orm(has_many = "super::evaluations::Entity")]
    Evaluations,
}

impl Related<super::semesters::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Semester.def()
    }
}

impl Related<super::ues::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ue.def()
    }
}

impl Related<super::evaluations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Evaluations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_module(self) -> crate::models::ModuleImplInfo {
        use crate::models::{ModuleImplInfo, ModuleKind};

        ModuleImplInfo {
            id: self.id,
            semester_id: self.semester_id,
            ue_id: self.ue_id,
            code: self.code,
            title: self.title,
            coefficient: self.coefficient,
            kind: match self.kind.as_str() {
                "malus" => ModuleKind::Malus,
                _ => ModuleKind::Standard,
            },
            formula: self.formula,
            numero: self.numero,
        }
    }
}
