//! UE 实体（属于培养方案，不属于某个学期）

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ues")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub formation_code: String,
    pub ue_code: String,
    pub acronym: String,
    pub title: String,
    #[sea_orm(nullable)]
    pub ects: Option<f64>,
    #[sea_orm(nullable)]
    pub coefficient: Option<f64>,
    /// `standard` 或 `sport`
    pub ue_type: String,
    pub is_external: bool,
    pub numero: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::module_impls::Entity")]
    ModuleImpls,
}

impl Related<super::module_impls::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ModuleImpls.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_ue(self) -> crate::models::UeInfo {
        use crate::models::{UeInfo, UeType};

        UeInfo {
            id: self.id,
            ue_code: self.ue_code,
            acronym: self.acronym,
            title: self.title,
            ects: self.ects,
            coefficient: self.coefficient,
            ue_type: match self.ue_type.as_str() {
                "sport" => UeType::Sport,
                "internship" => UeType::Internship,
                "elective" => UeType::Elective,
                "professional" => UeType::Professional,
                _ => UeType::Standard,
            },
            is_external: self.is_external,
            numero: self.numero,
        }
    }
}
