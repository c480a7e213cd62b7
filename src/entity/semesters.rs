//! 学期实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "semesters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub formation_code: String,
    pub semester_index: i32,
    /// `YYYY-MM-DD`
    pub date_debut: String,
    pub date_fin: String,
    pub block_moyennes: bool,
    pub use_ue_coefs: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::module_impls::Entity")]
    ModuleImpls,
    #[sea_orm(has_many = "super::semester_enrollments::Entity")]
    Enrollments,
}

impl Related<super::module_impls::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ModuleImpls.def()
    }
}

impl Related<super::semester_enrollments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_semester(self) -> crate::errors::Result<crate::models::SemesterInfo> {
        use crate::models::SemesterInfo;
        use chrono::NaiveDate;

        Ok(SemesterInfo {
            id: self.id,
            title: self.title,
            formation_code: self.formation_code,
            semester_index: self.semester_index,
            date_debut: NaiveDate::parse_from_str(&self.date_debut, super::DATE_FORMAT)?,
            date_fin: NaiveDate::parse_from_str(&self.date_fin, super::DATE_FORMAT)?,
            block_moyennes: self.block_moyennes,
            use_ue_coefs: self.use_ue_coefs,
        })
    }
}
