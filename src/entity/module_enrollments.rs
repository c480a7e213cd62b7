//! 模块注册实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "module_enrollments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub moduleimpl_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::module_impls::Entity",
        from = "Column::ModuleimplId",
        to = "super::module_impls::Column::Id"
    )]
    ModuleImpl,
}

impl Related<super::module_impls::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ModuleImpl.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
