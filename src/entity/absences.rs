//! 缺勤统计（半天数）

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "absences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub semester_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,
    pub total: i32,
    pub justified: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn counts(&self) -> crate::models::AbsenceCounts {
        crate::models::AbsenceCounts {
            total: self.total.max(0) as u32,
            justified: self.justified.max(0) as u32,
        }
    }
}
