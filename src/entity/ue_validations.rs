//! 已取得的 UE 成绩（资本化来源）

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ue_validations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub ue_code: String,
    #[sea_orm(nullable)]
    pub average: Option<f64>,
    /// 外部 UE 为空
    #[sea_orm(nullable)]
    pub source_semester_id: Option<i64>,
    #[sea_orm(nullable)]
    pub coefficient: Option<f64>,
    pub is_external: bool,
    pub event_date: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_capitalized(self) -> crate::errors::Result<crate::models::CapitalizedUe> {
        use crate::models::CapitalizedUe;
        use chrono::NaiveDate;

        Ok(CapitalizedUe {
            student_id: self.student_id,
            ue_code: self.ue_code,
            average: self.average,
            source_semester_id: self.source_semester_id,
            coefficient: self.coefficient,
            is_external: self.is_external,
            event_date: NaiveDate::parse_from_str(&self.event_date, super::DATE_FORMAT)?,
        })
    }
}
