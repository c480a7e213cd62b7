//! 学期注册实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "semester_enrollments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub semester_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,
    /// `I`、`D` 或 `DEF`
    pub state: String,
    pub sort_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::semesters::Entity",
        from = "Column::SemesterId",
        to = "super::semesters::Column::Id"
    )]
    Semester,
}

impl Related<super::semesters::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Semester.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_enrollment(self) -> crate::models::Enrollment {
        use crate::models::{Enrollment, EnrollmentState};

        Enrollment {
            student_id: self.student_id,
            state: EnrollmentState::from_code(&self.state).unwrap_or_default(),
            sort_name: self.sort_name,
        }
    }
}
