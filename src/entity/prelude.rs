//! 预导入模块，方便使用

pub use super::absences::{ActiveModel as AbsenceActiveModel, Entity as Absences, Model as AbsenceModel};
pub use super::evaluations::{
    ActiveModel as EvaluationActiveModel, Entity as Evaluations, Model as EvaluationModel,
};
pub use super::module_enrollments::{
    ActiveModel as ModuleEnrollmentActiveModel, Entity as ModuleEnrollments,
    Model as ModuleEnrollmentModel,
};
pub use super::module_impls::{
    ActiveModel as ModuleImplActiveModel, Entity as ModuleImpls, Model as ModuleImplModel,
};
pub use super::scores::{ActiveModel as ScoreActiveModel, Entity as Scores, Model as ScoreModel};
pub use super::semester_enrollments::{
    ActiveModel as SemesterEnrollmentActiveModel, Entity as SemesterEnrollments,
    Model as SemesterEnrollmentModel,
};
pub use super::semesters::{
    ActiveModel as SemesterActiveModel, Entity as Semesters, Model as SemesterModel,
};
pub use super::ue_settings::{
    ActiveModel as UeSettingActiveModel, Entity as UeSettings, Model as UeSettingModel,
};
pub use super::ue_validations::{
    ActiveModel as UeValidationActiveModel, Entity as UeValidations, Model as UeValidationModel,
};
pub use super::ues::{ActiveModel as UeActiveModel, Entity as Ues, Model as UeModel};
