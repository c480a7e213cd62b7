pub mod coefficient;
pub mod enrollment;
pub mod formula;
pub mod save;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::notes::requests::{
    CoefficientRequest, EnrollStudentsRequest, EnrollmentStateRequest, FormulaRequest,
    SaveScoresRequest, UeCoefficientRequest,
};
use crate::notes::NotesWriter;

/// 写操作：成绩录入、系数、公式、注册状态
pub struct ScoreService {
    writer: Option<Arc<NotesWriter>>,
}

impl ScoreService {
    pub fn new_lazy() -> Self {
        Self { writer: None }
    }

    pub fn with_writer(writer: Arc<NotesWriter>) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    pub(crate) fn get_writer(&self, request: &HttpRequest) -> Arc<NotesWriter> {
        if let Some(writer) = &self.writer {
            writer.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<NotesWriter>>>()
                .expect("NotesWriter not found in app data")
                .get_ref()
                .clone()
        }
    }

    // 录入/修改/删除一次评测的成绩
    pub async fn save_scores(
        &self,
        request: &HttpRequest,
        evaluation_id: i64,
        payload: SaveScoresRequest,
    ) -> ActixResult<HttpResponse> {
        save::save_scores(self, request, evaluation_id, payload).await
    }

    pub async fn set_module_formula(
        &self,
        request: &HttpRequest,
        moduleimpl_id: i64,
        payload: FormulaRequest,
    ) -> ActixResult<HttpResponse> {
        formula::set_module_formula(self, request, moduleimpl_id, payload).await
    }

    pub async fn set_ue_formula(
        &self,
        request: &HttpRequest,
        semester_id: i64,
        ue_id: i64,
        payload: FormulaRequest,
    ) -> ActixResult<HttpResponse> {
        formula::set_ue_formula(self, request, semester_id, ue_id, payload).await
    }

    pub async fn set_evaluation_coefficient(
        &self,
        request: &HttpRequest,
        evaluation_id: i64,
        payload: CoefficientRequest,
    ) -> ActixResult<HttpResponse> {
        coefficient::set_evaluation_coefficient(self, request, evaluation_id, payload).await
    }

    pub async fn set_module_coefficient(
        &self,
        request: &HttpRequest,
        moduleimpl_id: i64,
        payload: CoefficientRequest,
    ) -> ActixResult<HttpResponse> {
        coefficient::set_module_coefficient(self, request, moduleimpl_id, payload).await
    }

    pub async fn set_ue_capitalization_coefficient(
        &self,
        request: &HttpRequest,
        semester_id: i64,
        ue_id: i64,
        payload: UeCoefficientRequest,
    ) -> ActixResult<HttpResponse> {
        coefficient::set_ue_capitalization_coefficient(self, request, semester_id, ue_id, payload)
            .await
    }

    pub async fn set_enrollment_state(
        &self,
        request: &HttpRequest,
        semester_id: i64,
        student_id: i64,
        payload: EnrollmentStateRequest,
    ) -> ActixResult<HttpResponse> {
        enrollment::set_enrollment_state(self, request, semester_id, student_id, payload).await
    }

    pub async fn enroll_students(
        &self,
        request: &HttpRequest,
        semester_id: i64,
        payload: EnrollStudentsRequest,
    ) -> ActixResult<HttpResponse> {
        enrollment::enroll_students(self, request, semester_id, payload).await
    }
}
