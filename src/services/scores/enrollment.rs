use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::ScoreService;
use crate::models::ApiResponse;
use crate::models::notes::requests::{EnrollStudentsRequest, EnrollmentStateRequest};
use crate::models::notes::responses::EnrollStudentsResponse;
use crate::notes::RequestScope;
use crate::services::error_response;

pub async fn set_enrollment_state(
    service: &ScoreService,
    request: &HttpRequest,
    semester_id: i64,
    student_id: i64,
    payload: EnrollmentStateRequest,
) -> ActixResult<HttpResponse> {
    let writer = service.get_writer(request);
    let scope = RequestScope::new();

    match writer
        .set_enrollment_state(&scope, semester_id, student_id, payload.state)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty(
            "Enrollment state updated successfully",
        ))),
        Err(e) => Ok(error_response(&e, "Failed to update enrollment state")),
    }
}

pub async fn enroll_students(
    service: &ScoreService,
    request: &HttpRequest,
    semester_id: i64,
    payload: EnrollStudentsRequest,
) -> ActixResult<HttpResponse> {
    let writer = service.get_writer(request);
    let scope = RequestScope::new();

    match writer
        .enroll_students(&scope, semester_id, payload.into_enrollments())
        .await
    {
        Ok(enrolled) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            EnrollStudentsResponse {
                semester_id,
                enrolled,
            },
            "Students enrolled successfully",
        ))),
        Err(e) => Ok(error_response(&e, "Failed to enroll students")),
    }
}
