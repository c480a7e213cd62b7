use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::NotesService;
use crate::models::notes::responses::StudentResultsResponse;
use crate::models::{ApiResponse, ErrorCode};
use crate::notes::RequestScope;
use crate::services::error_response;

pub async fn student_results(
    service: &NotesService,
    request: &HttpRequest,
    semester_id: i64,
    student_id: i64,
) -> ActixResult<HttpResponse> {
    let cache = service.get_cache(request);
    let scope = RequestScope::new();

    let table = match cache.get(&scope, semester_id).await {
        Ok(table) => table,
        Err(e) => return Ok(error_response(&e, "Failed to compute semester results")),
    };

    match StudentResultsResponse::from_table(&table, student_id) {
        Some(results) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            results,
            "Student results retrieved successfully",
        ))),
        None => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::StudentNotEnrolled,
            format!("Student {student_id} is not enrolled in semester {semester_id}"),
        ))),
    }
}
