use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::NotesService;
use crate::models::notes::responses::SemesterResultsResponse;
use crate::models::{ApiResponse, PaginationQuery};
use crate::notes::RequestScope;
use crate::services::error_response;

pub async fn semester_results(
    service: &NotesService,
    request: &HttpRequest,
    semester_id: i64,
    query: PaginationQuery,
) -> ActixResult<HttpResponse> {
    let cache = service.get_cache(request);
    let scope = RequestScope::new();

    match cache.get(&scope, semester_id).await {
        Ok(table) => {
            let rows = query.paginate(SemesterResultsResponse::rows(&table));
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                SemesterResultsResponse::from_table(&table, rows),
                "Semester results retrieved successfully",
            )))
        }
        Err(e) => Ok(error_response(&e, "Failed to compute semester results")),
    }
}
