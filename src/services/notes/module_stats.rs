use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::NotesService;
use crate::models::notes::responses::ModuleStatsResponse;
use crate::models::{ApiResponse, ErrorCode};
use crate::notes::RequestScope;
use crate::services::error_response;

pub async fn module_stats(
    service: &NotesService,
    request: &HttpRequest,
    semester_id: i64,
    moduleimpl_id: i64,
) -> ActixResult<HttpResponse> {
    let cache = service.get_cache(request);
    let scope = RequestScope::new();

    let table = match cache.get(&scope, semester_id).await {
        Ok(table) => table,
        Err(e) => return Ok(error_response(&e, "Failed to compute semester results")),
    };

    match ModuleStatsResponse::from_table(&table, moduleimpl_id) {
        Some(stats) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            stats,
            "Module statistics retrieved successfully",
        ))),
        None => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::ModuleNotFound,
            format!("Module {moduleimpl_id} not found in semester {semester_id}"),
        ))),
    }
}
