use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::NotesService;
use crate::models::ApiResponse;
use crate::models::notes::responses::UeListResponse;
use crate::notes::RequestScope;
use crate::services::error_response;

pub async fn list_ues(
    service: &NotesService,
    request: &HttpRequest,
    semester_id: i64,
) -> ActixResult<HttpResponse> {
    let cache = service.get_cache(request);
    let scope = RequestScope::new();

    match cache.get(&scope, semester_id).await {
        Ok(table) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            UeListResponse::from_table(&table),
            "UE list retrieved successfully",
        ))),
        Err(e) => Ok(error_response(&e, "Failed to compute semester results")),
    }
}
