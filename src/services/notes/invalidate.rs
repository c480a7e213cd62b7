use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::NotesService;
use crate::errors::{Result, ScoDocError};
use crate::models::ApiResponse;
use crate::models::notes::responses::InvalidateResponse;
use crate::notes::{RequestScope, ResultCache};
use crate::services::error_response;

async fn invalidate_closure(cache: &ResultCache, semester_id: i64) -> Result<Vec<i64>> {
    if cache.store().get_semester(semester_id).await?.is_none() {
        return Err(ScoDocError::not_found(format!(
            "semester {semester_id} not found"
        )));
    }
    let semesters = cache.dependent_semesters(semester_id).await?;
    cache
        .invalidate(&RequestScope::new(), Some(semester_id))
        .await?;
    Ok(semesters)
}

pub async fn invalidate(
    service: &NotesService,
    request: &HttpRequest,
    semester_id: i64,
) -> ActixResult<HttpResponse> {
    let cache = service.get_cache(request);

    match invalidate_closure(&cache, semester_id).await {
        Ok(semesters) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            InvalidateResponse { semesters },
            "Cached results invalidated",
        ))),
        Err(e) => Ok(error_response(&e, "Failed to invalidate cached results")),
    }
}
