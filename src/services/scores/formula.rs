use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::ScoreService;
use crate::models::ApiResponse;
use crate::models::notes::requests::FormulaRequest;
use crate::notes::RequestScope;
use crate::services::error_response;

pub async fn set_module_formula(
    service: &ScoreService,
    request: &HttpRequest,
    moduleimpl_id: i64,
    payload: FormulaRequest,
) -> ActixResult<HttpResponse> {
    let writer = service.get_writer(request);
    let scope = RequestScope::new();

    match writer
        .set_module_formula(&scope, moduleimpl_id, payload.formula)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty(
            "Module formula updated successfully",
        ))),
        Err(e) => Ok(error_response(&e, "Failed to update module formula")),
    }
}

pub async fn set_ue_formula(
    service: &ScoreService,
    request: &HttpRequest,
    semester_id: i64,
    ue_id: i64,
    payload: FormulaRequest,
) -> ActixResult<HttpResponse> {
    let writer = service.get_writer(request);
    let scope = RequestScope::new();

    match writer
        .set_ue_formula(&scope, semester_id, ue_id, payload.formula)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty(
            "UE formula updated successfully",
        ))),
        Err(e) => Ok(error_response(&e, "Failed to update UE formula")),
    }
}
