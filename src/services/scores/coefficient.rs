use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::ScoreService;
use crate::models::ApiResponse;
use crate::models::notes::requests::{CoefficientRequest, UeCoefficientRequest};
use crate::notes::RequestScope;
use crate::services::error_response;

pub async fn set_evaluation_coefficient(
    service: &ScoreService,
    request: &HttpRequest,
    evaluation_id: i64,
    payload: CoefficientRequest,
) -> ActixResult<HttpResponse> {
    let writer = service.get_writer(request);

    match writer
        .set_evaluation_coefficient(&RequestScope::new(), evaluation_id, payload.coefficient)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty(
            "Evaluation coefficient updated successfully",
        ))),
        Err(e) => Ok(error_response(&e, "Failed to update evaluation coefficient")),
    }
}

pub async fn set_module_coefficient(
    service: &ScoreService,
    request: &HttpRequest,
    moduleimpl_id: i64,
    payload: CoefficientRequest,
) -> ActixResult<HttpResponse> {
    let writer = service.get_writer(request);

    match writer
        .set_module_coefficient(&RequestScope::new(), moduleimpl_id, payload.coefficient)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty(
            "Module coefficient updated successfully",
        ))),
        Err(e) => Ok(error_response(&e, "Failed to update module coefficient")),
    }
}

pub async fn set_ue_capitalization_coefficient(
    service: &ScoreService,
    request: &HttpRequest,
    semester_id: i64,
    ue_id: i64,
    payload: UeCoefficientRequest,
) -> ActixResult<HttpResponse> {
    let writer = service.get_writer(request);

    match writer
        .set_ue_capitalization_coefficient(
            &RequestScope::new(),
            semester_id,
            ue_id,
            payload.coefficient,
        )
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty(
            "UE coefficient updated successfully",
        ))),
        Err(e) => Ok(error_response(&e, "Failed to update UE coefficient")),
    }
}
