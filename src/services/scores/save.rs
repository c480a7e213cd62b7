use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::ScoreService;
use crate::models::ApiResponse;
use crate::models::notes::requests::SaveScoresRequest;
use crate::models::notes::responses::SaveScoresResponse;
use crate::notes::RequestScope;
use crate::services::error_response;

pub async fn save_scores(
    service: &ScoreService,
    request: &HttpRequest,
    evaluation_id: i64,
    payload: SaveScoresRequest,
) -> ActixResult<HttpResponse> {
    let writer = service.get_writer(request);
    let scope = RequestScope::new();

    match writer
        .save_scores(&scope, evaluation_id, payload.into_pairs())
        .await
    {
        Ok(changed) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            SaveScoresResponse {
                evaluation_id,
                changed,
            },
            "Scores saved successfully",
        ))),
        Err(e) => Ok(error_response(&e, "Failed to save scores")),
    }
}
