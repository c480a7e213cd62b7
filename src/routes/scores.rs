use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::models::notes::requests::{
    CoefficientRequest, EnrollStudentsRequest, EnrollmentStateRequest, FormulaRequest,
    SaveScoresRequest, UeCoefficientRequest,
};
use crate::services::ScoreService;

// 懒加载的全局 SCORE_SERVICE 实例
static SCORE_SERVICE: Lazy<ScoreService> = Lazy::new(ScoreService::new_lazy);

pub async fn save_scores(
    req: HttpRequest,
    evaluation_id: web::Path<i64>,
    payload: web::Json<SaveScoresRequest>,
) -> ActixResult<HttpResponse> {
    SCORE_SERVICE
        .save_scores(&req, evaluation_id.into_inner(), payload.into_inner())
        .await
}

pub async fn set_evaluation_coefficient(
    req: HttpRequest,
    evaluation_id: web::Path<i64>,
    payload: web::Json<CoefficientRequest>,
) -> ActixResult<HttpResponse> {
    SCORE_SERVICE
        .set_evaluation_coefficient(&req, evaluation_id.into_inner(), payload.into_inner())
        .await
}

pub async fn set_module_formula(
    req: HttpRequest,
    moduleimpl_id: web::Path<i64>,
    payload: web::Json<FormulaRequest>,
) -> ActixResult<HttpResponse> {
    SCORE_SERVICE
        .set_module_formula(&req, moduleimpl_id.into_inner(), payload.into_inner())
        .await
}

pub async fn set_module_coefficient(
    req: HttpRequest,
    moduleimpl_id: web::Path<i64>,
    payload: web::Json<CoefficientRequest>,
) -> ActixResult<HttpResponse> {
    SCORE_SERVICE
        .set_module_coefficient(&req, moduleimpl_id.into_inner(), payload.into_inner())
        .await
}

pub async fn set_ue_formula(
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
    payload: web::Json<FormulaRequest>,
) -> ActixResult<HttpResponse> {
    let (semester_id, ue_id) = path.into_inner();
    SCORE_SERVICE
        .set_ue_formula(&req, semester_id, ue_id, payload.into_inner())
        .await
}

pub async fn set_ue_capitalization_coefficient(
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
    payload: web::Json<UeCoefficientRequest>,
) -> ActixResult<HttpResponse> {
    let (semester_id, ue_id) = path.into_inner();
    SCORE_SERVICE
        .set_ue_capitalization_coefficient(&req, semester_id, ue_id, payload.into_inner())
        .await
}

pub async fn set_enrollment_state(
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
    payload: web::Json<EnrollmentStateRequest>,
) -> ActixResult<HttpResponse> {
    let (semester_id, student_id) = path.into_inner();
    SCORE_SERVICE
        .set_enrollment_state(&req, semester_id, student_id, payload.into_inner())
        .await
}

pub async fn enroll_students(
    req: HttpRequest,
    semester_id: web::Path<i64>,
    payload: web::Json<EnrollStudentsRequest>,
) -> ActixResult<HttpResponse> {
    SCORE_SERVICE
        .enroll_students(&req, semester_id.into_inner(), payload.into_inner())
        .await
}

// 配置路由
pub fn configure_scores_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/evaluations/{evaluation_id}")
            .route("/scores", web::put().to(save_scores))
            .route("/coefficient", web::put().to(set_evaluation_coefficient)),
    )
    .service(
        web::scope("/api/v1/modules/{moduleimpl_id}")
            .route("/formula", web::put().to(set_module_formula))
            .route("/coefficient", web::put().to(set_module_coefficient)),
    )
    .service(
        web::resource("/api/v1/semesters/{semester_id}/ues/{ue_id}/formula")
            .route(web::put().to(set_ue_formula)),
    )
    .service(
        web::resource("/api/v1/semesters/{semester_id}/ues/{ue_id}/coefficient")
            .route(web::put().to(set_ue_capitalization_coefficient)),
    )
    .service(
        web::resource("/api/v1/semesters/{semester_id}/students/{student_id}/state")
            .route(web::put().to(set_enrollment_state)),
    )
    .service(
        web::resource("/api/v1/semesters/{semester_id}/enrollments")
            .route(web::post().to(enroll_students)),
    );
}
