use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::models::PaginationQuery;
use crate::services::NotesService;

// 懒加载的全局 NOTES_SERVICE 实例
static NOTES_SERVICE: Lazy<NotesService> = Lazy::new(NotesService::new_lazy);

pub async fn semester_results(
    req: HttpRequest,
    semester_id: web::Path<i64>,
    query: web::Query<PaginationQuery>,
) -> ActixResult<HttpResponse> {
    NOTES_SERVICE
        .semester_results(&req, semester_id.into_inner(), query.into_inner())
        .await
}

pub async fn student_results(
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> ActixResult<HttpResponse> {
    let (semester_id, student_id) = path.into_inner();
    NOTES_SERVICE
        .student_results(&req, semester_id, student_id)
        .await
}

pub async fn module_stats(req: HttpRequest, path: web::Path<(i64, i64)>) -> ActixResult<HttpResponse> {
    let (semester_id, moduleimpl_id) = path.into_inner();
    NOTES_SERVICE
        .module_stats(&req, semester_id, moduleimpl_id)
        .await
}

pub async fn list_ues(req: HttpRequest, semester_id: web::Path<i64>) -> ActixResult<HttpResponse> {
    NOTES_SERVICE.list_ues(&req, semester_id.into_inner()).await
}

pub async fn invalidate(req: HttpRequest, semester_id: web::Path<i64>) -> ActixResult<HttpResponse> {
    NOTES_SERVICE.invalidate(&req, semester_id.into_inner()).await
}

// 配置路由
// 写操作的路由与这里共享 `/api/v1/semesters/{semester_id}` 前缀，因此逐个注册资源而不使用 scope
pub fn configure_notes_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/v1/semesters/{semester_id}/results")
            .route(web::get().to(semester_results)),
    )
    .service(
        web::resource("/api/v1/semesters/{semester_id}/students/{student_id}")
            .route(web::get().to(student_results)),
    )
    .service(
        web::resource("/api/v1/semesters/{semester_id}/modules/{moduleimpl_id}/stats")
            .route(web::get().to(module_stats)),
    )
    .service(web::resource("/api/v1/semesters/{semester_id}/ues").route(web::get().to(list_ues)))
    .service(
        web::resource("/api/v1/semesters/{semester_id}/invalidate")
            .route(web::post().to(invalidate)),
    );
}
