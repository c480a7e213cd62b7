pub mod invalidate;
pub mod module_stats;
pub mod results;
pub mod student;
pub mod ues;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::PaginationQuery;
use crate::notes::ResultCache;

/// 只读查询：成绩表、学生结果、统计
pub struct NotesService {
    cache: Option<Arc<ResultCache>>,
}

impl NotesService {
    pub fn new_lazy() -> Self {
        Self { cache: None }
    }

    pub fn with_cache(cache: Arc<ResultCache>) -> Self {
        Self { cache: Some(cache) }
    }

    pub(crate) fn get_cache(&self, request: &HttpRequest) -> Arc<ResultCache> {
        if let Some(cache) = &self.cache {
            cache.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<ResultCache>>>()
                .expect("ResultCache not found in app data")
                .get_ref()
                .clone()
        }
    }

    // 学期排序表
    pub async fn semester_results(
        &self,
        request: &HttpRequest,
        semester_id: i64,
        query: PaginationQuery,
    ) -> ActixResult<HttpResponse> {
        results::semester_results(self, request, semester_id, query).await
    }

    pub async fn student_results(
        &self,
        request: &HttpRequest,
        semester_id: i64,
        student_id: i64,
    ) -> ActixResult<HttpResponse> {
        student::student_results(self, request, semester_id, student_id).await
    }

    pub async fn module_stats(
        &self,
        request: &HttpRequest,
        semester_id: i64,
        moduleimpl_id: i64,
    ) -> ActixResult<HttpResponse> {
        module_stats::module_stats(self, request, semester_id, moduleimpl_id).await
    }

    pub async fn list_ues(&self, request: &HttpRequest, semester_id: i64) -> ActixResult<HttpResponse> {
        ues::list_ues(self, request, semester_id).await
    }

    // 强制失效（含依赖学期）
    pub async fn invalidate(&self, request: &HttpRequest, semester_id: i64) -> ActixResult<HttpResponse> {
        invalidate::invalidate(self, request, semester_id).await
    }
}
