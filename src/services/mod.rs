pub mod notes;
pub mod scores;

pub use notes::NotesService;
pub use scores::ScoreService;

use actix_web::HttpResponse;
use tracing::error;

use crate::errors::ScoDocError;
use crate::models::ApiResponse;

/// 将内部错误转换为带统一信封的 HTTP 响应
pub(crate) fn error_response(err: &ScoDocError, context: &str) -> HttpResponse {
    let body = ApiResponse::from_error(err, context);
    match err {
        ScoDocError::NotFound(_) => HttpResponse::NotFound().json(body),
        ScoDocError::Validation(_) | ScoDocError::DateParse(_) | ScoDocError::Formula(_) => {
            HttpResponse::BadRequest().json(body)
        }
        // 学期结构不一致，修正前成绩表不可用
        ScoDocError::Structure(_) => HttpResponse::ServiceUnavailable().json(body),
        _ => {
            error!("{context}: {err}");
            HttpResponse::InternalServerError().json(body)
        }
    }
}
