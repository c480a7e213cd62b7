use actix_web::{
    HttpRequest, HttpResponse,
    error::{InternalError, JsonPayloadError, PathError, QueryPayloadError},
};

use crate::models::{ApiResponse, ErrorCode};

fn bad_request(err: impl std::error::Error + 'static, message: String) -> actix_web::Error {
    let response =
        HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::BadRequest, message));
    InternalError::from_response(err.to_string(), response).into()
}

/// JSON 请求体解析失败时返回统一的错误信封
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = format!("Invalid JSON body: {err}");
    bad_request(err, message)
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = format!("Invalid query parameters: {err}");
    bad_request(err, message)
}

// 路径中的学期、模块等 ID 必须是整数
pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    let message = format!("Invalid path parameter: {err}");
    bad_request(err, message)
}
