//! HTTP 请求处理器

pub mod health;
pub mod transcript;

pub use health::handle_health;
pub use transcript::handle_transcript;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::Value;

pub const MISSING_ANIMAL: &str = "Missing required parameter: animal";
pub const INVALID_BODY: &str = "Invalid request body";
pub const UPSTREAM_FAILED: &str = "Gemini request failed";

/// 错误响应体；`details` 为空时不输出该字段
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

fn error_response(
    status: StatusCode,
    error: &'static str,
    details: Option<Value>,
) -> axum::response::Response {
    (status, Json(ErrorResponse { error, details })).into_response()
}
