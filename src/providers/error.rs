//! 上游调用错误

use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// 上游调用失败的原因
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// 上游返回非 2xx 状态码；`body` 为上游错误内容（JSON 或原始文本）
    #[error("Request failed with status code {}", .status.as_u16())]
    Status { status: StatusCode, body: Value },

    #[error("Upstream request timed out after {0:?}")]
    Timeout(Duration),

    /// 网络层错误（URL 已剥离，避免泄露 API key）
    #[error("{0}")]
    Transport(reqwest::Error),

    /// 2xx 响应但响应体不是合法 JSON
    #[error("Failed to parse upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// 从 reqwest 错误转换，并去掉请求 URL
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Transport(err.without_url())
        }
    }

    /// 上游状态码（仅 `Status` 变体有）
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 返回给客户端的 `details`：优先透传上游错误体，否则为错误信息
    pub fn details(&self) -> Value {
        match self {
            Self::Status { body, .. } => body.clone(),
            other => Value::String(other.to_string()),
        }
    }
}
