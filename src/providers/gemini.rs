//! Gemini Provider
//!
//! 调用 `models/{model}:generateContent`，API key 通过 query 参数传递。

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::providers::{Provider, UpstreamError};
use crate::utils::build_upstream_client;

/// 用户回合内容缺失时的占位文本
const FALLBACK_USER_TEXT: &str = "animal";

/// 固定的生成参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub top_p: f64,
    pub top_k: u32,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

pub const STORY_GENERATION_CONFIG: GenerationConfig = GenerationConfig {
    temperature: 0.7,
    max_output_tokens: 2000,
    top_p: 0.9,
    top_k: 40,
    frequency_penalty: 0.2,
    presence_penalty: 0.15,
};

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

/// generateContent 请求体
#[derive(Debug, Serialize)]
pub struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

impl<'a> GenerateContentRequest<'a> {
    pub fn new(system_instruction: &'a str, user_text: &'a str) -> Self {
        let user_text = if user_text.is_empty() {
            FALLBACK_USER_TEXT
        } else {
            user_text
        };

        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: user_text }],
            }],
            generation_config: STORY_GENERATION_CONFIG,
        }
    }
}

/// 从 generateContent 响应中提取第一个候选的第一段文本
///
/// 链路上任何一环缺失都返回空字符串，而不是报错。
pub fn extract_text(response: &Value) -> String {
    response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts| parts.first())
        .and_then(|part| part.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub struct GeminiProvider {
    client: Client,
    api_base: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(
        api_base: String,
        model: String,
        api_key: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_upstream_client(timeout)?,
            api_base,
            model,
            api_key,
            timeout,
        })
    }

    /// 不含 API key 的请求地址（可安全写入日志）
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        system_instruction: &str,
        user_text: &str,
    ) -> Result<Value, UpstreamError> {
        let payload = GenerateContentRequest::new(system_instruction, user_text);
        let endpoint = self.endpoint();

        tracing::debug!(%endpoint, "Sending request to Gemini API");

        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, self.timeout))?;

        if !status.is_success() {
            let body = serde_json::from_str(&body).unwrap_or(Value::String(body));
            return Err(UpstreamError::Status { status, body });
        }

        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}
