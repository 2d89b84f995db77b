//! Provider 抽象层
//!
//! 定义上游生成式文本服务的统一接口。Handler 只依赖 `Provider` trait，
//! 具体实现（目前只有 Gemini）在启动时根据配置创建。

pub mod error;
pub mod gemini;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;

pub use error::UpstreamError;
pub use gemini::{extract_text, GeminiProvider};

/// Provider Trait - 生成式文本服务的统一接口
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider 名称（用于日志和标识）
    fn name(&self) -> &str;

    /// 上游模型标识
    fn model(&self) -> &str;

    /// 发送一次生成请求，返回上游原始 JSON 响应
    ///
    /// 只尝试一次，不做任何重试。
    ///
    /// # 参数
    ///
    /// * `system_instruction` - 已构建好的 system instruction
    /// * `user_text` - 用户回合内容（动物名）
    async fn generate(&self, system_instruction: &str, user_text: &str)
        -> Result<Value, UpstreamError>;
}

/// 根据配置创建 Provider
pub fn create_provider(config: &Config) -> anyhow::Result<Arc<dyn Provider>> {
    let provider = GeminiProvider::new(
        config.api_base.clone(),
        config.model.clone(),
        config.api_key.clone(),
        config.upstream_timeout,
    )?;
    tracing::info!(model = provider.model(), "Using Gemini provider");
    Ok(Arc::new(provider))
}
