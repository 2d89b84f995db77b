use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

/// 解析布尔型环境变量值（`1` 或 `true`，大小写不敏感）
#[inline]
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// 是否禁用 TLS 验证（用于调试 mitmproxy 等场景）
pub fn should_disable_tls_verify() -> bool {
    std::env::var("BEDTIME_RELAY_DISABLE_TLS_VERIFY")
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

/// 构建上游 API 使用的 HTTP 客户端
///
/// # 参数
///
/// * `timeout` - 单次请求的超时时间（连接 + 读取整个响应）
pub fn build_upstream_client(timeout: Duration) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("bedtime-relay/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10);

    if should_disable_tls_verify() {
        tracing::warn!("TLS certificate verification is DISABLED - for debugging only!");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().context("Failed to create upstream HTTP client")
}
