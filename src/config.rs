//! 应用配置模块
//!
//! 负责在启动时从环境变量加载应用配置，包括：
//! - 服务器监听地址和端口
//! - 上游 Gemini API 密钥、模型和地址
//! - 上游请求超时与日志详细程度

use anyhow::{bail, Context, Result};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::utils::parse_flag;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// 应用配置
///
/// 启动时构造一次，之后只读
#[derive(Clone)]
pub struct Config {
    /// 服务器监听地址和端口
    pub listen_addr: SocketAddr,
    /// Gemini API 密钥（**必需**）
    pub api_key: String,
    /// 上游模型标识，如 `gemini-2.0-flash`
    pub model: String,
    /// 上游 API 基础地址
    pub api_base: String,
    /// 上游请求超时
    pub upstream_timeout: Duration,
    /// 是否输出详细诊断日志
    pub verbose: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("listen_addr", &self.listen_addr)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// # 环境变量
    ///
    /// - `GEMINI_API_KEY`: 上游 API 密钥（**必需**，不能为空）
    /// - `PORT`: 服务器监听端口（默认: 3000）
    /// - `HOST`: 服务器监听地址（默认: "0.0.0.0"）
    /// - `GEMINI_MODEL`: 模型标识（默认: "gemini-2.0-flash"）
    /// - `GEMINI_API_BASE`: 上游基础地址
    /// - `UPSTREAM_TIMEOUT_SECS`: 上游请求超时秒数（默认: 30）
    /// - `VERBOSE_LOGGING`: `1` 或 `true` 时输出详细日志
    ///
    /// # 错误
    ///
    /// - 如果 `GEMINI_API_KEY` 未设置或为空
    /// - 如果 `HOST` 不是有效的 IP 地址
    /// - 如果 `PORT` 不是有效的端口号
    /// - 如果 `UPSTREAM_TIMEOUT_SECS` 不是正整数
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 使用任意变量查找函数加载配置
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .context("GEMINI_API_KEY is not set in environment variables")?;

        let host: IpAddr = lookup("HOST")
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
            .trim()
            .parse()
            .context("HOST must be a valid IP address")?;

        let port = match lookup("PORT") {
            Some(v) => v
                .trim()
                .parse()
                .context("PORT must be a valid port number")?,
            None => DEFAULT_PORT,
        };

        let model = lookup("GEMINI_MODEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let api_base = lookup("GEMINI_API_BASE")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let timeout_secs: u64 = match lookup("UPSTREAM_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse()
                .context("UPSTREAM_TIMEOUT_SECS must be a positive integer")?,
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            bail!("UPSTREAM_TIMEOUT_SECS must be a positive integer");
        }

        let verbose = lookup("VERBOSE_LOGGING")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        Ok(Self {
            listen_addr: SocketAddr::new(host, port),
            api_key,
            model,
            api_base,
            upstream_timeout: Duration::from_secs(timeout_secs),
            verbose,
        })
    }
}
