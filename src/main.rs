//! Bedtime Relay - 睡前故事生成中继服务
//!
//! 接收描述故事需求的 JSON，构建提示词后转发给 Gemini，返回生成的故事文本。
//!
//! # HTTP 接口
//!
//! - `GET /`: 存活探针
//! - `POST /transcript`: 生成故事
//!
//! 所有配置均在启动时从环境变量读取，见 [`config::Config::from_env`]。

mod config;
mod gateway;
mod providers;
mod story;
mod utils;

use anyhow::Result;
use clap::Parser;
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Bedtime Relay CLI
#[derive(Parser)]
#[command(name = "bedtime-relay")]
#[command(about = "Bedtime story relay for the Gemini API", long_about = None)]
#[command(version)]
struct Cli {
    /// 启动前加载的 .env 文件（默认尝试当前目录下的 .env）
    #[arg(long, env = "BEDTIME_RELAY_ENV_FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载 .env 文件（如果存在）
    if let Some(path) = &cli.env_file {
        dotenvy::from_path(path).ok();
    } else {
        dotenvy::dotenv().ok();
    }

    // 初始化日志系统（LOG_FORMAT=json 时输出结构化 JSON）
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bedtime_relay=info".into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(false)
        }))
        .with((!json_logs).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
        }))
        .init();

    // 缺少凭据、监听地址无效等配置错误直接退出；
    // 配置必须在 serve 之前完成校验，serve 内部才会创建 Provider 并绑定端口
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("ERROR: {:#}", e);
            std::process::exit(1);
        }
    };

    gateway::serve(config).await
}
