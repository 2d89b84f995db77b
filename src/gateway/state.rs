//! Gateway 应用状态

use std::sync::Arc;

use crate::providers::Provider;

/// Gateway 应用状态
///
/// 启动时构造，请求之间只读共享
#[derive(Clone)]
pub struct AppState {
    provider: Arc<dyn Provider>,
    verbose: bool,
}

impl AppState {
    pub fn new(provider: Arc<dyn Provider>, verbose: bool) -> Self {
        Self { provider, verbose }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// 是否输出详细诊断日志
    pub fn verbose(&self) -> bool {
        self.verbose
    }
}
