//! 可观测性：tracing 订阅器初始化与 token 用量汇总

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 默认 info，RUST_LOG 覆盖；重复调用时保持已有订阅器
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

/// 会话结束时输出累计 token 用量
pub fn report_token_usage((prompt, completion, total): (u64, u64, u64)) {
    if total > 0 {
        tracing::info!(prompt, completion, total, "token usage");
    }
}
