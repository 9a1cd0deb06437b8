//! 工具执行器
//!
//! 持有 ToolRegistry 与全局超时，dispatch 在超时内调用 registry.dispatch；
//! 超时转为失败的 ToolResult（不抛错），每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::time::timeout;

use crate::intent::AgentKind;
use crate::tools::{ToolRegistry, ToolResult};

/// 工具执行器：对每次调用施加超时
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行 agent 的 command；超时返回 success=false；输出 JSON 审计日志
    pub async fn dispatch(
        &self,
        agent: AgentKind,
        command: &str,
        params: &Map<String, Value>,
    ) -> ToolResult {
        let start = Instant::now();
        let result = timeout(self.timeout, self.registry.dispatch(agent, command, params)).await;

        let (ok, outcome) = match &result {
            Ok(r) if r.success => (true, "ok"),
            Ok(_) => (false, "rejected"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "agent": agent.display_name(),
            "command": command,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "params_preview": params_preview(params),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(r) => r,
            Err(_) => {
                tracing::warn!(agent = agent.display_name(), command, "tool timed out");
                ToolResult::failure(format!(
                    "{} did not finish in time. Please try again.",
                    agent.display_name()
                ))
            }
        }
    }
}

fn params_preview(params: &Map<String, Value>) -> String {
    let s = Value::Object(params.clone()).to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
