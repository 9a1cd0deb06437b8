//! 编排层错误类型
//!
//! 传输失败在 Orchestrator 内就地降级为固定回复；结构化输出解析失败是整轮致命错误，向调用方传播。
//! 参数校验失败不属于错误，由各 Agent 工具以 `ToolResult { success: false }` 返回。

use thiserror::Error;

use crate::llm::LlmError;

/// 一轮对话编排中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 补全端点网络错误 / 非 2xx
    #[error("Completion transport failed: {0}")]
    Transport(#[from] LlmError),

    #[error("Empty completion")]
    EmptyCompletion,

    /// 抽取后的文本仍不是合法 JSON 对象
    #[error("JSON parse error: {reason}")]
    JsonParse { reason: String, raw: String },
}

impl AgentError {
    /// 是否为「结构化输出损坏」类错误（调用方据此展示通用处理错误提示）
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, AgentError::JsonParse { .. })
    }
}
