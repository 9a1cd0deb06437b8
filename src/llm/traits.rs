//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mistral / Mock）实现 LlmClient：complete 返回首个 choice 的原始文本。
//! 失败不重试，直接交给调用方决定降级方式。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::Message;

/// 补全调用失败原因
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Empty response")]
    EmptyResponse,

    /// 未配置 API Key
    #[error("LLM unavailable")]
    Unavailable,
}

/// 单次调用参数；None 表示使用客户端默认值
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::default()
        }
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成，返回首个 choice 的 content
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;

    /// 是否具备调用条件（如已配置 API Key）；离线实现返回 false
    fn is_available(&self) -> bool {
        true
    }

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
