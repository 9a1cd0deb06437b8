//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mistral / 离线 / 脚本化 Mock）

pub mod message;
pub mod mistral;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use message::{Attachment, AttachmentKind, Message, Role};
pub use mistral::{create_mistral_client, MISTRAL_BASE_URL, MISTRAL_LARGE, MISTRAL_SMALL};
pub use mock::{OfflineLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{CompletionOptions, LlmClient, LlmError};

use crate::config::LlmSection;

/// 根据配置与环境变量选择后端：MISTRAL_API_KEY 优先，其次 OPENAI_API_KEY，都没有则离线
pub fn create_llm_from_config(cfg: &LlmSection) -> Arc<dyn LlmClient> {
    let provider = cfg.provider.to_lowercase();
    let mistral_key = std::env::var("MISTRAL_API_KEY").ok().filter(|k| !k.trim().is_empty());
    let openai_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty());

    match (mistral_key, openai_key) {
        (Some(key), _) if provider != "openai" => {
            tracing::info!("Using Mistral LLM ({})", cfg.model);
            Arc::new(create_mistral_client(
                &key,
                Some(cfg.model.as_str()),
                cfg.request_timeout_secs,
            ))
        }
        (_, Some(key)) => {
            tracing::info!("Using OpenAI-compatible LLM ({})", cfg.model);
            Arc::new(OpenAiClient::new(
                cfg.base_url.as_deref(),
                &cfg.model,
                &key,
                cfg.request_timeout_secs,
            ))
        }
        (Some(key), None) => {
            tracing::warn!("provider is openai but only MISTRAL_API_KEY is set, using Mistral");
            Arc::new(create_mistral_client(
                &key,
                Some(cfg.model.as_str()),
                cfg.request_timeout_secs,
            ))
        }
        (None, None) => {
            tracing::warn!("No API key set, running offline");
            Arc::new(OfflineLlmClient)
        }
    }
}
