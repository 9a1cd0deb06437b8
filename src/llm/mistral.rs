//! Mistral API 客户端（OpenAI 兼容格式）
//!
//! - Base URL: https://api.mistral.ai/v1
//! - 模型: mistral-large-latest (主对话), mistral-small-latest (标题 / 摘要)

use crate::llm::OpenAiClient;

pub const MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";
pub const MISTRAL_LARGE: &str = "mistral-large-latest";
pub const MISTRAL_SMALL: &str = "mistral-small-latest";

/// 创建 Mistral 客户端；未提供 model 时使用 `MISTRAL_MODEL` 环境变量或 mistral-large-latest
pub fn create_mistral_client(
    api_key: &str,
    model: Option<&str>,
    timeout_secs: u64,
) -> OpenAiClient {
    let model = model
        .map(String::from)
        .or_else(|| std::env::var("MISTRAL_MODEL").ok())
        .unwrap_or_else(|| MISTRAL_LARGE.to_string());

    OpenAiClient::new(Some(MISTRAL_BASE_URL), &model, api_key, timeout_secs)
}
