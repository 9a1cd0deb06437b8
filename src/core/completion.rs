//! 补全客户端：主调用 + 三个独立的辅助调用
//!
//! - respond：主调用，失败原样上抛给 Orchestrator（不重试）
//! - conversation_title：轻量模型生成会话标题，失败或不合格时退回消息前 30 字符
//! - search_digest：把搜索结果综合成自然语言回答
//! - market_analysis：为行情报告生成简短交易分析

use std::sync::Arc;

use crate::config::LlmSection;
use crate::core::prompt;
use crate::core::AgentError;
use crate::llm::{CompletionOptions, LlmClient, LlmError, Message};
use crate::tools::SearchHit;

/// 标题最长字符数，超过即视为不合格
const MAX_TITLE_CHARS: usize = 50;
const FALLBACK_TITLE_CHARS: usize = 30;

pub struct CompletionClient {
    llm: Arc<dyn LlmClient>,
    main: CompletionOptions,
    title: CompletionOptions,
    digest: CompletionOptions,
    analysis: CompletionOptions,
}

/// 消息前 30 字符，更长时追加 "..."
pub fn fallback_title(message: &str) -> String {
    let head: String = message.chars().take(FALLBACK_TITLE_CHARS).collect();
    if message.chars().count() > FALLBACK_TITLE_CHARS {
        format!("{}...", head)
    } else {
        head
    }
}

/// 清理模型给出的标题；不合格返回 None
pub fn clean_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(['"', '\''])
        .unwrap_or(trimmed);
    let trimmed = trimmed
        .strip_suffix(['"', '\''])
        .unwrap_or(trimmed);
    if trimmed.is_empty() || trimmed.chars().count() > MAX_TITLE_CHARS {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl CompletionClient {
    pub fn new(llm: Arc<dyn LlmClient>, cfg: &LlmSection) -> Self {
        Self {
            llm,
            main: CompletionOptions::with_model(cfg.model.clone()),
            title: CompletionOptions::with_model(cfg.title_model.clone())
                .temperature(0.3)
                .max_tokens(50),
            digest: CompletionOptions::with_model(cfg.digest_model.clone())
                .temperature(0.7)
                .max_tokens(300),
            analysis: CompletionOptions::with_model(cfg.analysis_model.clone()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.llm.is_available()
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 主调用：返回首个 choice 的原始文本
    pub async fn respond(&self, messages: &[Message]) -> Result<String, AgentError> {
        match self.llm.complete(messages, &self.main).await {
            Ok(text) if text.trim().is_empty() => Err(AgentError::EmptyCompletion),
            Ok(text) => Ok(text),
            Err(LlmError::EmptyResponse) => Err(AgentError::EmptyCompletion),
            Err(e) => Err(AgentError::Transport(e)),
        }
    }

    pub async fn conversation_title(&self, first_message: &str) -> String {
        let messages = [Message::user(prompt::title_prompt(first_message))];
        match self.llm.complete(&messages, &self.title).await {
            Ok(raw) => clean_title(&raw).unwrap_or_else(|| fallback_title(first_message)),
            Err(e) => {
                tracing::warn!(error = %e, "title generation failed, using message prefix");
                fallback_title(first_message)
            }
        }
    }

    async fn try_search_digest(
        &self,
        query: &str,
        hits: &[SearchHit],
    ) -> Result<String, LlmError> {
        let messages = [Message::user(prompt::digest_prompt(query, hits))];
        let text = self.llm.complete(&messages, &self.digest).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    /// 摘要调用，失败时退回原始结果或提示文本
    pub async fn search_digest(&self, query: &str, hits: &[SearchHit]) -> String {
        match self.try_search_digest(query, hits).await {
            Ok(text) => text,
            Err(LlmError::EmptyResponse) => format!(
                "I found information about \"{}\":\n\n{}",
                query,
                prompt::format_results(hits)
            ),
            Err(LlmError::Api(reason)) => {
                tracing::warn!(%reason, "search digest rejected by endpoint");
                format!(
                    "I found information about \"{}\" but couldn't synthesize it. Here are the raw results:\n\n{}",
                    query,
                    prompt::format_results(hits)
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "search digest failed");
                format!(
                    "I was searching for \"{}\" but encountered an error. Please try again.",
                    query
                )
            }
        }
    }

    pub async fn market_analysis(&self, symbol: &str, price: f64, change_percent: f64) -> String {
        let messages = [Message::user(prompt::analysis_prompt(symbol, price, change_percent))];
        match self.llm.complete(&messages, &self.analysis).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) | Err(LlmError::EmptyResponse) => format!("Analysis failed for {}.", symbol),
            Err(e) => {
                tracing::warn!(symbol, error = %e, "market analysis failed");
                format!("Unable to generate analysis for {} at this time.", symbol)
            }
        }
    }
}
