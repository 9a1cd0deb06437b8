//! Search Agent：web_search
//!
//! 百科与网页两层由 [`WebSearchResolver`] 负责；两层都失败后退到模型自身知识，
//! 结果标记为 unverified 并在消息中注明。

use std::sync::Arc;

use serde_json::{Map, Value};

use super::params::str_param;
use super::{DataQuality, SearchHit, SearchPayload, ToolPayload, ToolResult};
use crate::core::CompletionClient;
use crate::fallback::web::WebSearchResolver;
use crate::fallback::Resolution;

const KNOWLEDGE_PREFIX: &str = "🤖 Based on my knowledge: ";
const KNOWLEDGE_NOTE: &str =
    "*Note: Unable to fetch live internet data. This is from my training data.*";

pub struct SearchTool {
    web: WebSearchResolver,
    completion: Arc<CompletionClient>,
}

impl SearchTool {
    pub fn new(web: WebSearchResolver, completion: Arc<CompletionClient>) -> Self {
        Self { web, completion }
    }

    pub async fn execute(&self, action: &str, params: &Map<String, Value>) -> ToolResult {
        match action {
            "web_search" | "search" => {
                let query = str_param(params, "query").unwrap_or_else(|| "Unknown".to_string());
                self.search(query).await
            }
            _ => ToolResult::failure("Unknown search action."),
        }
    }

    async fn search(&self, query: String) -> ToolResult {
        match self.web.lookup(&query).await {
            Resolution::Resolved { provider, value } => {
                tracing::info!(%query, %provider, "search resolved");
                let message = self
                    .completion
                    .search_digest(&query, std::slice::from_ref(&value.digest_input))
                    .await;
                ToolResult::ok(
                    message,
                    ToolPayload::SearchResult(SearchPayload {
                        query,
                        results: vec![value.card],
                        data_quality: DataQuality::Live,
                    }),
                )
            }
            Resolution::Exhausted { .. } => self.from_knowledge(query).await,
        }
    }

    async fn from_knowledge(&self, query: String) -> ToolResult {
        let seed = SearchHit {
            title: format!("Information about \"{}\"", query),
            snippet: format!("Based on general knowledge about {}", query),
            source: "AI Knowledge Base".to_string(),
        };
        // 摘要失败时 search_digest 给出提示文本，仍按知识兜底返回
        let digest = self.completion.search_digest(&query, &[seed]).await;
        tracing::warn!(%query, "search answered from model knowledge");
        let card = SearchHit {
            title: query.clone(),
            snippet: "Information from AI knowledge base".to_string(),
            source: "AI Training Data".to_string(),
        };
        ToolResult::ok(
            format!("{}{}\n\n{}", KNOWLEDGE_PREFIX, digest, KNOWLEDGE_NOTE),
            ToolPayload::SearchResult(SearchPayload {
                query,
                results: vec![card],
                data_quality: DataQuality::Unverified,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmSection;
    use crate::fallback::testing::FixedProvider;
    use crate::fallback::web::WebFinding;
    use crate::fallback::{FallbackResolver, ProviderError};
    use crate::llm::{LlmError, ScriptedLlmClient};
    use serde_json::json;

    fn finding() -> WebFinding {
        WebFinding {
            digest_input: SearchHit {
                title: "Wikipedia: rust".into(),
                snippet: "Rust is a systems programming language.".into(),
                source: "wikipedia.org".into(),
            },
            card: SearchHit {
                title: "Wikipedia: rust".into(),
                snippet: "Rust is a...".into(),
                source: "wikipedia.org".into(),
            },
        }
    }

    fn tool(outcome: Result<WebFinding, ProviderError>, llm: Arc<ScriptedLlmClient>) -> SearchTool {
        let web = WebSearchResolver::new(
            FallbackResolver::new("search")
                .with_provider(FixedProvider::new("wiki", outcome.clone()))
                .with_provider(FixedProvider::new("web", outcome)),
        );
        SearchTool::new(web, Arc::new(CompletionClient::new(llm, &LlmSection::default())))
    }

    #[tokio::test]
    async fn test_live_result_is_digested() {
        let llm = Arc::new(ScriptedLlmClient::with_replies(["Rust is a language."]));
        let t = tool(Ok(finding()), llm.clone());
        let params = json!({"query": "rust"});
        let r = t.execute("web_search", params.as_object().unwrap()).await;
        assert!(r.success);
        assert_eq!(r.message, "Rust is a language.");
        let Some(ToolPayload::SearchResult(p)) = r.data else {
            panic!("expected search payload");
        };
        assert_eq!(p.data_quality, DataQuality::Live);
        assert_eq!(p.results, vec![finding().card]);
        // 摘要调用拿到的是完整摘录
        assert!(llm.calls()[0].0[0].content.contains("systems programming"));
    }

    #[tokio::test]
    async fn test_exhausted_falls_back_to_knowledge() {
        let llm = Arc::new(ScriptedLlmClient::with_replies(["It is a language."]));
        let t = tool(Err(ProviderError::Transport("offline".into())), llm);
        let params = json!({"query": "rust"});
        let r = t.execute("search", params.as_object().unwrap()).await;
        assert!(r.success);
        assert!(r.message.starts_with("🤖 Based on my knowledge: It is a language."));
        assert!(r.message.ends_with(KNOWLEDGE_NOTE));
        let Some(ToolPayload::SearchResult(p)) = r.data else {
            panic!("expected search payload");
        };
        assert_eq!(p.data_quality, DataQuality::Unverified);
        assert_eq!(p.results[0].source, "AI Training Data");
    }

    #[tokio::test]
    async fn test_everything_down_still_answers_unverified() {
        let llm = Arc::new(ScriptedLlmClient::new());
        llm.push_error(LlmError::Transport("offline".into()));
        let t = tool(Err(ProviderError::Transport("offline".into())), llm);
        let params = json!({"query": "rust"});
        let r = t.execute("web_search", params.as_object().unwrap()).await;
        assert!(r.success);
        let expected = "🤖 Based on my knowledge: I was searching for \"rust\" but encountered an error.";
        assert!(r.message.starts_with(expected));
        assert!(r.message.ends_with(KNOWLEDGE_NOTE));
        let Some(ToolPayload::SearchResult(p)) = r.data else {
            panic!("expected search payload");
        };
        assert_eq!(p.data_quality, DataQuality::Unverified);
        assert_eq!(p.results.len(), 1);
        assert_eq!(p.results[0].source, "AI Training Data");
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let t = tool(Ok(finding()), Arc::new(ScriptedLlmClient::new()));
        assert_eq!(
            t.execute("crawl", &Map::new()).await.message,
            "Unknown search action."
        );
    }
}
