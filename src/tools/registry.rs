//! 工具注册表
//!
//! 封闭映射：每个 Agent 对应一个具体执行器，dispatch 对 [`AgentKind`] 穷举匹配，
//! 新增 Agent 时编译器会指出这里漏了分支。Chat 不调用任何工具。

use std::sync::Arc;

use serde_json::{Map, Value};

use super::{DocsTool, EmailTool, FinanceTool, PaymentTool, ScheduleTool, SearchTool, ToolResult};
use crate::config::AppConfig;
use crate::core::CompletionClient;
use crate::fallback::market::MarketDataResolver;
use crate::fallback::web::WebSearchResolver;
use crate::intent::AgentKind;
use crate::store::SessionStore;

pub struct ToolRegistry {
    schedule: ScheduleTool,
    docs: DocsTool,
    email: EmailTool,
    payment: PaymentTool,
    finance: FinanceTool,
    search: SearchTool,
}

impl ToolRegistry {
    pub fn new(
        store: Arc<dyn SessionStore>,
        completion: Arc<CompletionClient>,
        market: MarketDataResolver,
        web: WebSearchResolver,
    ) -> Self {
        Self {
            schedule: ScheduleTool::new(store.clone()),
            docs: DocsTool::new(store.clone()),
            email: EmailTool::new(store.clone()),
            payment: PaymentTool::new(store),
            finance: FinanceTool::new(market, completion.clone()),
            search: SearchTool::new(web, completion),
        }
    }

    /// 行情与搜索数据源按配置构造
    pub fn from_config(
        store: Arc<dyn SessionStore>,
        completion: Arc<CompletionClient>,
        cfg: &AppConfig,
    ) -> Self {
        Self::new(
            store,
            completion,
            MarketDataResolver::from_config(&cfg.market),
            WebSearchResolver::from_config(&cfg.search),
        )
    }

    pub async fn dispatch(
        &self,
        agent: AgentKind,
        action: &str,
        params: &Map<String, Value>,
    ) -> ToolResult {
        match agent {
            AgentKind::Schedule => self.schedule.execute(action, params).await,
            AgentKind::Docs => self.docs.execute(action, params).await,
            AgentKind::Email => self.email.execute(action, params).await,
            AgentKind::Payment => self.payment.execute(action, params).await,
            AgentKind::Finance => self.finance.execute(action, params).await,
            AgentKind::Search => self.search.execute(action, params).await,
            AgentKind::Chat => ToolResult::empty(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! 离线注册表：数据源全部失败，补全走脚本客户端

    use super::*;
    use crate::config::LlmSection;
    use crate::fallback::testing::FixedProvider;
    use crate::fallback::{FallbackResolver, ProviderError};
    use crate::llm::LlmClient;

    pub fn offline_registry(store: Arc<dyn SessionStore>, llm: Arc<dyn LlmClient>) -> ToolRegistry {
        let completion = Arc::new(CompletionClient::new(llm, &LlmSection::default()));
        let market = MarketDataResolver::new(
            FallbackResolver::new("market")
                .with_provider(FixedProvider::new("down", Err(ProviderError::Http(503)))),
        );
        let web = WebSearchResolver::new(
            FallbackResolver::new("search")
                .with_provider(FixedProvider::new("down", Err(ProviderError::Http(503)))),
        );
        ToolRegistry::new(store, completion, market, web)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::offline_registry;
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::store::MemorySessionStore;
    use crate::tools::PayloadType;
    use serde_json::json;

    #[tokio::test]
    async fn test_dispatch_routes_by_agent() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = offline_registry(store.clone(), Arc::new(ScriptedLlmClient::new()));

        let params = json!({"title": "Gym", "time": "07:00"});
        let r = registry
            .dispatch(AgentKind::Schedule, "create_event", params.as_object().unwrap())
            .await;
        assert_eq!(r.payload_type(), Some(PayloadType::Event));

        let r = registry
            .dispatch(AgentKind::Docs, "create_event", params.as_object().unwrap())
            .await;
        assert!(!r.success);
        assert_eq!(r.message, "Unknown doc action.");
    }

    #[tokio::test]
    async fn test_chat_is_noop() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = offline_registry(store.clone(), Arc::new(ScriptedLlmClient::new()));
        let r = registry.dispatch(AgentKind::Chat, "anything", &Map::new()).await;
        assert_eq!(r, ToolResult::empty());
        assert!(store.get_events().await.unwrap().is_empty());
    }
}
