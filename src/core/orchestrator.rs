//! Agent 编排器：一轮对话的完整流程
//!
//! 1. 无补全凭据时直接返回离线回复，不发请求；
//! 2. 组装 Prompt（当前时间、用户名、已有日程、历史）并发起主调用；
//! 3. 从补全中恢复意图 JSON，按 agent + command 分发给工具；
//! 4. 把工具结果合并成一条回复与一个类型化载荷。
//!
//! 补全失败返回固定的处理错误回复；意图无法解析则整轮失败（[`AgentError::JsonParse`]），
//! 由上层决定如何呈现。

use std::sync::Arc;

use chrono::Local;

use crate::chat::Turn;
use crate::core::prompt::{self, PromptContext};
use crate::core::{AgentError, CompletionClient};
use crate::intent::{AgentKind, Intent};
use crate::llm::Attachment;
use crate::store::SessionStore;
use crate::tools::{PayloadType, ToolExecutor, ToolPayload};

pub const OFFLINE_TEXT: &str = "I'm offline. Please check the Mistral API configuration.";
pub const PROCESSING_ERROR_TEXT: &str = "I encountered a processing error. Please try again.";

/// 一轮的 Agent 回复，尚未写入会话
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub text: String,
    pub tone: String,
    pub language: String,
    pub agent: AgentKind,
    pub payload: Option<ToolPayload>,
    pub payload_type: Option<PayloadType>,
}

impl TurnReply {
    fn plain(text: &str, tone: &str) -> Self {
        Self {
            text: text.to_string(),
            tone: tone.to_string(),
            language: "en".to_string(),
            agent: AgentKind::Chat,
            payload: None,
            payload_type: None,
        }
    }

    pub fn offline() -> Self {
        Self::plain(OFFLINE_TEXT, "Neutral")
    }

    pub fn processing_error() -> Self {
        Self::plain(PROCESSING_ERROR_TEXT, "Error")
    }

    pub fn into_turn(self) -> Turn {
        let mut turn = Turn::agent(self.text);
        turn.tone = Some(self.tone);
        turn.language = Some(self.language);
        turn.processing_agent = Some(self.agent);
        turn.payload = self.payload;
        turn.payload_type = self.payload_type;
        turn
    }
}

pub struct Orchestrator {
    completion: Arc<CompletionClient>,
    tools: ToolExecutor,
    store: Arc<dyn SessionStore>,
    default_user_name: String,
}

impl Orchestrator {
    pub fn new(
        completion: Arc<CompletionClient>,
        tools: ToolExecutor,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            completion,
            tools,
            store,
            default_user_name: "User".to_string(),
        }
    }

    pub fn with_default_user_name(mut self, name: impl Into<String>) -> Self {
        self.default_user_name = name.into();
        self
    }

    pub fn completion(&self) -> &Arc<CompletionClient> {
        &self.completion
    }

    /// history 为当前消息之前的 Turn（调用方负责截取最近 N 条）
    pub async fn run_turn(
        &self,
        history: &[Turn],
        text: &str,
        attachment: Option<Attachment>,
    ) -> Result<TurnReply, AgentError> {
        if !self.completion.is_available() {
            tracing::warn!("no completion credentials, returning offline reply");
            return Ok(TurnReply::offline());
        }

        let system = self.system_instruction().await;
        let history: Vec<String> = history.iter().map(Turn::history_line).collect();
        let messages = prompt::turn_messages(system, &history, text, attachment);

        let completion = match self.completion.respond(&messages).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "completion failed");
                return Ok(TurnReply::processing_error());
            }
        };

        let intent = Intent::parse(&completion).map_err(|e| {
            tracing::error!(error = %e, "malformed intent output");
            e
        })?;
        Ok(self.apply(intent).await)
    }

    async fn system_instruction(&self) -> String {
        let events = self.store.get_events().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not load events for prompt");
            Vec::new()
        });
        let user_name = match self.store.get_user_context().await {
            Ok(ctx) if !ctx.name.trim().is_empty() => ctx.name,
            Ok(_) => self.default_user_name.clone(),
            Err(e) => {
                tracing::warn!(error = %e, "could not load user context for prompt");
                self.default_user_name.clone()
            }
        };
        prompt::system_instruction(&PromptContext {
            now: Local::now(),
            user_name: &user_name,
            events: &events,
        })
    }

    /// 意图 -> 回复：填默认值，需要时分发工具并合并结果
    async fn apply(&self, intent: Intent) -> TurnReply {
        let mut reply = TurnReply {
            text: intent.response.clone().unwrap_or_else(|| "Processed.".to_string()),
            tone: intent.detected_tone.clone().unwrap_or_else(|| "Neutral".to_string()),
            language: intent.detected_language.clone().unwrap_or_else(|| "en".to_string()),
            agent: intent.active_agent.unwrap_or(AgentKind::Chat),
            payload: None,
            payload_type: None,
        };

        let Some((agent, command)) = intent.dispatch_target() else {
            return reply;
        };
        tracing::info!(agent = agent.display_name(), command, "dispatching");
        let result = self.tools.dispatch(agent, command, &intent.parameters).await;

        if result.success {
            if !result.message.is_empty() {
                reply.text.push_str("\n\n");
                reply.text.push_str(&result.message);
            }
            reply.payload_type = result.payload_type();
            reply.payload = result.data;
        } else {
            reply.text.push_str(&format!(" (System: {})", result.message));
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmSection;
    use crate::llm::{LlmError, OfflineLlmClient, ScriptedLlmClient};
    use crate::store::MemorySessionStore;
    use crate::tools::registry::testing::offline_registry;
    use crate::llm::LlmClient;

    fn orchestrator(llm: Arc<dyn LlmClient>, store: Arc<MemorySessionStore>) -> Orchestrator {
        let completion = Arc::new(CompletionClient::new(llm.clone(), &LlmSection::default()));
        let tools = ToolExecutor::new(offline_registry(store.clone(), llm), 10);
        Orchestrator::new(completion, tools, store)
    }

    #[tokio::test]
    async fn test_offline_short_circuit() {
        let store = Arc::new(MemorySessionStore::new());
        let o = orchestrator(Arc::new(OfflineLlmClient), store);
        let reply = o.run_turn(&[], "hi", None).await.unwrap();
        assert_eq!(reply, TurnReply::offline());
    }

    #[tokio::test]
    async fn test_defaults_for_sparse_intent() {
        let store = Arc::new(MemorySessionStore::new());
        let llm = Arc::new(ScriptedLlmClient::with_replies([
            r#"{"activeAgent": "Teleport Agent", "detectedTone": {"mood": "calm"}}"#,
        ]));
        let o = orchestrator(llm, store);
        let reply = o.run_turn(&[], "beam me up", None).await.unwrap();
        assert_eq!(reply.text, "Processed.");
        assert_eq!(reply.tone, "Neutral");
        assert_eq!(reply.language, "en");
        assert_eq!(reply.agent, AgentKind::Chat);
        assert!(reply.payload.is_none());
    }

    #[tokio::test]
    async fn test_success_message_appended_with_payload() {
        let store = Arc::new(MemorySessionStore::new());
        let llm = Arc::new(ScriptedLlmClient::with_replies([r#"```json
{"response": "Done.", "detectedTone": "Happy", "detectedLanguage": "en",
 "activeAgent": "Schedule Agent", "command": "create_event",
 "parameters": {"title": "Lunch", "time": "12:00", "date": "2026-05-01"}}
```"#]));
        let o = orchestrator(llm.clone(), store.clone());
        let history = vec![Turn::user("earlier"), Turn::agent("sure")];
        let reply = o.run_turn(&history, "lunch at noon", None).await.unwrap();

        assert!(reply.text.starts_with("Done.\n\n✅ Event created!"));
        assert_eq!(reply.tone, "Happy");
        assert_eq!(reply.agent, AgentKind::Schedule);
        assert_eq!(reply.payload_type, Some(PayloadType::Event));
        assert_eq!(store.get_events().await.unwrap().len(), 1);

        let calls = llm.calls();
        let (messages, _) = &calls[0];
        assert_eq!(messages[1].content, "Previous Context:\nuser: earlier\nagent: sure");
        assert_eq!(messages[2].content, "lunch at noon");
    }

    #[tokio::test]
    async fn test_validation_failure_inlined() {
        let store = Arc::new(MemorySessionStore::new());
        let llm = Arc::new(ScriptedLlmClient::with_replies([
            r#"{"response": "Paying.", "activeAgent": "Payment", "command": "make_payment", "parameters": {"recipient": "Ali"}}"#,
        ]));
        let o = orchestrator(llm, store);
        let reply = o.run_turn(&[], "pay Ali", None).await.unwrap();
        assert_eq!(
            reply.text,
            "Paying. (System: Missing amount or recipient for payment.)"
        );
        assert!(reply.payload.is_none());
    }

    #[tokio::test]
    async fn test_completion_failure_and_parse_failure() {
        let store = Arc::new(MemorySessionStore::new());
        let llm = Arc::new(ScriptedLlmClient::new());
        llm.push_error(LlmError::Transport("reset".into()));
        llm.push_reply("I cannot answer in JSON today");
        let o = orchestrator(llm, store);

        let reply = o.run_turn(&[], "hi", None).await.unwrap();
        assert_eq!(reply, TurnReply::processing_error());

        let err = o.run_turn(&[], "hi", None).await.unwrap_err();
        assert!(err.is_malformed_output());
    }

    #[test]
    fn test_into_turn_carries_metadata() {
        let turn = TurnReply::processing_error().into_turn();
        assert!(!turn.is_user());
        assert_eq!(turn.tone.as_deref(), Some("Error"));
        assert_eq!(turn.processing_agent, Some(AgentKind::Chat));
    }
}
