//! 会话驱动：把 Orchestrator 的一轮回复写入 Transcript 并持久化
//!
//! 每次 send 追加用户 Turn 与 Agent Turn 两条；首条消息时为会话生成标题。
//! 卡片上的确认 / 取消经由 [`ArtifactManager`] 修补 Transcript 后同样落盘。

use std::sync::Arc;

use crate::chat::{ChatSession, Transcript, Turn};
use crate::core::completion::fallback_title;
use crate::core::orchestrator::{Orchestrator, TurnReply};
use crate::lifecycle::{ArtifactManager, LifecycleError, Transition};
use crate::llm::Attachment;
use crate::store::{SessionStore, StoreError};

pub struct Conversation {
    orchestrator: Arc<Orchestrator>,
    lifecycle: Arc<ArtifactManager>,
    store: Arc<dyn SessionStore>,
    transcript: Transcript,
    history_turns: usize,
}

impl Conversation {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        lifecycle: Arc<ArtifactManager>,
        store: Arc<dyn SessionStore>,
        session: ChatSession,
        history_turns: usize,
    ) -> Self {
        Self {
            orchestrator,
            lifecycle,
            store,
            transcript: Transcript::new(session),
            history_turns,
        }
    }

    pub fn session(&self) -> &ChatSession {
        self.transcript.session()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// 处理一条用户消息，返回追加的 Agent Turn
    ///
    /// 意图无法解析时仍会写入一条处理错误回复，会话照常继续。
    pub async fn send(
        &mut self,
        text: &str,
        attachment: Option<Attachment>,
    ) -> Result<Turn, StoreError> {
        let first_message = self.transcript.session().is_empty();
        let history = self.transcript.session().recent(self.history_turns).to_vec();
        self.transcript.push(Turn::user(text));

        let reply = match self.orchestrator.run_turn(&history, text, attachment).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, session = self.session().id(), "turn failed");
                TurnReply::processing_error()
            }
        };
        let turn = reply.into_turn();
        self.transcript.push(turn.clone());

        if first_message && self.session().has_default_title() {
            let completion = self.orchestrator.completion();
            let title = if completion.is_available() {
                completion.conversation_title(text).await
            } else {
                fallback_title(text)
            };
            self.transcript.assign_title(title);
        }

        self.store.save_chat(self.transcript.session()).await?;
        Ok(turn)
    }

    pub async fn confirm_event(&mut self, event_id: &str) -> Result<Transition, LifecycleError> {
        let transition = self.lifecycle.confirm(&mut self.transcript, event_id).await?;
        self.store.save_chat(self.transcript.session()).await?;
        Ok(transition)
    }

    pub async fn cancel_event(&mut self, event_id: &str) -> Result<Transition, LifecycleError> {
        let transition = self.lifecycle.cancel(&mut self.transcript, event_id).await?;
        self.store.save_chat(self.transcript.session()).await?;
        Ok(transition)
    }
}
