//! 聊天会话：Turn 序列 + 标题 + 最后消息缓存
//!
//! last_message / updated_at 始终由最后一个 Turn 推导，每次修改 Turn 序列后重新计算。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::intent::AgentKind;
use crate::tools::{PayloadType, ToolPayload};

/// 新会话的默认标题；只有仍为默认标题时才会被自动命名
pub const DEFAULT_TITLE: &str = "New Conversation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

/// 一条消息（用户输入或 Agent 回复）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_agent: Option<AgentKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ToolPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_type: Option<PayloadType>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::User,
            text: text.into(),
            timestamp: Utc::now(),
            tone: None,
            language: None,
            processing_agent: None,
            payload: None,
            payload_type: None,
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Agent,
            ..Self::user(text)
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    /// 作为历史上下文的一行："user: ..." / "agent: ..."
    pub fn history_line(&self) -> String {
        let who = match self.sender {
            Sender::User => "user",
            Sender::Agent => "agent",
        };
        format!("{}: {}", who, self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    id: String,
    title: String,
    #[serde(rename = "messages")]
    turns: Vec<Turn>,
    last_message: String,
    updated_at: DateTime<Utc>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            turns: Vec::new(),
            last_message: String::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }

    /// 只在仍是默认标题时生效；返回是否改名
    pub fn assign_title(&mut self, title: impl Into<String>) -> bool {
        if !self.has_default_title() {
            return false;
        }
        let title = title.into();
        if title.trim().is_empty() {
            return false;
        }
        self.title = title;
        true
    }

    pub fn push(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.refresh_summary();
        self.turns.len() - 1
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.refresh_summary();
    }

    /// 最近 n 条 Turn（不含尚未发送的当前输入）
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// 仅用于载荷修补；不改变 Turn 序列
    pub(crate) fn turn_mut(&mut self, index: usize) -> Option<&mut Turn> {
        self.turns.get_mut(index)
    }

    fn refresh_summary(&mut self) {
        match self.turns.last() {
            Some(last) => {
                self.last_message = last.text.clone();
                self.updated_at = last.timestamp;
            }
            None => {
                self.last_message = String::new();
                self.updated_at = Utc::now();
            }
        }
    }
}
