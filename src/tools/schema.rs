//! 意图输出 JSON Schema 与 Agent 命令目录
//!
//! schemars 从 [`IntentFormat`] 生成 Schema 注入 system prompt；[`COMMANDS`] 列出每个 Agent 可用的命令与参数，
//! 同样拼进 prompt，减少模型编造命令名。

use schemars::{schema_for, JsonSchema};
use serde_json::{Map, Value};

use crate::intent::AgentKind;

/// 要求模型输出的 JSON 结构（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
#[serde(rename_all = "camelCase")]
struct IntentFormat {
    /// Natural language reply shown to the user
    pub response: String,
    /// Detected emotion of the user message
    pub detected_tone: String,
    /// Detected language code, e.g. en, ur, pa
    pub detected_language: String,
    /// One of the agent names listed above, e.g. "Schedule Agent"
    pub active_agent: String,
    /// Command for the selected agent; omit for plain conversation
    pub command: Option<String>,
    /// Command parameters
    pub parameters: Option<Map<String, Value>>,
}

/// 返回意图 JSON Schema 字符串，可拼入 system prompt
pub fn intent_schema_json() -> String {
    let schema = schema_for!(IntentFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

/// 一个 Agent 命令
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub agent: AgentKind,
    pub command: &'static str,
    pub params: &'static str,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        agent: AgentKind::Schedule,
        command: "create_event",
        params: "title, time (HH:mm, e.g. \"14:00\"), date (YYYY-MM-DD), description",
    },
    CommandSpec {
        agent: AgentKind::Schedule,
        command: "list_events",
        params: "none",
    },
    CommandSpec {
        agent: AgentKind::Docs,
        command: "create_doc",
        params: "title, content (markdown allowed; draft the full text yourself when given only a topic)",
    },
    CommandSpec {
        agent: AgentKind::Email,
        command: "send_email",
        params: "to (email address), subject, body",
    },
    CommandSpec {
        agent: AgentKind::Search,
        command: "web_search",
        params: "query",
    },
    CommandSpec {
        agent: AgentKind::Payment,
        command: "make_payment",
        params: "amount (number), recipient, description, currency",
    },
    CommandSpec {
        agent: AgentKind::Finance,
        command: "analyze_stock",
        params: "symbol (e.g. AAPL, BTC-USD, ETH-USD), required",
    },
];

/// 某 Agent 的命令列表
pub fn commands_for(agent: AgentKind) -> impl Iterator<Item = &'static CommandSpec> {
    COMMANDS.iter().filter(move |c| c.agent == agent)
}
