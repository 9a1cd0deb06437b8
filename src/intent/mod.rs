//! 意图层：从补全文本恢复结构化 Intent
//!
//! Intent 只在一轮编排中存在，从不直接持久化。

pub mod extract;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::AgentError;

pub use extract::extract_json_object;

/// 固定的领域 Agent 集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    #[serde(rename = "Chat Agent")]
    Chat,
    #[serde(rename = "Schedule Agent")]
    Schedule,
    #[serde(rename = "Docs Agent")]
    Docs,
    #[serde(rename = "Email Agent")]
    Email,
    #[serde(rename = "Payment Agent")]
    Payment,
    #[serde(rename = "Financial Agent")]
    Finance,
    #[serde(rename = "Search Agent")]
    Search,
}

impl AgentKind {
    pub const ALL: [AgentKind; 7] = [
        AgentKind::Schedule,
        AgentKind::Docs,
        AgentKind::Email,
        AgentKind::Search,
        AgentKind::Payment,
        AgentKind::Finance,
        AgentKind::Chat,
    ];

    /// 展示名（同时是 Prompt 中要求模型输出的 activeAgent 取值）
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentKind::Chat => "Chat Agent",
            AgentKind::Schedule => "Schedule Agent",
            AgentKind::Docs => "Docs Agent",
            AgentKind::Email => "Email Agent",
            AgentKind::Payment => "Payment Agent",
            AgentKind::Finance => "Financial Agent",
            AgentKind::Search => "Search Agent",
        }
    }

    /// 宽松解析：大小写不敏感，接受 "Schedule" 与 "Schedule Agent" 两种写法
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        let key = lower.strip_suffix(" agent").unwrap_or(&lower).trim();
        match key {
            "chat" => Some(AgentKind::Chat),
            "schedule" | "scheduling" | "calendar" => Some(AgentKind::Schedule),
            "docs" | "doc" | "documents" => Some(AgentKind::Docs),
            "email" | "mail" => Some(AgentKind::Email),
            "payment" | "payments" => Some(AgentKind::Payment),
            "finance" | "financial" => Some(AgentKind::Finance),
            "search" | "web search" => Some(AgentKind::Search),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIntent {
    response: Option<Value>,
    detected_tone: Option<Value>,
    detected_language: Option<Value>,
    active_agent: Option<Value>,
    command: Option<Value>,
    parameters: Option<Value>,
}

/// 字段类型不对时不让整轮失败：数字 / 布尔转成文本，其余视为缺失
fn lenient_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 从补全恢复的结构化意图
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub response: Option<String>,
    pub detected_tone: Option<String>,
    pub detected_language: Option<String>,
    /// 未知或缺失的 Agent 为 None（按纯对话处理）
    pub active_agent: Option<AgentKind>,
    pub command: Option<String>,
    pub parameters: Map<String, Value>,
}

impl Intent {
    /// 抽取并解析；抽取后仍不是合法 JSON 对象时返回 JsonParse（整轮致命）
    pub fn parse(completion: &str) -> Result<Self, AgentError> {
        let candidate = extract_json_object(completion);
        let raw: RawIntent =
            serde_json::from_str(&candidate).map_err(|e| AgentError::JsonParse {
                reason: e.to_string(),
                raw: candidate.clone(),
            })?;

        let agent = lenient_text(raw.active_agent);
        if agent.as_deref().is_some_and(|a| AgentKind::parse(a).is_none()) {
            tracing::warn!(agent = ?agent, "unrecognized agent, treating turn as chat");
        }

        Ok(Self {
            response: lenient_text(raw.response),
            detected_tone: lenient_text(raw.detected_tone),
            detected_language: lenient_text(raw.detected_language),
            active_agent: agent.as_deref().and_then(AgentKind::parse),
            command: lenient_text(raw.command).filter(|c| !c.trim().is_empty()),
            parameters: match raw.parameters {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            },
        })
    }

    /// 需要分发给工具的 (agent, command)；Chat 或缺少 command 时为 None
    pub fn dispatch_target(&self) -> Option<(AgentKind, &str)> {
        match (self.active_agent, self.command.as_deref()) {
            (Some(agent), Some(command)) if agent != AgentKind::Chat => Some((agent, command)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_parse_forms() {
        assert_eq!(AgentKind::parse("Schedule"), Some(AgentKind::Schedule));
        assert_eq!(AgentKind::parse("schedule agent"), Some(AgentKind::Schedule));
        assert_eq!(AgentKind::parse("Financial Agent"), Some(AgentKind::Finance));
        assert_eq!(AgentKind::parse("Finance"), Some(AgentKind::Finance));
        assert_eq!(AgentKind::parse("Weather Agent"), None);
        for agent in AgentKind::ALL {
            assert_eq!(AgentKind::parse(agent.display_name()), Some(agent));
        }
    }

    #[test]
    fn test_parse_scheduling_intent() {
        let raw = "```json\n{\"response\": \"Booked.\", \"detectedTone\": \"Happy\", \"detectedLanguage\": \"en\", \"activeAgent\": \"Schedule Agent\", \"command\": \"create_event\", \"parameters\": {\"title\": \"Lunch\", \"time\": \"12:00\"}}\n```";
        let intent = Intent::parse(raw).unwrap();
        assert_eq!(intent.active_agent, Some(AgentKind::Schedule));
        assert_eq!(intent.dispatch_target(), Some((AgentKind::Schedule, "create_event")));
        assert_eq!(intent.parameters["title"], "Lunch");
    }

    #[test]
    fn test_chat_and_missing_command_not_dispatched() {
        let chat = Intent::parse(r#"{"response": "hi", "activeAgent": "Chat", "command": "x"}"#).unwrap();
        assert_eq!(chat.dispatch_target(), None);

        let email = Intent::parse(r#"{"response": "What is Bob's address?", "activeAgent": "Email Agent"}"#).unwrap();
        assert_eq!(email.dispatch_target(), None);
    }

    #[test]
    fn test_unknown_agent_becomes_none() {
        let intent = Intent::parse(r#"{"response": "?", "activeAgent": "Weather", "command": "get"}"#).unwrap();
        assert_eq!(intent.active_agent, None);
        assert_eq!(intent.dispatch_target(), None);
    }

    #[test]
    fn test_non_object_parameters_ignored() {
        let intent = Intent::parse(r#"{"response": "x", "parameters": "none"}"#).unwrap();
        assert!(intent.parameters.is_empty());
    }

    #[test]
    fn test_wrongly_typed_fields_do_not_fail_the_turn() {
        let intent = Intent::parse(
            r#"{"response": 42, "detectedTone": 3, "detectedLanguage": null, "activeAgent": ["Chat"]}"#,
        )
        .unwrap();
        assert_eq!(intent.response.as_deref(), Some("42"));
        assert_eq!(intent.detected_tone.as_deref(), Some("3"));
        assert_eq!(intent.detected_language, None);
        assert_eq!(intent.active_agent, None);
    }

    #[test]
    fn test_malformed_is_json_parse_error() {
        let err = Intent::parse("{\"response\": \"x\",, }").unwrap_err();
        assert!(err.is_malformed_output());
        let err = Intent::parse("no json here").unwrap_err();
        assert!(matches!(err, AgentError::JsonParse { .. }));
    }
}
