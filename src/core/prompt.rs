//! Prompt 组装
//!
//! 主调用：system 指令（当前时间、用户名、已有日程、Agent 能力表、输出 Schema）
//! + 一条历史上下文 + 当前用户消息（可带一个内联附件）+ 末尾的「只输出 JSON」提示。
//! 辅助调用（标题 / 搜索摘要 / 行情分析）各自只有一条 user 消息。

use chrono::{DateTime, Local};

use crate::intent::AgentKind;
use crate::llm::{Attachment, Message};
use crate::store::CalendarEvent;
use crate::tools::schema::{commands_for, intent_schema_json};
use crate::tools::SearchHit;

/// 注入 system 指令的运行时上下文
pub struct PromptContext<'a> {
    pub now: DateTime<Local>,
    pub user_name: &'a str,
    pub events: &'a [CalendarEvent],
}

/// "date time: title" 以 "; " 连接；无事件时为 "None"
pub fn flatten_events(events: &[CalendarEvent]) -> String {
    if events.is_empty() {
        return "None".to_string();
    }
    events
        .iter()
        .map(|e| format!("{} {}: {}", e.date, e.time, e.title))
        .collect::<Vec<_>>()
        .join("; ")
}

fn agent_rules(agent: AgentKind, user_name: &str) -> Option<String> {
    match agent {
        AgentKind::Email => Some(format!(
            "   Rules: a valid email address is required; if only a name is given (e.g. \"Bob\"), ask for the address instead of calling the tool.\n\
             \x20  You need a topic before drafting. Once you have both, you MUST call the tool with the full drafted body; never paste the draft only in \"response\".\n\
             \x20  Sign the body with \"Best regards,\\n{}\" and use \\n for line breaks.\n\
             \x20  When the draft is ready tell the user they can edit it and then tap Send.",
            user_name
        )),
        AgentKind::Payment => Some(
            "   Rules: this is a simulated ledger. If the amount is not stated, ask \"What is the amount to be paid?\". Never invent an amount."
                .to_string(),
        ),
        AgentKind::Finance => Some(
            "   Rules: use for stocks, crypto, markets or investment questions; always call analyze_stock with a symbol you infer from the request."
                .to_string(),
        ),
        _ => None,
    }
}

/// 主调用的 system 指令
pub fn system_instruction(ctx: &PromptContext<'_>) -> String {
    let mut agents = String::new();
    let order = [
        AgentKind::Schedule,
        AgentKind::Docs,
        AgentKind::Email,
        AgentKind::Search,
        AgentKind::Payment,
        AgentKind::Finance,
    ];
    for (i, agent) in order.iter().enumerate() {
        agents.push_str(&format!("{}. {}\n", i + 1, agent.display_name()));
        for spec in commands_for(*agent) {
            agents.push_str(&format!(
                "   - command \"{}\" | parameters: {}\n",
                spec.command, spec.params
            ));
        }
        if let Some(rules) = agent_rules(*agent, ctx.user_name) {
            agents.push_str(&rules);
            agents.push('\n');
        }
    }
    agents.push_str(&format!(
        "{}. {}: general conversation, no command.\n",
        order.len() + 1,
        AgentKind::Chat.display_name()
    ));

    format!(
        r#"You are Surrogate, an agentic personal assistant that acts on the user's behalf.
Current time: {now}
User name: {name}
Existing events: {events}

Attachments: the user may attach an image, a PDF or an audio recording. Read or transcribe it and answer the content naturally.

## Agents
{agents}
## Instructions
- Work out what the user wants.
- If a required parameter is missing (email address, payment amount, stock symbol), ask for it in "response" and do not set "command".
- Otherwise pick the agent and command and fill "parameters".

## Output
Reply with a single JSON object that matches this schema and nothing else:
{schema}
"#,
        now = ctx.now.format("%Y-%m-%d %H:%M:%S %:z"),
        name = ctx.user_name,
        events = flatten_events(ctx.events),
        agents = agents,
        schema = intent_schema_json(),
    )
}

/// 主调用的完整消息序列
pub fn turn_messages(
    system: String,
    history: &[String],
    user_text: &str,
    attachment: Option<Attachment>,
) -> Vec<Message> {
    let mut messages = vec![Message::system(system)];
    if !history.is_empty() {
        messages.push(Message::user(format!(
            "Previous Context:\n{}",
            history.join("\n")
        )));
    }
    messages.push(Message::user(user_text).with_attachment(attachment));
    messages.push(Message::user("Respond in valid JSON."));
    messages
}

pub fn title_prompt(first_message: &str) -> String {
    format!(
        "Write a very short title (3-5 words) for a chat that starts with the message below. \
         Return only the title, without quotes.\n\nMessage: \"{}\"",
        first_message
    )
}

/// 搜索结果编号列表，摘要调用与摘要失败时的兜底文本共用
pub fn format_results(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, h)| {
            format!(
                "{}. **{}**\n   {}\n   Source: {}",
                i + 1,
                h.title,
                h.snippet,
                h.source
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn digest_prompt(query: &str, hits: &[SearchHit]) -> String {
    format!(
        "Using these search results about \"{}\", write a helpful, natural answer that combines the information. \
         Be concise and informative.\n\nSearch Results:\n{}",
        query,
        format_results(hits)
    )
}

pub fn analysis_prompt(symbol: &str, price: f64, change_percent: f64) -> String {
    format!(
        "Asset: {symbol}\nCurrent Price: ${price}\n24h Change: {change:.2}%\n\n\
         Act as a cautious financial analyst and give a structured trade setup with technical reasoning, in this format:\n\
         Prediction: [Bullish/Bearish/Neutral]\n\
         Reasoning: [brief technical reason]\n\
         Key Levels: Support $[price] | Resistance $[price]\n\
         Setup: SL: $[price] | TP: $[price]\n\n\
         Stay under 60 words.",
        symbol = symbol,
        price = price,
        change = change_percent,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use crate::store::EventStatus;

    fn event(title: &str) -> CalendarEvent {
        CalendarEvent {
            id: "1".into(),
            title: title.into(),
            date: "2026-06-01".into(),
            time: "09:00".into(),
            description: String::new(),
            status: EventStatus::Pending,
        }
    }

    #[test]
    fn test_flatten_events() {
        assert_eq!(flatten_events(&[]), "None");
        assert_eq!(
            flatten_events(&[event("Gym"), event("Dentist")]),
            "2026-06-01 09:00: Gym; 2026-06-01 09:00: Dentist"
        );
    }

    #[test]
    fn test_system_instruction_contents() {
        let events = [event("Gym")];
        let ctx = PromptContext {
            now: Local::now(),
            user_name: "Ayesha",
            events: &events,
        };
        let s = system_instruction(&ctx);
        assert!(s.contains("User name: Ayesha"));
        assert!(s.contains("2026-06-01 09:00: Gym"));
        assert!(s.contains("\"create_event\""));
        assert!(s.contains("Financial Agent"));
        assert!(s.contains("Best regards,\\nAyesha"));
        assert!(s.contains("activeAgent"));
    }

    #[test]
    fn test_turn_messages_layout() {
        let msgs = turn_messages("sys".into(), &[], "hi", None);
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0].role, Role::System);
        assert_eq!(msgs[2].content, "Respond in valid JSON.");

        let history = vec!["user: a".to_string(), "agent: b".to_string()];
        let att = Attachment::new("image/png", "AAAA");
        let msgs = turn_messages("sys".into(), &history, "look", Some(att));
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[1].content, "Previous Context:\nuser: a\nagent: b");
        assert!(msgs[2].attachment.is_some());
        assert!(msgs[3].attachment.is_none());
    }

    #[test]
    fn test_format_results() {
        let hits = vec![SearchHit {
            title: "T".into(),
            snippet: "S".into(),
            source: "src".into(),
        }];
        assert_eq!(format_results(&hits), "1. **T**\n   S\n   Source: src");
    }
}
