//! 会话存储中的领域记录
//!
//! 日程事件是唯一有生命周期的产物：pending -> confirmed / cancelled，终态不可逆。

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// 日程事件状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl EventStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EventStatus::Pending)
    }
}

/// 日程事件；date 为 YYYY-MM-DD，time 为 HH:mm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub description: String,
    pub status: EventStatus,
}

impl CalendarEvent {
    /// 开始时间（按 UTC 解释）；日期或时间无法解析时为 None
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()?;
        let time = NaiveTime::parse_from_str(self.time.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(self.time.trim(), "%H:%M:%S"))
            .ok()?;
        Some(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)))
    }
}

/// updateEvent 的部分更新
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub description: Option<String>,
    pub status: Option<EventStatus>,
}

impl EventPatch {
    pub fn status(status: EventStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply(&self, event: &mut CalendarEvent) {
        if let Some(v) = &self.title {
            event.title = v.clone();
        }
        if let Some(v) = &self.date {
            event.date = v.clone();
        }
        if let Some(v) = &self.time {
            event.time = v.clone();
        }
        if let Some(v) = &self.description {
            event.description = v.clone();
        }
        if let Some(v) = self.status {
            event.status = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// 邮件草稿历史（从不真正发送）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    pub id: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Success,
}

/// 模拟账本中的一笔交易
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: String,
    pub amount: f64,
    pub currency: String,
    pub recipient: String,
    pub description: String,
    pub status: PaymentStatus,
    pub timestamp: DateTime<Utc>,
}

impl PaymentTransaction {
    /// 交易参考号：id 末 6 位
    pub fn reference(&self) -> &str {
        let skip = self.id.chars().count().saturating_sub(6);
        match self.id.char_indices().nth(skip) {
            Some((idx, _)) => &self.id[idx..],
            None => &self.id,
        }
    }
}

/// 用户上下文（昵称、主题等）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_language")]
    pub preferred_language: String,
    #[serde(default)]
    pub has_seen_intro: bool,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_theme() -> String {
    "dark".to_string()
}

impl Default for UserContext {
    fn default() -> Self {
        Self {
            name: String::new(),
            preferred_language: default_language(),
            has_seen_intro: false,
            theme: default_theme(),
        }
    }
}
