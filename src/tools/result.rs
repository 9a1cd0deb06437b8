//! 工具执行结果与渲染层契约
//!
//! ToolResult 由一次工具调用产生、被 Orchestrator 立即消费；ToolPayload 的各变体（EVENT / DOC / EMAIL /
//! PAYMENT / FINANCE_REPORT / SEARCH_RESULT）是渲染层据以切换组件的稳定契约。

use serde::{Deserialize, Serialize};

use crate::store::{CalendarEvent, EmailRecord, EventStatus, PaymentTransaction, TextDocument};

/// 载荷类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadType {
    Event,
    Doc,
    Email,
    Payment,
    FinanceReport,
    SearchResult,
}

/// 数据来源质量：实时 / 模拟 / 未经验证（模型自身知识）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Live,
    Synthetic,
    Unverified,
}

/// 日程卡片：事件 + Google Calendar 深链
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCard {
    #[serde(flatten)]
    pub event: CalendarEvent,
    #[serde(rename = "gCalUrl")]
    pub gcal_url: Option<String>,
}

/// 邮件草稿卡片：历史记录 + mailto / 网页邮箱深链
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDraft {
    #[serde(flatten)]
    pub email: EmailRecord,
    pub mailto: String,
    pub gmail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl Recommendation {
    /// 涨跌幅超过 ±1% 给出 BUY / SELL，否则 HOLD
    pub fn from_change_percent(percent: f64) -> Self {
        if percent > 1.0 {
            Recommendation::Buy
        } else if percent < -1.0 {
            Recommendation::Sell
        } else {
            Recommendation::Hold
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialReport {
    pub symbol: String,
    pub price: f64,
    pub currency: String,
    pub change: f64,
    pub change_percent: f64,
    pub market_cap: String,
    pub pe_ratio: Option<f64>,
    #[serde(rename = "week52High")]
    pub week52_high: f64,
    #[serde(rename = "week52Low")]
    pub week52_low: f64,
    pub recommendation: Recommendation,
    pub analysis: String,
    pub data_quality: DataQuality,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPayload {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub data_quality: DataQuality,
}

/// 附着在 Turn 上的类型化载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolPayload {
    /// create_event 的单个事件
    Event(EventCard),
    /// list_events 的事件列表
    Events(Vec<EventCard>),
    Doc(TextDocument),
    Email(EmailDraft),
    Payment(PaymentTransaction),
    FinanceReport(FinancialReport),
    SearchResult(SearchPayload),
}

impl ToolPayload {
    pub fn payload_type(&self) -> PayloadType {
        match self {
            ToolPayload::Event(_) | ToolPayload::Events(_) => PayloadType::Event,
            ToolPayload::Doc(_) => PayloadType::Doc,
            ToolPayload::Email(_) => PayloadType::Email,
            ToolPayload::Payment(_) => PayloadType::Payment,
            ToolPayload::FinanceReport(_) => PayloadType::FinanceReport,
            ToolPayload::SearchResult(_) => PayloadType::SearchResult,
        }
    }

    /// 载荷中嵌入的事件 id（单个或列表两种形态）
    pub fn event_ids(&self) -> Vec<&str> {
        match self {
            ToolPayload::Event(card) => vec![card.event.id.as_str()],
            ToolPayload::Events(cards) => cards.iter().map(|c| c.event.id.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// 把嵌入的事件副本改为 status；返回改动的副本数
    pub fn relabel_event(&mut self, event_id: &str, status: EventStatus) -> usize {
        let cards: Vec<&mut EventCard> = match self {
            ToolPayload::Event(card) => vec![card],
            ToolPayload::Events(cards) => cards.iter_mut().collect(),
            _ => return 0,
        };
        let mut patched = 0;
        for card in cards.into_iter().filter(|c| c.event.id == event_id) {
            card.event.status = status;
            patched += 1;
        }
        patched
    }

    /// 查找嵌入副本中某事件的状态
    pub fn event_status(&self, event_id: &str) -> Option<EventStatus> {
        match self {
            ToolPayload::Event(card) if card.event.id == event_id => Some(card.event.status),
            ToolPayload::Events(cards) => cards
                .iter()
                .find(|c| c.event.id == event_id)
                .map(|c| c.event.status),
            _ => None,
        }
    }
}

/// 一次 Agent 工具调用的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub message: String,
    pub data: Option<ToolPayload>,
}

impl ToolResult {
    pub fn ok(message: impl Into<String>, data: ToolPayload) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    /// 校验失败 / 未知命令：不抛错，消息内联到回复中
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Chat Agent 的空结果
    pub fn empty() -> Self {
        Self {
            success: true,
            message: String::new(),
            data: None,
        }
    }

    pub fn payload_type(&self) -> Option<PayloadType> {
        self.data.as_ref().map(ToolPayload::payload_type)
    }
}
