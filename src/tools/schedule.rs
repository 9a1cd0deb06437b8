//! Schedule Agent：create_event / list_events
//!
//! 新事件一律从 pending 开始；确认与取消只能由用户在卡片上触发（见 lifecycle）。

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use super::links::calendar_link;
use super::params::str_param;
use super::{next_id, EventCard, ToolPayload, ToolResult};
use crate::store::{CalendarEvent, EventStatus, SessionStore};

pub struct ScheduleTool {
    store: Arc<dyn SessionStore>,
}

fn card(event: CalendarEvent) -> EventCard {
    let gcal_url = calendar_link(&event);
    EventCard { event, gcal_url }
}

impl ScheduleTool {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, action: &str, params: &Map<String, Value>) -> ToolResult {
        match action {
            "create_event" => self.create_event(params).await,
            "list_events" => self.list_events().await,
            _ => ToolResult::failure("Unknown schedule action."),
        }
    }

    async fn create_event(&self, params: &Map<String, Value>) -> ToolResult {
        let (Some(title), Some(time)) = (str_param(params, "title"), str_param(params, "time"))
        else {
            return ToolResult::failure("Missing title or time for event.");
        };
        let event = CalendarEvent {
            id: next_id(),
            title,
            date: str_param(params, "date")
                .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string()),
            time,
            description: str_param(params, "description").unwrap_or_default(),
            status: EventStatus::Pending,
        };

        if let Err(e) = self.store.add_event(&event).await {
            tracing::error!(error = %e, "failed to persist event");
            return ToolResult::failure(format!("Could not save the event: {}", e));
        }
        tracing::info!(
            event_id = %event.id,
            date = %event.date,
            time = %event.time,
            "event created"
        );

        let message = format!(
            "✅ Event created! Add \"{}\" to your Google Calendar to get reminders.",
            event.title
        );
        ToolResult::ok(message, ToolPayload::Event(card(event)))
    }

    async fn list_events(&self) -> ToolResult {
        let events = match self.store.get_events().await {
            Ok(events) => events,
            Err(e) => return ToolResult::failure(format!("Could not load events: {}", e)),
        };
        let mut active: Vec<CalendarEvent> = events
            .into_iter()
            .filter(|e| e.status != EventStatus::Cancelled)
            .collect();
        // 可解析的按时间排序，无法解析的排在最后并按原文排序
        active.sort_by(|a, b| {
            let ka = (a.starts_at().is_none(), a.starts_at(), &a.date, &a.time);
            let kb = (b.starts_at().is_none(), b.starts_at(), &b.date, &b.time);
            ka.cmp(&kb)
        });

        let message = match active.len() {
            0 => "Your schedule is clear. No events scheduled.".to_string(),
            1 => "📅 You have 1 scheduled event.".to_string(),
            n => format!("📅 You have {} scheduled events.", n),
        };
        ToolResult::ok(
            message,
            ToolPayload::Events(active.into_iter().map(card).collect()),
        )
    }
}
