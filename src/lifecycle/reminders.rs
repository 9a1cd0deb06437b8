//! 已确认事件的提醒计划
//!
//! 开始前 30 分钟、15 分钟（仅当仍在未来）以及开始时各一条；已经开始的事件不安排任何提醒。
//! 真正的投递由宿主的 [`Notifier`] 完成。

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::store::CalendarEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderKind {
    Reminder30,
    Reminder15,
    EventStart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub event_id: String,
    pub kind: ReminderKind,
    pub at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

#[derive(Error, Debug)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// 宿主通知通道
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn schedule(&self, reminder: &Reminder) -> Result<(), NotifyError>;

    /// 撤销该事件已安排的全部提醒
    async fn cancel_for(&self, event_id: &str) -> Result<(), NotifyError>;
}

pub fn plan_reminders(event: &CalendarEvent, now: DateTime<Utc>) -> Vec<Reminder> {
    let Some(start) = event.starts_at() else {
        return Vec::new();
    };
    if start <= now {
        return Vec::new();
    }

    let reminder = |kind, at, title: &str, body: String| Reminder {
        event_id: event.id.clone(),
        kind,
        at,
        title: title.to_string(),
        body,
    };
    let mut plan = Vec::with_capacity(3);
    let at30 = start - Duration::minutes(30);
    if at30 > now {
        plan.push(reminder(
            ReminderKind::Reminder30,
            at30,
            "🔔 Reminder: Event in 30 minutes",
            format!("{} starts at {}", event.title, event.time),
        ));
    }
    let at15 = start - Duration::minutes(15);
    if at15 > now {
        plan.push(reminder(
            ReminderKind::Reminder15,
            at15,
            "⚠️ Reminder: Event in 15 minutes",
            format!("{} starts soon at {}", event.title, event.time),
        ));
    }
    let body = if event.description.is_empty() {
        event.title.clone()
    } else {
        format!("{} - {}", event.title, event.description)
    };
    plan.push(reminder(ReminderKind::EventStart, start, "📅 Event Starting Now!", body));
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventStatus;
    use chrono::TimeZone;

    fn event() -> CalendarEvent {
        CalendarEvent {
            id: "42".into(),
            title: "Standup".into(),
            date: "2026-03-10".into(),
            time: "09:00".into(),
            description: "Room 4".into(),
            status: EventStatus::Confirmed,
        }
    }

    #[test]
    fn test_full_plan_well_ahead() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 7, 0, 0).unwrap();
        let plan = plan_reminders(&event(), now);
        let kinds: Vec<_> = plan.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![ReminderKind::Reminder30, ReminderKind::Reminder15, ReminderKind::EventStart]
        );
        assert_eq!(plan[0].at, Utc.with_ymd_and_hms(2026, 3, 10, 8, 30, 0).unwrap());
        assert_eq!(plan[0].body, "Standup starts at 09:00");
        assert_eq!(plan[2].body, "Standup - Room 4");
    }

    #[test]
    fn test_close_and_past_events() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 8, 40, 0).unwrap();
        let plan = plan_reminders(&event(), now);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, ReminderKind::EventStart);

        let later = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        assert!(plan_reminders(&event(), later).is_empty());

        let mut bad = event();
        bad.time = "morning".into();
        assert!(plan_reminders(&bad, now).is_empty());
    }
}
