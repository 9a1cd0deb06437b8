//! 产物生命周期：日程事件 pending -> confirmed / cancelled
//!
//! 两个转换都由用户在卡片上触发，且必须在同一次操作中：
//! 1. 写入 Session Store（cancel 额外从存储中删除该事件）；
//! 2. 修补 Transcript 中该事件的所有嵌入副本（单个或列表载荷）。
//!
//! cancel 在状态写入成功后立即修补副本，再删除；删除失败后重试会补完删除。
//!
//! 终态不可逆：对已确认 / 已取消的事件再次操作返回 [`LifecycleError::AlreadyTerminal`]。

pub mod reminders;

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::chat::Transcript;
use crate::store::{CalendarEvent, EventPatch, EventStatus, SessionStore, StoreError};

pub use reminders::{plan_reminders, Notifier, NotifyError, Reminder, ReminderKind};

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Event {id} is already {status:?}")]
    AlreadyTerminal { id: String, status: EventStatus },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// 一次转换的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub event: CalendarEvent,
    /// 被修补的嵌入副本数
    pub patched_copies: usize,
    /// 成功交给 Notifier 的提醒数
    pub reminders: usize,
}

pub struct ArtifactManager {
    store: Arc<dyn SessionStore>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ArtifactManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn confirm(
        &self,
        transcript: &mut Transcript,
        event_id: &str,
    ) -> Result<Transition, LifecycleError> {
        let stored = self.stored_event(event_id).await?;
        let mut event = pending(transcript, event_id, stored)?;
        self.store
            .update_event(event_id, &EventPatch::status(EventStatus::Confirmed))
            .await?;
        event.status = EventStatus::Confirmed;
        let patched_copies = transcript.relabel_event(event_id, EventStatus::Confirmed);
        tracing::info!(event_id, patched_copies, "event confirmed");

        let reminders = self.schedule_reminders(&event).await;
        Ok(Transition {
            event,
            patched_copies,
            reminders,
        })
    }

    pub async fn cancel(
        &self,
        transcript: &mut Transcript,
        event_id: &str,
    ) -> Result<Transition, LifecycleError> {
        let mut event = match self.stored_event(event_id).await? {
            // 上次取消已写入状态但删除失败
            Some(event) if event.status == EventStatus::Cancelled => {
                tracing::info!(event_id, "resuming interrupted cancel");
                event
            }
            stored => {
                let event = pending(transcript, event_id, stored)?;
                self.store
                    .update_event(event_id, &EventPatch::status(EventStatus::Cancelled))
                    .await?;
                event
            }
        };
        event.status = EventStatus::Cancelled;
        // Turn 保留，仅改显示状态
        let patched_copies = transcript.relabel_event(event_id, EventStatus::Cancelled);
        self.store.delete_event(event_id).await?;
        tracing::info!(event_id, patched_copies, "event cancelled");

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.cancel_for(event_id).await {
                tracing::warn!(event_id, error = %e, "failed to withdraw reminders");
            }
        }
        Ok(Transition {
            event,
            patched_copies,
            reminders: 0,
        })
    }

    async fn stored_event(&self, event_id: &str) -> Result<Option<CalendarEvent>, LifecycleError> {
        Ok(self
            .store
            .get_events()
            .await?
            .into_iter()
            .find(|e| e.id == event_id))
    }

    async fn schedule_reminders(&self, event: &CalendarEvent) -> usize {
        let Some(notifier) = &self.notifier else {
            return 0;
        };
        let mut scheduled = 0;
        for reminder in plan_reminders(event, Utc::now()) {
            match notifier.schedule(&reminder).await {
                Ok(()) => scheduled += 1,
                Err(e) => {
                    tracing::warn!(
                        event_id = %event.id,
                        kind = ?reminder.kind,
                        error = %e,
                        "reminder not scheduled"
                    )
                }
            }
        }
        scheduled
    }
}

/// 只有 pending 事件可以转换；已删除的事件按嵌入副本的状态判断是否为终态
fn pending(
    transcript: &Transcript,
    event_id: &str,
    stored: Option<CalendarEvent>,
) -> Result<CalendarEvent, LifecycleError> {
    match stored {
        Some(event) if event.status.is_terminal() => Err(LifecycleError::AlreadyTerminal {
            id: event_id.to_string(),
            status: event.status,
        }),
        Some(event) => Ok(event),
        None => match transcript.embedded_status(event_id) {
            Some(status) if status.is_terminal() => Err(LifecycleError::AlreadyTerminal {
                id: event_id.to_string(),
                status,
            }),
            _ => Err(LifecycleError::UnknownEvent(event_id.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::chat::{ChatSession, Turn};
    use crate::store::{
        EmailRecord, MemorySessionStore, PaymentTransaction, TextDocument, UserContext,
    };
    use crate::tools::{EventCard, ToolPayload};

    #[derive(Default)]
    struct RecordingNotifier {
        scheduled: Mutex<Vec<Reminder>>,
        cancelled: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn schedule(&self, reminder: &Reminder) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError("denied".into()));
            }
            self.scheduled.lock().unwrap().push(reminder.clone());
            Ok(())
        }

        async fn cancel_for(&self, event_id: &str) -> Result<(), NotifyError> {
            self.cancelled.lock().unwrap().push(event_id.to_string());
            Ok(())
        }
    }

    fn future_event(id: &str) -> CalendarEvent {
        let start = Utc::now() + Duration::days(2);
        CalendarEvent {
            id: id.into(),
            title: "Dentist".into(),
            date: start.format("%Y-%m-%d").to_string(),
            time: "10:00".into(),
            description: String::new(),
            status: EventStatus::Pending,
        }
    }

    fn card(event: &CalendarEvent) -> EventCard {
        EventCard {
            event: event.clone(),
            gcal_url: None,
        }
    }

    /// 单个载荷 + 列表载荷各引用一次同一事件
    async fn setup(event: &CalendarEvent) -> (Arc<MemorySessionStore>, Transcript) {
        let store = Arc::new(MemorySessionStore::new());
        store.add_event(event).await.unwrap();
        let mut transcript = Transcript::new(ChatSession::new());
        let mut created = Turn::agent("created");
        created.payload = Some(ToolPayload::Event(card(event)));
        transcript.push(created);
        transcript.push(Turn::user("list"));
        let mut listed = Turn::agent("listed");
        listed.payload = Some(ToolPayload::Events(vec![card(event)]));
        transcript.push(listed);
        (store, transcript)
    }

    #[tokio::test]
    async fn test_confirm_updates_store_and_every_copy() {
        let event = future_event("e1");
        let (store, mut transcript) = setup(&event).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = ArtifactManager::new(store.clone()).with_notifier(notifier.clone());

        let t = manager.confirm(&mut transcript, "e1").await.unwrap();
        assert_eq!(t.event.status, EventStatus::Confirmed);
        assert_eq!(t.patched_copies, 2);
        assert_eq!(t.reminders, 3);
        assert_eq!(notifier.scheduled.lock().unwrap().len(), 3);

        let stored = store.get_events().await.unwrap();
        assert_eq!(stored[0].status, EventStatus::Confirmed);
        for i in transcript.turns_referencing("e1") {
            let payload = transcript.session().turns()[i].payload.as_ref().unwrap();
            assert_eq!(payload.event_status("e1"), Some(EventStatus::Confirmed));
        }
    }

    #[tokio::test]
    async fn test_cancel_deletes_but_keeps_turns() {
        let event = future_event("e2");
        let (store, mut transcript) = setup(&event).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = ArtifactManager::new(store.clone()).with_notifier(notifier.clone());

        let t = manager.cancel(&mut transcript, "e2").await.unwrap();
        assert_eq!(t.patched_copies, 2);
        assert!(store.get_events().await.unwrap().is_empty());
        assert_eq!(transcript.session().len(), 3);
        assert_eq!(transcript.embedded_status("e2"), Some(EventStatus::Cancelled));
        assert_eq!(*notifier.cancelled.lock().unwrap(), vec!["e2".to_string()]);
    }

    #[tokio::test]
    async fn test_terminal_states_are_final() {
        let event = future_event("e3");
        let (store, mut transcript) = setup(&event).await;
        let manager = ArtifactManager::new(store.clone());

        manager.confirm(&mut transcript, "e3").await.unwrap();
        assert!(matches!(
            manager.cancel(&mut transcript, "e3").await,
            Err(LifecycleError::AlreadyTerminal { status: EventStatus::Confirmed, .. })
        ));
        assert_eq!(transcript.embedded_status("e3"), Some(EventStatus::Confirmed));

        let other = future_event("e4");
        let (store, mut transcript) = setup(&other).await;
        let manager = ArtifactManager::new(store);
        manager.cancel(&mut transcript, "e4").await.unwrap();
        assert!(matches!(
            manager.confirm(&mut transcript, "e4").await,
            Err(LifecycleError::AlreadyTerminal { status: EventStatus::Cancelled, .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_event_and_notifier_failure() {
        let event = future_event("e5");
        let (store, mut transcript) = setup(&event).await;
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let manager = ArtifactManager::new(store).with_notifier(notifier);

        assert!(matches!(
            manager.confirm(&mut transcript, "nope").await,
            Err(LifecycleError::UnknownEvent(_))
        ));
        let t = manager.confirm(&mut transcript, "e5").await.unwrap();
        assert_eq!(t.reminders, 0);
        assert_eq!(t.event.status, EventStatus::Confirmed);
    }

    /// 第一次 delete_event 失败，其余委托给内存存储
    struct FlakyDeleteStore {
        inner: MemorySessionStore,
        failed_once: AtomicBool,
    }

    #[async_trait]
    impl SessionStore for FlakyDeleteStore {
        async fn get_chats(&self) -> Result<Vec<ChatSession>, StoreError> {
            self.inner.get_chats().await
        }
        async fn get_chat(&self, id: &str) -> Result<Option<ChatSession>, StoreError> {
            self.inner.get_chat(id).await
        }
        async fn save_chat(&self, session: &ChatSession) -> Result<(), StoreError> {
            self.inner.save_chat(session).await
        }
        async fn delete_chat(&self, id: &str) -> Result<(), StoreError> {
            self.inner.delete_chat(id).await
        }
        async fn create_chat(&self) -> Result<ChatSession, StoreError> {
            self.inner.create_chat().await
        }
        async fn get_events(&self) -> Result<Vec<CalendarEvent>, StoreError> {
            self.inner.get_events().await
        }
        async fn add_event(&self, event: &CalendarEvent) -> Result<(), StoreError> {
            self.inner.add_event(event).await
        }
        async fn update_event(&self, id: &str, patch: &EventPatch) -> Result<(), StoreError> {
            self.inner.update_event(id, patch).await
        }
        async fn delete_event(&self, id: &str) -> Result<(), StoreError> {
            if !self.failed_once.swap(true, Ordering::SeqCst) {
                return Err(StoreError::Unavailable("disk full".into()));
            }
            self.inner.delete_event(id).await
        }
        async fn add_document(&self, doc: &TextDocument) -> Result<(), StoreError> {
            self.inner.add_document(doc).await
        }
        async fn add_email(&self, email: &EmailRecord) -> Result<(), StoreError> {
            self.inner.add_email(email).await
        }
        async fn add_payment(&self, tx: &PaymentTransaction) -> Result<(), StoreError> {
            self.inner.add_payment(tx).await
        }
        async fn get_user_context(&self) -> Result<UserContext, StoreError> {
            self.inner.get_user_context().await
        }
        async fn save_user_context(&self, ctx: &UserContext) -> Result<(), StoreError> {
            self.inner.save_user_context(ctx).await
        }
        async fn clear_all_data(&self) -> Result<(), StoreError> {
            self.inner.clear_all_data().await
        }
    }

    #[tokio::test]
    async fn test_cancel_retry_after_failed_delete() {
        let event = future_event("e6");
        let (_, mut transcript) = setup(&event).await;
        let store = Arc::new(FlakyDeleteStore {
            inner: MemorySessionStore::new(),
            failed_once: AtomicBool::new(false),
        });
        store.add_event(&event).await.unwrap();
        let manager = ArtifactManager::new(store.clone());

        assert!(matches!(
            manager.cancel(&mut transcript, "e6").await,
            Err(LifecycleError::Store(StoreError::Unavailable(_)))
        ));
        // 状态已写入，副本已同步
        assert_eq!(store.get_events().await.unwrap()[0].status, EventStatus::Cancelled);
        assert_eq!(transcript.embedded_status("e6"), Some(EventStatus::Cancelled));

        let t = manager.cancel(&mut transcript, "e6").await.unwrap();
        assert_eq!(t.event.status, EventStatus::Cancelled);
        assert_eq!(t.patched_copies, 2);
        assert!(store.get_events().await.unwrap().is_empty());
        assert!(matches!(
            manager.confirm(&mut transcript, "e6").await,
            Err(LifecycleError::AlreadyTerminal { status: EventStatus::Cancelled, .. })
        ));
    }
}
