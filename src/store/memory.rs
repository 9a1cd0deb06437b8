//! 内存会话存储，可选 JSON 快照
//!
//! 所有写入经过同一把 RwLock，天然按会话串行化。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{
    CalendarEvent, EmailRecord, EventPatch, PaymentTransaction, SessionStore, StoreError,
    TextDocument, UserContext,
};
use crate::chat::ChatSession;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreData {
    #[serde(default)]
    chats: Vec<ChatSession>,
    #[serde(default)]
    events: Vec<CalendarEvent>,
    #[serde(default)]
    documents: Vec<TextDocument>,
    #[serde(default)]
    emails: Vec<EmailRecord>,
    #[serde(default)]
    payments: Vec<PaymentTransaction>,
    #[serde(default)]
    user_context: Option<UserContext>,
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    data: RwLock<StoreData>,
    /// 设置后每次写入都会落盘
    snapshot_path: Option<PathBuf>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开快照文件；文件不存在时从空存储开始
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let store = if path.exists() {
            Self::load_from(&path).await?
        } else {
            Self::new()
        };
        Ok(Self {
            snapshot_path: Some(path),
            ..store
        })
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        let json = {
            let data = self.data.read().await;
            serde_json::to_string_pretty(&*data)?
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn load_from(path: &Path) -> Result<Self, StoreError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let data: StoreData = serde_json::from_str(&raw)?;
        Ok(Self {
            data: RwLock::new(data),
            snapshot_path: None,
        })
    }

    pub async fn documents(&self) -> Vec<TextDocument> {
        self.data.read().await.documents.clone()
    }

    pub async fn emails(&self) -> Vec<EmailRecord> {
        self.data.read().await.emails.clone()
    }

    pub async fn payments(&self) -> Vec<PaymentTransaction> {
        self.data.read().await.payments.clone()
    }

    async fn persist(&self) -> Result<(), StoreError> {
        match &self.snapshot_path {
            Some(path) => self.save_to(path).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_chats(&self) -> Result<Vec<ChatSession>, StoreError> {
        let mut chats = self.data.read().await.chats.clone();
        chats.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        Ok(chats)
    }

    async fn get_chat(&self, id: &str) -> Result<Option<ChatSession>, StoreError> {
        let data = self.data.read().await;
        Ok(data.chats.iter().find(|c| c.id() == id).cloned())
    }

    async fn save_chat(&self, session: &ChatSession) -> Result<(), StoreError> {
        {
            let mut data = self.data.write().await;
            match data.chats.iter_mut().find(|c| c.id() == session.id()) {
                Some(existing) => *existing = session.clone(),
                None => data.chats.push(session.clone()),
            }
        }
        self.persist().await
    }

    async fn delete_chat(&self, id: &str) -> Result<(), StoreError> {
        self.data.write().await.chats.retain(|c| c.id() != id);
        self.persist().await
    }

    async fn create_chat(&self) -> Result<ChatSession, StoreError> {
        let session = ChatSession::new();
        self.save_chat(&session).await?;
        Ok(session)
    }

    async fn get_events(&self) -> Result<Vec<CalendarEvent>, StoreError> {
        Ok(self.data.read().await.events.clone())
    }

    async fn add_event(&self, event: &CalendarEvent) -> Result<(), StoreError> {
        self.data.write().await.events.push(event.clone());
        self.persist().await
    }

    async fn update_event(&self, id: &str, patch: &EventPatch) -> Result<(), StoreError> {
        {
            let mut data = self.data.write().await;
            let event = data
                .events
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| StoreError::NotFound(format!("event {}", id)))?;
            patch.apply(event);
        }
        self.persist().await
    }

    async fn delete_event(&self, id: &str) -> Result<(), StoreError> {
        {
            let mut data = self.data.write().await;
            let before = data.events.len();
            data.events.retain(|e| e.id != id);
            if data.events.len() == before {
                return Err(StoreError::NotFound(format!("event {}", id)));
            }
        }
        self.persist().await
    }

    async fn add_document(&self, doc: &TextDocument) -> Result<(), StoreError> {
        self.data.write().await.documents.push(doc.clone());
        self.persist().await
    }

    async fn add_email(&self, email: &EmailRecord) -> Result<(), StoreError> {
        self.data.write().await.emails.push(email.clone());
        self.persist().await
    }

    async fn add_payment(&self, tx: &PaymentTransaction) -> Result<(), StoreError> {
        self.data.write().await.payments.push(tx.clone());
        self.persist().await
    }

    async fn get_user_context(&self) -> Result<UserContext, StoreError> {
        Ok(self
            .data
            .read()
            .await
            .user_context
            .clone()
            .unwrap_or_default())
    }

    async fn save_user_context(&self, ctx: &UserContext) -> Result<(), StoreError> {
        self.data.write().await.user_context = Some(ctx.clone());
        self.persist().await
    }

    async fn clear_all_data(&self) -> Result<(), StoreError> {
        *self.data.write().await = StoreData::default();
        self.persist().await
    }
}
