//! 会话存储抽象层
//!
//! 宿主设备上的键值 / 会话存储对编排层是黑盒协作者：这里只定义它的契约，
//! 并提供一个内存实现（可选 JSON 快照）供 REPL 宿主与测试使用。
//! 同一会话的并发写入必须由存储实现串行化。

pub mod memory;
pub mod records;

use async_trait::async_trait;
use thiserror::Error;

use crate::chat::ChatSession;

pub use memory::MemorySessionStore;
pub use records::{
    CalendarEvent, EmailRecord, EventPatch, EventStatus, PaymentStatus, PaymentTransaction,
    TextDocument, UserContext,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// 会话存储接口
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 所有会话，按 updated_at 倒序
    async fn get_chats(&self) -> Result<Vec<ChatSession>, StoreError>;

    async fn get_chat(&self, id: &str) -> Result<Option<ChatSession>, StoreError>;

    /// 新增或覆盖（按 id）
    async fn save_chat(&self, session: &ChatSession) -> Result<(), StoreError>;

    async fn delete_chat(&self, id: &str) -> Result<(), StoreError>;

    /// 创建并保存一个空会话（标题为默认标题）
    async fn create_chat(&self) -> Result<ChatSession, StoreError>;

    async fn get_events(&self) -> Result<Vec<CalendarEvent>, StoreError>;

    async fn add_event(&self, event: &CalendarEvent) -> Result<(), StoreError>;

    /// 未知 id 返回 NotFound
    async fn update_event(&self, id: &str, patch: &EventPatch) -> Result<(), StoreError>;

    /// 硬删除；未知 id 返回 NotFound
    async fn delete_event(&self, id: &str) -> Result<(), StoreError>;

    async fn add_document(&self, doc: &TextDocument) -> Result<(), StoreError>;

    async fn add_email(&self, email: &EmailRecord) -> Result<(), StoreError>;

    async fn add_payment(&self, tx: &PaymentTransaction) -> Result<(), StoreError>;

    /// 未保存过时返回默认上下文
    async fn get_user_context(&self) -> Result<UserContext, StoreError>;

    async fn save_user_context(&self, ctx: &UserContext) -> Result<(), StoreError>;

    async fn clear_all_data(&self) -> Result<(), StoreError>;
}
