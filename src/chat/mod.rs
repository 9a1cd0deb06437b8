//! 聊天记录模型
//!
//! - [`ChatSession`]：可持久化的会话（Turn 序列、标题、最后消息缓存）
//! - [`Transcript`]：宿主持有的内存视图，附带事件 id 索引用于生命周期修补

pub mod session;
pub mod transcript;

pub use session::{ChatSession, Sender, Turn, DEFAULT_TITLE};
pub use transcript::Transcript;
