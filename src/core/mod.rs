//! 核心编排层：补全客户端、Prompt 组装、单轮编排与会话驱动

pub mod completion;
pub mod conversation;
pub mod error;
pub mod orchestrator;
pub mod prompt;

pub use completion::CompletionClient;
pub use conversation::Conversation;
pub use error::AgentError;
pub use orchestrator::{Orchestrator, TurnReply};
