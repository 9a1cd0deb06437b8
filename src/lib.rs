//! Surrogate - Rust 对话式个人助理
//!
//! 模块划分：
//! - **chat**: 会话与 Turn、带事件索引的 Transcript
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 补全客户端、Prompt 组装、单轮编排、会话驱动
//! - **fallback**: 多源降级解析器（行情 / 网页搜索 / 语音合成）
//! - **intent**: 从补全文本恢复结构化意图
//! - **lifecycle**: 日程事件的确认 / 取消与提醒计划
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mistral / 离线 / 脚本化）
//! - **observability**: 日志初始化
//! - **store**: 会话存储契约与内存实现
//! - **tools**: 各领域 Agent 的工具执行器、注册表与执行器

pub mod chat;
pub mod config;
pub mod core;
pub mod fallback;
pub mod intent;
pub mod lifecycle;
pub mod llm;
pub mod observability;
pub mod store;
pub mod tools;
