//! Surrogate REPL 宿主
//!
//! 入口：初始化日志与配置，按环境变量选择 LLM 后端（无 Key 时离线），逐行读取用户输入并驱动会话。
//! 命令：`/events` 列出日程，`/confirm <id>` / `/cancel <id>` 操作日程卡片，
//! `/attach <path> <message>` 附带文件，`/new` 新会话，`/quit` 退出。

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use surrogate::chat::Turn;
use surrogate::config::load_config;
use surrogate::core::{CompletionClient, Conversation, Orchestrator};
use surrogate::lifecycle::ArtifactManager;
use surrogate::llm::{create_llm_from_config, Attachment};
use surrogate::observability;
use surrogate::store::{MemorySessionStore, SessionStore};
use surrogate::tools::{ToolExecutor, ToolPayload, ToolRegistry};
use tokio::io::{AsyncBufReadExt, BufReader};

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}

fn print_turn(turn: &Turn) {
    println!("\n{}", turn.text);
    match &turn.payload {
        Some(ToolPayload::Event(card)) => {
            println!(
                "  [event {}] {} {} {} ({:?})",
                card.event.id, card.event.title, card.event.date, card.event.time, card.event.status
            );
        }
        Some(ToolPayload::Events(cards)) => {
            for card in cards {
                println!(
                    "  [event {}] {} {} {}",
                    card.event.id, card.event.title, card.event.date, card.event.time
                );
            }
        }
        Some(ToolPayload::Email(draft)) => {
            println!("  mailto: {}\n  gmail: {}", draft.mailto, draft.gmail)
        }
        Some(other) => {
            if let Ok(json) = serde_json::to_string_pretty(other) {
                println!("{}", json);
            }
        }
        None => {}
    }
    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });

    let store: Arc<dyn SessionStore> = match &cfg.app.data_file {
        Some(path) => Arc::new(
            MemorySessionStore::open(path)
                .await
                .with_context(|| format!("Failed to open data file {}", path.display()))?,
        ),
        None => Arc::new(MemorySessionStore::new()),
    };

    let llm = create_llm_from_config(&cfg.llm);
    let completion = Arc::new(CompletionClient::new(llm, &cfg.llm));
    let registry = ToolRegistry::from_config(store.clone(), completion.clone(), &cfg);
    let orchestrator = Arc::new(
        Orchestrator::new(
            completion.clone(),
            ToolExecutor::new(registry, cfg.app.tool_timeout_secs),
            store.clone(),
        )
        .with_default_user_name(cfg.app.user_name.clone()),
    );
    let lifecycle = Arc::new(ArtifactManager::new(store.clone()));

    let new_conversation = |session| {
        Conversation::new(
            orchestrator.clone(),
            lifecycle.clone(),
            store.clone(),
            session,
            cfg.app.history_turns,
        )
    };
    let mut conversation = new_conversation(store.create_chat().await?);

    println!("Surrogate ready. Type /quit to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "/quit" | "/exit" => break,
            "/new" => {
                conversation = new_conversation(store.create_chat().await?);
                println!("Started a new conversation.");
            }
            "/events" => {
                for e in store.get_events().await? {
                    println!("  [{}] {} {} {} ({:?})", e.id, e.title, e.date, e.time, e.status);
                }
            }
            "/confirm" => match conversation.confirm_event(rest.trim()).await {
                Ok(t) => println!("Confirmed \"{}\" ({} reminder(s)).", t.event.title, t.reminders),
                Err(e) => println!("Could not confirm: {}", e),
            },
            "/cancel" => match conversation.cancel_event(rest.trim()).await {
                Ok(t) => println!("Cancelled \"{}\".", t.event.title),
                Err(e) => println!("Could not cancel: {}", e),
            },
            "/attach" => {
                let (path, message) = rest.split_once(' ').unwrap_or((rest, ""));
                let path = Path::new(path);
                let bytes = match tokio::fs::read(path).await {
                    Ok(b) => b,
                    Err(e) => {
                        println!("Could not read {}: {}", path.display(), e);
                        continue;
                    }
                };
                let attachment = Attachment::from_bytes(mime_for(path), &bytes);
                let message = if message.trim().is_empty() {
                    "What is in this file?"
                } else {
                    message
                };
                let turn = conversation.send(message, Some(attachment)).await?;
                print_turn(&turn);
            }
            _ => {
                let turn = conversation.send(line, None).await?;
                print_turn(&turn);
            }
        }
    }

    observability::report_token_usage(completion.token_usage());
    Ok(())
}
