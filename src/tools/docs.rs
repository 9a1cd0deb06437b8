//! Docs Agent：create_doc

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use super::params::str_param;
use super::{next_id, ToolPayload, ToolResult};
use crate::store::{SessionStore, TextDocument};

const UNTITLED: &str = "Untitled Draft";

pub struct DocsTool {
    store: Arc<dyn SessionStore>,
}

impl DocsTool {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, action: &str, params: &Map<String, Value>) -> ToolResult {
        match action {
            "create_doc" => self.create_doc(params).await,
            _ => ToolResult::failure("Unknown doc action."),
        }
    }

    async fn create_doc(&self, params: &Map<String, Value>) -> ToolResult {
        let Some(content) = str_param(params, "content") else {
            return ToolResult::failure("No content provided for document.");
        };
        let doc = TextDocument {
            id: next_id(),
            title: str_param(params, "title").unwrap_or_else(|| UNTITLED.to_string()),
            content,
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.add_document(&doc).await {
            tracing::error!(error = %e, "failed to persist document");
            return ToolResult::failure(format!("Could not save the document: {}", e));
        }
        ToolResult::ok(
            format!("Document \"{}\" created successfully.", doc.title),
            ToolPayload::Doc(doc),
        )
    }
}
