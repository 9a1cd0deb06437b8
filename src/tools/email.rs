//! Email Agent：send_email 只生成草稿与深链，真正发送由用户在卡片上触发

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use super::links::{gmail_link, mailto_link};
use super::params::str_param;
use super::{next_id, EmailDraft, ToolPayload, ToolResult};
use crate::store::{EmailRecord, SessionStore};

pub struct EmailTool {
    store: Arc<dyn SessionStore>,
}

impl EmailTool {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, action: &str, params: &Map<String, Value>) -> ToolResult {
        match action {
            "send_email" => self.draft(params).await,
            _ => ToolResult::failure("Unknown email action."),
        }
    }

    async fn draft(&self, params: &Map<String, Value>) -> ToolResult {
        let (Some(to), Some(subject), Some(body)) = (
            str_param(params, "to"),
            str_param(params, "subject"),
            str_param(params, "body"),
        ) else {
            return ToolResult::failure("Missing 'to', 'subject', or 'body' for email.");
        };

        let email = EmailRecord {
            id: next_id(),
            to,
            subject,
            body,
            sent_at: Utc::now(),
        };
        if let Err(e) = self.store.add_email(&email).await {
            tracing::error!(error = %e, "failed to persist email draft");
            return ToolResult::failure(format!("Could not save the email draft: {}", e));
        }

        let draft = EmailDraft {
            mailto: mailto_link(&email.to, &email.subject, &email.body),
            gmail: gmail_link(&email.to, &email.subject, &email.body),
            email,
        };
        ToolResult::ok(
            format!("Email draft prepared for {}.", draft.email.to),
            ToolPayload::Email(draft),
        )
    }
}
