//! Payment Agent：模拟账本，make_payment 恒为 Success

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use super::params::{coerce_number, str_param};
use super::{next_id, ToolPayload, ToolResult};
use crate::store::{PaymentStatus, PaymentTransaction, SessionStore};

pub struct PaymentTool {
    store: Arc<dyn SessionStore>,
}

impl PaymentTool {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, action: &str, params: &Map<String, Value>) -> ToolResult {
        match action {
            "make_payment" => self.pay(params).await,
            _ => ToolResult::failure("Unknown payment action."),
        }
    }

    async fn pay(&self, params: &Map<String, Value>) -> ToolResult {
        // 0 与无法解析的金额一样视为缺失
        let amount = params.get("amount").map(coerce_number).unwrap_or(0.0);
        let recipient = str_param(params, "recipient");
        let Some(recipient) = recipient.filter(|_| amount != 0.0) else {
            return ToolResult::failure("Missing amount or recipient for payment.");
        };

        let tx = PaymentTransaction {
            id: next_id(),
            amount,
            currency: str_param(params, "currency").unwrap_or_else(|| "USD".to_string()),
            recipient,
            description: str_param(params, "description").unwrap_or_else(|| "Payment".to_string()),
            status: PaymentStatus::Success,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.store.add_payment(&tx).await {
            tracing::error!(error = %e, "failed to record payment");
            return ToolResult::failure(format!("Could not record the payment: {}", e));
        }
        tracing::info!(
            amount = tx.amount,
            currency = %tx.currency,
            reference = tx.reference(),
            "payment recorded"
        );

        let message = format!(
            "✅ Payment Processed\nSent ${:.2} {} to {}\nRef: {}",
            tx.amount,
            tx.currency,
            tx.recipient,
            tx.reference()
        );
        ToolResult::ok(message, ToolPayload::Payment(tx))
    }
}
