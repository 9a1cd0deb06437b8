//! Domain 工具层：每个 Agent 一个执行器，由 [`ToolRegistry`] 封闭映射、[`ToolExecutor`] 加超时与审计

pub mod docs;
pub mod email;
pub mod executor;
pub mod finance;
pub mod links;
pub mod params;
pub mod payment;
pub mod registry;
pub mod result;
pub mod schedule;
pub mod schema;
pub mod search;

use std::sync::atomic::{AtomicI64, Ordering};

pub use docs::DocsTool;
pub use email::EmailTool;
pub use executor::ToolExecutor;
pub use finance::FinanceTool;
pub use payment::PaymentTool;
pub use registry::ToolRegistry;
pub use result::{
    DataQuality, EmailDraft, EventCard, FinancialReport, PayloadType, Recommendation, SearchHit,
    SearchPayload, ToolPayload, ToolResult,
};
pub use schedule::ScheduleTool;
pub use search::SearchTool;

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// 毫秒时间戳 id；同一毫秒内多次调用时递增，保证进程内唯一
pub fn next_id() -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let mut prev = LAST_ID.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(prev + 1);
        match LAST_ID.compare_exchange_weak(prev, candidate, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return candidate.to_string(),
            Err(actual) => prev = actual,
        }
    }
}
