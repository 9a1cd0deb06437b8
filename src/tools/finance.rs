//! Financial Agent：analyze_stock
//!
//! 行情来自 [`MarketDataResolver`]；命中实时数据时追加一次分析调用，
//! 全部数据源失败则换成模拟报告并在 analysis 中注明。

use std::sync::Arc;

use serde_json::{Map, Value};

use super::params::str_param;
use super::{ToolPayload, ToolResult};
use crate::core::CompletionClient;
use crate::fallback::market::{synthetic_report, MarketDataResolver};

pub const SIMULATED_DISCLOSURE: &str = " (Note: Simulated Data - Live feed unavailable)";

pub struct FinanceTool {
    market: MarketDataResolver,
    completion: Arc<CompletionClient>,
}

impl FinanceTool {
    pub fn new(market: MarketDataResolver, completion: Arc<CompletionClient>) -> Self {
        Self { market, completion }
    }

    pub async fn execute(&self, action: &str, params: &Map<String, Value>) -> ToolResult {
        match action {
            "analyze_stock" => self.analyze(params).await,
            _ => ToolResult::failure("Unknown finance action."),
        }
    }

    async fn analyze(&self, params: &Map<String, Value>) -> ToolResult {
        let Some(symbol) = str_param(params, "symbol") else {
            return ToolResult::failure("Missing stock symbol (e.g., AAPL, BTC).");
        };

        let report = match self.market.lookup(&symbol).await {
            Some(mut report) => {
                report.analysis = self
                    .completion
                    .market_analysis(&report.symbol, report.price, report.change_percent)
                    .await;
                report
            }
            None => {
                tracing::warn!(%symbol, "live market data unavailable, using simulated report");
                let mut report = synthetic_report(&symbol);
                report.analysis.push_str(SIMULATED_DISCLOSURE);
                report
            }
        };

        ToolResult::ok(
            format!("I've analyzed the live market data for {}.", report.symbol),
            ToolPayload::FinanceReport(report),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmSection;
    use crate::fallback::testing::FixedProvider;
    use crate::fallback::{FallbackResolver, ProviderError};
    use crate::llm::ScriptedLlmClient;
    use crate::tools::{DataQuality, FinancialReport, Recommendation};
    use serde_json::json;

    fn live(symbol: &str) -> FinancialReport {
        FinancialReport {
            symbol: symbol.to_string(),
            price: 190.0,
            currency: "USD".into(),
            change: 3.0,
            change_percent: 1.6,
            market_cap: "N/A".into(),
            pe_ratio: None,
            week52_high: 209.0,
            week52_low: 171.0,
            recommendation: Recommendation::Buy,
            analysis: String::new(),
            data_quality: DataQuality::Live,
        }
    }

    fn tool(
        outcome: Result<FinancialReport, ProviderError>,
        llm: Arc<ScriptedLlmClient>,
    ) -> FinanceTool {
        let market = MarketDataResolver::new(
            FallbackResolver::new("market").with_provider(FixedProvider::new("fixed", outcome)),
        );
        let completion = Arc::new(CompletionClient::new(llm, &LlmSection::default()));
        FinanceTool::new(market, completion)
    }

    #[tokio::test]
    async fn test_live_report_gets_analysis() {
        let llm = Arc::new(ScriptedLlmClient::with_replies(["Prediction: Bullish"]));
        let t = tool(Ok(live("AAPL")), llm.clone());
        let params = json!({"symbol": "AAPL"});
        let r = t.execute("analyze_stock", params.as_object().unwrap()).await;
        assert!(r.success);
        assert_eq!(r.message, "I've analyzed the live market data for AAPL.");
        let Some(ToolPayload::FinanceReport(report)) = r.data else {
            panic!("expected report");
        };
        assert_eq!(report.analysis, "Prediction: Bullish");
        assert_eq!(report.data_quality, DataQuality::Live);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_sources_down_gives_synthetic_report() {
        let llm = Arc::new(ScriptedLlmClient::new());
        let t = tool(Err(ProviderError::Http(503)), llm.clone());
        let params = json!({"symbol": "tsla"});
        let r = t.execute("analyze_stock", params.as_object().unwrap()).await;
        assert!(r.success);
        let Some(ToolPayload::FinanceReport(report)) = r.data else {
            panic!("expected report");
        };
        assert_eq!(report.symbol, "TSLA");
        assert_eq!(report.data_quality, DataQuality::Synthetic);
        assert!(report.analysis.ends_with(SIMULATED_DISCLOSURE));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_symbol_required() {
        let llm = Arc::new(ScriptedLlmClient::new());
        let t = tool(Ok(live("AAPL")), llm);
        let r = t.execute("analyze_stock", &Map::new()).await;
        assert!(!r.success);
        assert_eq!(r.message, "Missing stock symbol (e.g., AAPL, BTC).");
    }
}
